// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use piscan_cli::{Cli, Parser, COMPONENT};
use anyhow::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli.load_config()?;
    cli.logging_args(&config).init(COMPONENT)?;

    cli.run(&config)
}

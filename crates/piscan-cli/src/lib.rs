// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use clap::Subcommand;
use piscan_logging::CliLoggingArgs;
use std::path::PathBuf;

pub mod commands;
pub mod config;

use commands::{devices, history, listen, replay};
use config::Config;

/// Logging component name of the binary
pub const COMPONENT: &str = "piscan";

#[derive(clap::Parser)]
#[command(
    name = "piscan",
    about = "PiScan barcode scanner client",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/piscan/config.toml)
    #[arg(long, env = "PISCAN_CONFIG", global = true)]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Listen(listen::ListenArgs),
    Replay(replay::ReplayArgs),
    History(history::HistoryArgs),
    Devices(devices::DevicesArgs),
}

impl Cli {
    /// Load the configuration file this invocation points at
    pub fn load_config(&self) -> anyhow::Result<Config> {
        Config::load(self.config.as_deref())
    }

    /// Logging options with unset flags filled from the config file
    pub fn logging_args(&self, config: &Config) -> CliLoggingArgs {
        self.logging.clone().with_config_defaults(&config.logging)
    }

    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        match self.command {
            Commands::Listen(args) => args.run(&config.scanner),
            Commands::Replay(args) => args.run(&config.scanner),
            Commands::History(args) => args.run(&config.scanner),
            Commands::Devices(args) => args.run(),
        }
    }
}

pub use clap::Parser;

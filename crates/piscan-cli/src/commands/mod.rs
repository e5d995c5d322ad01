// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Subcommand implementations

pub mod devices;
pub mod history;
pub mod listen;
pub mod replay;

use std::io::Write;
use tracing::warn;

/// Print a completed barcode in the client's line format
pub(crate) fn print_barcode<W: Write>(out: &mut W, barcode: &str) {
    if let Err(err) = writeln!(out, "barcode: {}", barcode).and_then(|_| out.flush()) {
        warn!("Failed to write barcode {}: {}", barcode, err);
    }
}

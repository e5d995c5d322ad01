// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `piscan replay`: decode a captured event dump

use super::print_barcode;
use crate::config::ScannerConfig;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use piscan_scanner::{handler_fn, scan_device, EventLayout, LoopSummary, ReaderConfig, StopHandle};
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the replay command
#[derive(Args, Debug, Clone)]
#[command(about = "Decode barcodes from a raw input event capture")]
pub struct ReplayArgs {
    /// Capture file, e.g. produced with `cat /dev/input/eventN > scan.bin`
    pub file: PathBuf,

    /// Record layout of the capture (default: this machine's layout)
    #[arg(long, help = "Record layout: wide (64-bit) or compact (32-bit)")]
    pub layout: Option<EventLayout>,

    /// Parse records with a zero timestamp instead of ending the batch there
    #[arg(long, help = "Do not truncate reads at zero timestamps")]
    pub keep_zero_timestamps: bool,
}

impl ReplayArgs {
    pub fn reader_config(&self, config: &ScannerConfig) -> ReaderConfig {
        let mut reader = config.reader_config();
        if let Some(layout) = self.layout {
            reader.layout = layout;
        }
        if self.keep_zero_timestamps {
            reader.stop_at_zero_timestamp = false;
        }
        reader
    }

    /// Decode the capture, printing each barcode to `out`
    pub fn replay<W: Write>(&self, config: &ScannerConfig, out: &mut W) -> Result<LoopSummary> {
        let reader = self.reader_config(config);
        let mut failure = None;
        let handler = handler_fn(
            |barcode: String| print_barcode(&mut *out, &barcode),
            |err| {
                failure = Some(err.to_string());
                ControlFlow::Break(())
            },
        );

        let summary = scan_device(&self.file, reader, false, handler, StopHandle::new())
            .with_context(|| format!("Failed to replay {}", self.file.display()))?;

        if let Some(err) = failure {
            return Err(anyhow!(err).context(format!("Failed to replay {}", self.file.display())));
        }
        Ok(summary)
    }

    pub fn run(self, config: &ScannerConfig) -> Result<()> {
        let stdout = io::stdout();
        let summary = self.replay(config, &mut stdout.lock())?;
        info!(
            file = %self.file.display(),
            scans = summary.scans,
            "Replay finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(layout: Option<EventLayout>, keep_zero_timestamps: bool) -> ReplayArgs {
        ReplayArgs {
            file: PathBuf::from("capture.bin"),
            layout,
            keep_zero_timestamps,
        }
    }

    #[test]
    fn test_reader_config_defaults_from_config() {
        let config = ScannerConfig {
            layout: Some(EventLayout::Compact),
            read_capacity: Some(8),
            ..Default::default()
        };
        let reader = args(None, false).reader_config(&config);
        assert_eq!(reader.layout, EventLayout::Compact);
        assert_eq!(reader.capacity, 8);
        assert!(reader.stop_at_zero_timestamp);
    }

    #[test]
    fn test_reader_config_flags_win() {
        let config = ScannerConfig {
            layout: Some(EventLayout::Compact),
            ..Default::default()
        };
        let reader = args(Some(EventLayout::Wide), true).reader_config(&config);
        assert_eq!(reader.layout, EventLayout::Wide);
        assert!(!reader.stop_at_zero_timestamp);
    }
}

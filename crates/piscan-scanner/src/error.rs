// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for the scanner decoder.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scanner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while opening or reading a scanner device.
///
/// `Open` and `Grab` happen before the scan loop starts and are fatal for it.
/// `Read` is reported per read and leaves the loop running.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open input device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to grab input device {path}: {source}")]
    Grab {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read from input device: {0}")]
    Read(#[source] std::io::Error),
}

impl Error {
    /// Whether the error happened before any event was read
    pub fn is_startup(&self) -> bool {
        matches!(self, Error::Open { .. } | Error::Grab { .. })
    }
}

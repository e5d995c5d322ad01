// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Logging configuration types

use crate::{CliLogLevel, LogFormat};
use serde::{Deserialize, Serialize};

/// Logging section of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Logging verbosity level
    pub log_level: Option<CliLogLevel>,
    /// Log output format
    pub log_format: Option<LogFormat>,
    /// Log file path
    pub log_file: Option<String>,
}

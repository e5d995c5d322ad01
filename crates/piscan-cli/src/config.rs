// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration file loading for the PiScan CLI.
//!
//! The file is optional TOML with kebab-case keys. Values found here sit
//! between the built-in defaults and the environment/command line: clap
//! resolves flags and `PISCAN_*` variables first, and anything still unset
//! falls back to the file, then to the defaults.

use anyhow::{Context, Result};
use piscan_logging::logging_config::LoggingConfig;
use piscan_scanner::{EventLayout, ReaderConfig, DEFAULT_CAPACITY, DEFAULT_DEVICE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub scanner: ScannerConfig,

    #[serde(flatten)]
    pub logging: LoggingConfig,
}

/// Scanner and storage settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScannerConfig {
    /// Input event device of the scanner
    pub device: Option<PathBuf>,
    /// SQLite database receiving recorded scans
    pub db_path: Option<PathBuf>,
    /// Take exclusive access to the device
    pub grab: Option<bool>,
    /// Records requested per read
    pub read_capacity: Option<usize>,
    /// Record layout of the device (`wide` or `compact`)
    pub layout: Option<EventLayout>,
    /// Treat a zero timestamp as the end of valid data in a read
    pub stop_at_zero_timestamp: Option<bool>,
    /// Stop listening at the first failed read (default: true)
    pub stop_on_read_error: Option<bool>,
}

impl ScannerConfig {
    pub fn device_or_default(&self) -> PathBuf {
        self.device.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICE))
    }

    /// Reader settings with unset values taken from the defaults
    pub fn reader_config(&self) -> ReaderConfig {
        let defaults = ReaderConfig::default();
        ReaderConfig {
            layout: self.layout.unwrap_or(defaults.layout),
            capacity: self.read_capacity.unwrap_or(DEFAULT_CAPACITY).max(1),
            stop_at_zero_timestamp: self
                .stop_at_zero_timestamp
                .unwrap_or(defaults.stop_at_zero_timestamp),
        }
    }

    /// Database path, falling back to the per-user data directory
    pub fn db_path_or_default(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => default_db_path(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config = toml::from_str(text)?;
        Ok(config)
    }

    /// Load the configuration file
    ///
    /// An explicitly given path must exist. Without one, the default location
    /// is used if present and an empty configuration otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No configuration file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// `$XDG_CONFIG_HOME/piscan/config.toml` (or the platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("piscan").join("config.toml"))
}

/// `$XDG_DATA_HOME/piscan/scans.sqlite` (or the platform equivalent)
pub fn default_db_path() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("piscan").join("scans.sqlite"))
        .context("Could not determine the user data directory; pass --db")
}

// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `piscan devices`: find keyboard-like input devices

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Stable per-device symlinks maintained by udev
pub const BY_ID_DIR: &str = "/dev/input/by-id";

/// Suffix udev gives to the event node of keyboard devices
const KEYBOARD_SUFFIX: &str = "event-kbd";

#[derive(Args, Debug, Clone)]
#[command(about = "List keyboard input devices (barcode scanners show up as keyboards)")]
pub struct DevicesArgs {
    /// Directory to search
    #[arg(long, default_value = BY_ID_DIR)]
    pub dir: PathBuf,
}

/// A keyboard event device and the node it points to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardDevice {
    pub link: PathBuf,
    pub target: PathBuf,
}

impl DevicesArgs {
    pub fn run(self) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();

        let devices = find_keyboard_devices(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;
        if devices.is_empty() {
            writeln!(out, "No keyboard devices found under {}", self.dir.display())?;
            return Ok(());
        }

        for device in devices {
            writeln!(out, "{} -> {}", device.link.display(), device.target.display())?;
        }
        Ok(())
    }
}

/// Keyboard event devices in `dir`, sorted by link name
///
/// A missing directory yields an empty list.
pub fn find_keyboard_devices(dir: &Path) -> io::Result<Vec<KeyboardDevice>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut devices = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().ends_with(KEYBOARD_SUFFIX) {
            continue;
        }

        let link = entry.path();
        let target = fs::canonicalize(&link).or_else(|_| fs::read_link(&link))?;
        devices.push(KeyboardDevice { link, target });
    }

    devices.sort_by(|a, b| a.link.cmp(&b.link));
    Ok(devices)
}

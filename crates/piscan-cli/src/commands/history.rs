// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `piscan history`: show recorded scans

use crate::config::ScannerConfig;
use anyhow::{Context, Result};
use clap::Args;
use piscan_local_db::{ScanRecord, ScanStore};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
#[command(about = "List the most recent recorded scans")]
pub struct HistoryArgs {
    /// Number of scans to show
    #[arg(long, short = 'n', default_value_t = 20)]
    pub limit: usize,

    /// SQLite database holding the scans
    #[arg(long, env = "PISCAN_DB", help = "Scan database path")]
    pub db: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, help = "Output in JSON format")]
    pub json: bool,
}

impl HistoryArgs {
    pub fn run(self, config: &ScannerConfig) -> Result<()> {
        let stdout = io::stdout();
        self.write_history(config, &mut stdout.lock())
    }

    pub fn write_history<W: Write>(&self, config: &ScannerConfig, out: &mut W) -> Result<()> {
        let path = match &self.db {
            Some(path) => path.clone(),
            None => config.db_path_or_default()?,
        };

        // Do not create an empty database just to report that it is empty
        let records = if path.exists() {
            let store = ScanStore::open(&path)
                .with_context(|| format!("Failed to open scan database {}", path.display()))?;
            store.recent(self.limit)?
        } else {
            Vec::new()
        };

        if self.json {
            writeln!(out, "{}", serde_json::to_string_pretty(&records)?)?;
        } else {
            write_table(&records, out)?;
        }
        Ok(())
    }
}

fn write_table<W: Write>(records: &[ScanRecord], out: &mut W) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "No scans recorded");
    }

    for record in records {
        writeln!(
            out,
            "{:>6}  {}  {}",
            record.id,
            record.scanned_at.format("%Y-%m-%d %H:%M:%S"),
            record.barcode
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(db: PathBuf, limit: usize, json: bool) -> HistoryArgs {
        HistoryArgs {
            limit,
            db: Some(db),
            json,
        }
    }

    #[test]
    fn test_missing_database_is_empty_and_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("scans.sqlite");

        let mut out = Vec::new();
        history(db.clone(), 10, false)
            .write_history(&ScannerConfig::default(), &mut out)
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "No scans recorded\n");
        assert!(!db.exists());
    }

    #[test]
    fn test_table_lists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("scans.sqlite");
        {
            let store = ScanStore::open(&db).unwrap();
            store.record("111").unwrap();
            store.record("222").unwrap();
            store.record("333").unwrap();
        }

        let mut out = Vec::new();
        history(db, 2, false)
            .write_history(&ScannerConfig::default(), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("  333"));
        assert!(lines[1].ends_with("  222"));
    }

    #[test]
    fn test_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("scans.sqlite");
        ScanStore::open(&db).unwrap().record("4006381333931").unwrap();

        let mut out = Vec::new();
        history(db, 5, true)
            .write_history(&ScannerConfig::default(), &mut out)
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["barcode"], "4006381333931");
        assert_eq!(parsed.as_array().unwrap().len(), 1);
    }
}

// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! SQLite database for barcodes recorded on the local client.
//!
//! Every completed scan is stored with the time it was received; nothing is
//! deduplicated, so scanning the same product twice yields two rows.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the scan store
#[derive(Debug, Error)]
pub enum Error {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scans (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    barcode     TEXT NOT NULL,
    scanned_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scans_scanned_at ON scans (scanned_at);
CREATE INDEX IF NOT EXISTS idx_scans_barcode ON scans (barcode);
";

/// One recorded scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRecord {
    pub id: i64,
    pub barcode: String,
    pub scanned_at: DateTime<Utc>,
}

impl ScanRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw: String = row.get(2)?;
        let scanned_at = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: row.get(0)?,
            barcode: row.get(1)?,
            scanned_at,
        })
    }
}

/// Local store of scanned barcodes
pub struct ScanStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl ScanStore {
    /// Open (and create if needed) the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        debug!("Opened scan store at {}", path.display());

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Store kept in memory, discarded on drop
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record a barcode scanned now
    pub fn record(&self, barcode: &str) -> Result<ScanRecord> {
        self.record_at(barcode, Utc::now())
    }

    /// Record a barcode with an explicit scan time
    pub fn record_at(&self, barcode: &str, scanned_at: DateTime<Utc>) -> Result<ScanRecord> {
        let stamp = scanned_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn.execute(
            "INSERT INTO scans (barcode, scanned_at) VALUES (?1, ?2)",
            params![barcode, stamp],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, barcode, "Recorded scan");

        // Re-read so the returned timestamp has the stored precision
        let record = self
            .get(id)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok(record)
    }

    /// Look up a scan by id
    pub fn get(&self, id: i64) -> Result<Option<ScanRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, barcode, scanned_at FROM scans WHERE id = ?1",
                params![id],
                ScanRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Most recent scans, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, barcode, scanned_at FROM scans ORDER BY id DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![limit as i64], ScanRecord::from_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Every scan of one barcode, newest first
    pub fn find_by_barcode(&self, barcode: &str) -> Result<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, barcode, scanned_at FROM scans WHERE barcode = ?1 ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![barcode], ScanRecord::from_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Total number of recorded scans
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM scans", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete one scan; returns whether a row was removed
    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM scans WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_and_get() {
        let store = ScanStore::open_in_memory().unwrap();
        let record = store.record("4006381333931").unwrap();

        assert_eq!(record.barcode, "4006381333931");
        assert_eq!(store.get(record.id).unwrap(), Some(record));
        assert_eq!(store.get(9999).unwrap(), None);
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let store = ScanStore::open_in_memory().unwrap();
        for code in ["111", "222", "333"] {
            store.record(code).unwrap();
        }

        let recent = store.recent(2).unwrap();
        let codes: Vec<_> = recent.iter().map(|r| r.barcode.as_str()).collect();
        assert_eq!(codes, vec!["333", "222"]);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let store = ScanStore::open_in_memory().unwrap();
        store.record("abc").unwrap();
        store.record("xyz").unwrap();
        store.record("abc").unwrap();

        assert_eq!(store.find_by_barcode("abc").unwrap().len(), 2);
        assert!(store.find_by_barcode("nope").unwrap().is_empty());
    }

    #[test]
    fn test_record_at_preserves_time() {
        let store = ScanStore::open_in_memory().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 2, 29, 12, 30, 0).unwrap();
        let record = store.record_at("0001", at).unwrap();
        assert_eq!(record.scanned_at, at);
    }

    #[test]
    fn test_delete() {
        let store = ScanStore::open_in_memory().unwrap();
        let record = store.record("1").unwrap();
        assert!(store.delete(record.id).unwrap());
        assert!(!store.delete(record.id).unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_in_memory_has_no_path() {
        let store = ScanStore::open_in_memory().unwrap();
        assert!(store.path().is_none());
    }
}

// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use piscan_local_db::ScanStore;

#[test]
fn test_open_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("piscan").join("nested").join("scans.sqlite");

    let store = ScanStore::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.path(), Some(path.as_path()));
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_scans_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scans.sqlite");

    let first = {
        let store = ScanStore::open(&path).unwrap();
        let first = store.record("5901234123457").unwrap();
        store.record("0012345678905").unwrap();
        first
    };

    let store = ScanStore::open(&path).unwrap();
    assert_eq!(store.count().unwrap(), 2);
    assert_eq!(store.get(first.id).unwrap(), Some(first));

    let next = store.record("5901234123457").unwrap();
    let recent = store.recent(10).unwrap();
    assert_eq!(recent[0], next);
    assert_eq!(store.find_by_barcode("5901234123457").unwrap().len(), 2);
}

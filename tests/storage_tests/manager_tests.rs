//! StorageManager Tests
//!
//! Tests verify:
//! - Flushes create numbered SSTables
//! - Newer tables shadow older ones
//! - Probes merge across tables
//! - Existing tables are discovered on reopen

use std::fs;

use geots::memtable::MemTable;
use geots::storage::StorageManager;
use geots::store::Probe;
use tempfile::TempDir;

fn memtable(pairs: &[(&str, &str)]) -> MemTable {
    let memtable = MemTable::new();
    for (key, value) in pairs {
        memtable.put(key.as_bytes().to_vec(), value.as_bytes().to_vec());
    }
    memtable
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_flush_creates_sstable() {
    let temp = TempDir::new().unwrap();
    let storage = StorageManager::open(temp.path()).unwrap();

    let table = storage.flush(&memtable(&[("a", "1"), ("b", "2")])).unwrap();

    assert_eq!(table.entry_count(), 2);
    assert_eq!(table.path, temp.path().join("sstable_000001.sst"));
    assert_eq!(storage.sstable_count(), 1);
}

#[test]
fn test_flush_empty_memtable_fails() {
    let temp = TempDir::new().unwrap();
    let storage = StorageManager::open(temp.path()).unwrap();

    assert!(storage.flush(&MemTable::new()).is_err());
    assert_eq!(storage.sstable_count(), 0);
}

// =============================================================================
// Read Path Tests
// =============================================================================

#[test]
fn test_newest_table_wins() {
    let temp = TempDir::new().unwrap();
    let storage = StorageManager::open(temp.path()).unwrap();

    storage.flush(&memtable(&[("k", "old"), ("only-old", "x")])).unwrap();
    storage.flush(&memtable(&[("k", "new")])).unwrap();

    assert_eq!(storage.get(b"k").unwrap(), Some(b"new".to_vec()));
    assert_eq!(storage.get(b"only-old").unwrap(), Some(b"x".to_vec()));
    assert_eq!(storage.get(b"missing").unwrap(), None);
}

#[test]
fn test_probe_merges_tables() {
    let temp = TempDir::new().unwrap();
    let storage = StorageManager::open(temp.path()).unwrap();

    storage.flush(&memtable(&[("a", "1"), ("e", "5")])).unwrap();
    storage.flush(&memtable(&[("c", "3")])).unwrap();

    assert_eq!(storage.probe(b"a", Probe::Higher), Some(b"c".to_vec()));
    assert_eq!(storage.probe(b"d", Probe::Ceiling), Some(b"e".to_vec()));
    assert_eq!(storage.probe(b"e", Probe::Lower), Some(b"c".to_vec()));
    assert_eq!(storage.probe(b"b", Probe::Lower), Some(b"a".to_vec()));
    assert_eq!(storage.last_key(), Some(b"e".to_vec()));
}

// =============================================================================
// Discovery Tests
// =============================================================================

#[test]
fn test_open_removes_unfinished_tables() {
    let temp = TempDir::new().unwrap();
    {
        let storage = StorageManager::open(temp.path()).unwrap();
        storage.flush(&memtable(&[("k", "v")])).unwrap();
    }
    // Header-only staging file, as left by a crash mid-flush
    let staging = temp.path().join("sstable_000002.sst.tmp");
    fs::write(&staging, b"GTSS\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00").unwrap();

    let storage = StorageManager::open(temp.path()).unwrap();

    assert!(!staging.exists());
    assert_eq!(storage.sstable_count(), 1);
    assert_eq!(storage.get(b"k").unwrap(), Some(b"v".to_vec()));

    let table = storage.flush(&memtable(&[("z", "1")])).unwrap();
    assert_eq!(table.path, temp.path().join("sstable_000002.sst"));
}

#[test]
fn test_reopen_discovers_tables() {
    let temp = TempDir::new().unwrap();
    {
        let storage = StorageManager::open(temp.path()).unwrap();
        storage.flush(&memtable(&[("k", "old")])).unwrap();
        storage.flush(&memtable(&[("k", "new")])).unwrap();
    }
    // Unrelated files are ignored
    fs::write(temp.path().join("notes.txt"), b"hello").unwrap();
    fs::write(temp.path().join("sstable_x.sst"), b"junk").unwrap();

    let storage = StorageManager::open(temp.path()).unwrap();

    assert_eq!(storage.sstable_count(), 2);
    assert_eq!(storage.get(b"k").unwrap(), Some(b"new".to_vec()));

    // Numbering continues after the newest table found
    let table = storage.flush(&memtable(&[("z", "1")])).unwrap();
    assert_eq!(table.path, temp.path().join("sstable_000003.sst"));
}

//! Engine: writes, flushes, restart and merged cursors

use std::fs;
use std::sync::Arc;
use std::thread;

use geots::config::{Config, WalSyncStrategy};
use geots::engine::Engine;
use geots::store::{OrderedStore, StoreCursor};
use geots::Error;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(dir: &std::path::Path) -> Config {
    Config::builder()
        .data_dir(dir)
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .memtable_size_limit(1024 * 1024)
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(temp_dir.path())).unwrap();
    (temp_dir, engine)
}

/// Drain a cursor forward, collecting keys
fn forward_keys<C: StoreCursor>(mut cursor: C) -> Vec<Vec<u8>> {
    let mut keys = Vec::new();
    while let Some((key, _)) = cursor.next().unwrap() {
        keys.push(key);
    }
    keys
}

/// Drain a cursor backward, collecting keys
fn backward_keys<C: StoreCursor>(mut cursor: C) -> Vec<Vec<u8>> {
    let mut keys = Vec::new();
    while let Some((key, _)) = cursor.prev().unwrap() {
        keys.push(key);
    }
    keys
}

fn keys(list: &[&str]) -> Vec<Vec<u8>> {
    list.iter().map(|k| k.as_bytes().to_vec()).collect()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directories() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let _engine = Engine::open_path(&data_dir).unwrap();

    assert!(data_dir.join("sstables").exists());
    assert!(data_dir.join("wal.log").exists());
}

#[test]
fn test_engine_rejects_zero_limits() {
    let temp_dir = TempDir::new().unwrap();

    let config = Config::builder()
        .data_dir(temp_dir.path())
        .memtable_size_limit(0)
        .build();
    assert!(matches!(Engine::open(config), Err(Error::Config(_))));

    let config = Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryNEntries { count: 0 })
        .build();
    assert!(matches!(Engine::open(config), Err(Error::Config(_))));
}

#[test]
fn test_engine_put_get_overwrite() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"hello", b"world").unwrap();
    engine.put(b"hello", b"again").unwrap();

    assert_eq!(engine.get(b"hello").unwrap(), Some(b"again".to_vec()));
    assert_eq!(engine.get(b"nonexistent").unwrap(), None);
}

#[test]
fn test_write_batch_applies_every_pair() {
    let (_temp, engine) = setup_temp_engine();

    engine
        .write_batch(vec![
            (b"item".to_vec(), b"payload".to_vec()),
            (b"meta".to_vec(), b"item".to_vec()),
        ])
        .unwrap();
    engine.write_batch(vec![]).unwrap();

    assert_eq!(engine.get(b"item").unwrap(), Some(b"payload".to_vec()));
    assert_eq!(engine.get(b"meta").unwrap(), Some(b"item".to_vec()));
    assert_eq!(engine.memtable_entry_count(), 2);
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_flush_moves_memtable_to_sstable() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"a", b"1").unwrap();
    engine.flush().unwrap();

    assert_eq!(engine.memtable_entry_count(), 0);
    assert_eq!(engine.sstable_count(), 1);
    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));

    // Flushing an empty memtable is a no-op
    engine.flush().unwrap();
    assert_eq!(engine.sstable_count(), 1);
}

#[test]
fn test_size_limit_triggers_flush() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .memtable_size_limit(100)
        .build();
    let engine = Engine::open(config).unwrap();

    for i in 0..20 {
        engine
            .put(format!("key{:02}", i).as_bytes(), &[0u8; 16])
            .unwrap();
    }

    assert!(engine.sstable_count() >= 1);
    for i in 0..20 {
        assert!(engine.get(format!("key{:02}", i).as_bytes()).unwrap().is_some());
    }
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_unflushed_writes_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(test_config(temp_dir.path())).unwrap();
        engine.put(b"single", b"1").unwrap();
        engine
            .write_batch(vec![(b"x".to_vec(), b"2".to_vec()), (b"y".to_vec(), b"3".to_vec())])
            .unwrap();
        // Dropped without close: only the WAL holds the data
    }

    let engine = Engine::open(test_config(temp_dir.path())).unwrap();

    assert_eq!(engine.get(b"single").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"x").unwrap(), Some(b"2".to_vec()));
    assert_eq!(engine.get(b"y").unwrap(), Some(b"3".to_vec()));
    // Replayed entries are flushed at open
    assert_eq!(engine.sstable_count(), 1);
    assert_eq!(engine.memtable_entry_count(), 0);
}

#[test]
fn test_unfinished_flush_does_not_block_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(test_config(temp_dir.path())).unwrap();
        engine.put(b"cpu", b"5").unwrap();
    }
    // Header-only table a crash during flush leaves behind
    let staging = temp_dir.path().join("sstables").join("sstable_000001.sst.tmp");
    fs::write(&staging, &[0u8; 18]).unwrap();

    let engine = Engine::open(test_config(temp_dir.path())).unwrap();

    assert_eq!(engine.get(b"cpu").unwrap(), Some(b"5".to_vec()));
    assert!(!staging.exists());
    assert_eq!(engine.sstable_count(), 1);
}

#[test]
fn test_failed_automatic_flush_keeps_write() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .memtable_size_limit(16)
        .build();
    let engine = Engine::open(config).unwrap();

    // A plain file where the table directory should be makes every flush fail
    let sstables = temp_dir.path().join("sstables");
    fs::remove_dir(&sstables).unwrap();
    fs::write(&sstables, b"").unwrap();

    engine.put(b"first", &[1u8; 32]).unwrap();
    engine
        .write_batch(vec![(b"second".to_vec(), vec![2u8; 32])])
        .unwrap();
    assert!(engine.flush().is_err());

    assert_eq!(engine.sstable_count(), 0);
    assert_eq!(engine.memtable_entry_count(), 2);
    assert_eq!(engine.get(b"first").unwrap(), Some(vec![1u8; 32]));

    // Once the directory is back the next write flushes everything
    fs::remove_file(&sstables).unwrap();
    fs::create_dir(&sstables).unwrap();
    engine.put(b"third", &[3u8; 32]).unwrap();

    assert_eq!(engine.sstable_count(), 1);
    assert_eq!(engine.memtable_entry_count(), 0);
    for key in [&b"first"[..], b"second", b"third"] {
        assert!(engine.get(key).unwrap().is_some());
    }
}

#[test]
fn test_close_then_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(test_config(temp_dir.path())).unwrap();
        engine.put(b"k", b"v").unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(test_config(temp_dir.path())).unwrap();
    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
}

// =============================================================================
// Cursor Tests
// =============================================================================

#[test]
fn test_cursor_merges_memtable_and_sstables() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"b", b"old").unwrap();
    engine.put(b"d", b"4").unwrap();
    engine.flush().unwrap();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"e", b"5").unwrap();
    engine.flush().unwrap();
    engine.put(b"c", b"3").unwrap();
    engine.put(b"b", b"new").unwrap();

    assert_eq!(
        forward_keys(engine.seek(b"").unwrap()),
        keys(&["a", "b", "c", "d", "e"])
    );
    assert_eq!(
        backward_keys(engine.seek_last().unwrap()),
        keys(&["e", "d", "c", "b", "a"])
    );

    let mut cursor = engine.seek(b"b").unwrap();
    assert_eq!(cursor.next().unwrap(), Some((b"b".to_vec(), b"new".to_vec())));
}

#[test]
fn test_seek_positions_on_first_key_at_or_after() {
    let (_temp, engine) = setup_temp_engine();
    for key in ["b", "d", "f"] {
        engine.put(key.as_bytes(), b"v").unwrap();
    }

    assert_eq!(forward_keys(engine.seek(b"c").unwrap()), keys(&["d", "f"]));
    // prev() first yields the entry under the cursor
    assert_eq!(backward_keys(engine.seek(b"c").unwrap()), keys(&["d", "b"]));
    assert_eq!(backward_keys(engine.seek(b"d").unwrap()), keys(&["d", "b"]));
}

#[test]
fn test_seek_past_end_is_eof_both_ways() {
    let (_temp, engine) = setup_temp_engine();
    engine.put(b"a", b"1").unwrap();

    let mut cursor = engine.seek(b"z").unwrap();
    assert_eq!(cursor.prev().unwrap(), None);
    assert_eq!(cursor.next().unwrap(), None);

    let mut cursor = engine.seek(b"a").unwrap();
    assert!(cursor.prev().unwrap().is_some());
    assert_eq!(cursor.prev().unwrap(), None);
    assert_eq!(cursor.next().unwrap(), None);
}

#[test]
fn test_cursor_on_empty_engine() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.seek(b"").unwrap().next().unwrap(), None);
    assert_eq!(engine.seek_last().unwrap().prev().unwrap(), None);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_readers_and_writer() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..200u32 {
                engine.put(&i.to_be_bytes(), b"v").unwrap();
                if i % 50 == 49 {
                    engine.flush().unwrap();
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..20 {
                    let seen = forward_keys(engine.seek(b"").unwrap());
                    // Keys come back sorted with no duplicates
                    assert!(seen.windows(2).all(|w| w[0] < w[1]));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(forward_keys(engine.seek(b"").unwrap()).len(), 200);
}

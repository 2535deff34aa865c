//! The ordered byte-keyed store under the time-series layer
//!
//! Writes go WAL first, then MemTable; a MemTable over its size limit is
//! written out as a new SSTable and the WAL is emptied. Reads consult the
//! MemTable before the SSTables, newest first.

use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::memtable::MemTable;
use crate::storage::StorageManager;
use crate::store::{Entry, OrderedStore, Probe, StoreCursor};
use crate::wal::{Operation, WalEntry, WalRecovery, WalWriter};

const WAL_FILE: &str = "wal.log";
const SSTABLE_DIR: &str = "sstables";

/// LSM engine implementing [`OrderedStore`]
///
/// One writer at a time: `put`, `write_batch` and `flush` take `write_lock`
/// for their whole duration. Readers never take it; the MemTable and the
/// SSTable list carry their own read/write locks.
///
/// Cursors hold no snapshot and re-read on every step. Keys are never
/// deleted, so anything a cursor has seen stays readable.
pub struct Engine {
    config: Config,
    wal: Mutex<WalWriter>,
    memtable: MemTable,
    storage: StorageManager,
    write_lock: Mutex<()>,
}

impl Engine {
    /// Open the engine rooted at `config.data_dir`
    ///
    /// Whatever the WAL still holds from a previous run is replayed and
    /// flushed to an SSTable before the log is emptied.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.data_dir.join(WAL_FILE);
        let storage = StorageManager::open(&config.data_dir.join(SSTABLE_DIR))?;
        let memtable = MemTable::new();

        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;
            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    recovered = recovery.entries_recovered,
                    corrupted = recovery.entries_corrupted,
                    last_lsn = recovery.last_lsn,
                    truncated = recovery.was_truncated,
                    "replaying WAL"
                );
            }

            replay(&memtable, entries);

            if !memtable.is_empty() {
                storage.flush(&memtable)?;
                memtable.clear();
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        wal.truncate()?;

        tracing::debug!(
            data_dir = %config.data_dir.display(),
            sstables = storage.sstable_count(),
            "engine opened"
        );

        Ok(Self {
            config,
            wal: Mutex::new(wal),
            memtable,
            storage,
            write_lock: Mutex::new(()),
        })
    }

    /// [`Engine::open`] with default settings under `path`
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.memtable.get(key) {
            Some(value) => Ok(Some(value)),
            None => self.storage.get(key),
        }
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let _writer = self.write_lock.lock();

        self.wal.lock().append(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;
        let size = self.memtable.put(key.to_vec(), value.to_vec());

        self.maybe_flush(size);
        Ok(())
    }

    /// Store every pair or none of them
    ///
    /// The batch is a single WAL entry and is applied to the MemTable under
    /// one guard, so neither replay nor a concurrent reader can observe half
    /// of it.
    pub fn write_batch(&self, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let _writer = self.write_lock.lock();

        self.wal.lock().append(Operation::Batch {
            pairs: pairs.clone(),
        })?;
        let size = self.memtable.put_batch(pairs);

        self.maybe_flush(size);
        Ok(())
    }

    /// Write the MemTable out now, whatever its size
    pub fn flush(&self) -> Result<()> {
        let _writer = self.write_lock.lock();
        self.flush_locked()
    }

    /// The write that triggered this is already in the WAL and MemTable,
    /// so a failed flush is logged rather than returned. The MemTable keeps
    /// its rows and the next write over the limit tries again.
    fn maybe_flush(&self, memtable_size: usize) {
        if memtable_size < self.config.memtable_size_limit {
            return;
        }
        if let Err(e) = self.flush_locked() {
            tracing::error!(error = %e, memtable_size, "memtable flush failed");
        }
    }

    /// Caller holds `write_lock`
    fn flush_locked(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        // install the table before clearing so readers always find the key
        let table = self.storage.flush(&self.memtable)?;
        self.memtable.clear();
        self.wal.lock().truncate()?;

        tracing::debug!(
            path = %table.path.display(),
            entries = table.entry_count(),
            bytes = table.file_size,
            "memtable flushed"
        );
        Ok(())
    }

    /// Flush and fsync, consuming the engine
    pub fn close(self) -> Result<()> {
        self.flush()?;
        self.wal.lock().sync()?;
        tracing::debug!(data_dir = %self.config.data_dir.display(), "engine closed");
        Ok(())
    }

    /// Nearest key in the given direction across MemTable and SSTables
    pub fn probe(&self, key: &[u8], probe: Probe) -> Option<Vec<u8>> {
        let candidates = [self.memtable.probe(key, probe), self.storage.probe(key, probe)];
        let candidates = candidates.into_iter().flatten();

        match probe {
            Probe::Ceiling | Probe::Higher => candidates.min(),
            Probe::Lower => candidates.max(),
        }
    }

    pub fn last_key(&self) -> Option<Vec<u8>> {
        self.memtable.last_key().max(self.storage.last_key())
    }

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }
}

fn replay(memtable: &MemTable, entries: Vec<WalEntry>) {
    for entry in entries {
        match entry.operation {
            Operation::Put { key, value } => {
                memtable.put(key, value);
            }
            Operation::Batch { pairs } => {
                memtable.put_batch(pairs);
            }
        }
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// Bidirectional cursor over an [`Engine`]
pub struct EngineCursor<'a> {
    engine: &'a Engine,
    /// Key under the cursor; `None` once it walked off an end
    position: Option<Vec<u8>>,
}

impl EngineCursor<'_> {
    /// Yield the entry under the cursor, then step in `direction`
    fn step(&mut self, direction: Probe) -> Result<Option<Entry>> {
        while let Some(key) = self.position.take() {
            self.position = self.engine.probe(&key, direction);
            if let Some(value) = self.engine.get(&key)? {
                return Ok(Some((key, value)));
            }
        }
        Ok(None)
    }
}

impl StoreCursor for EngineCursor<'_> {
    fn next(&mut self) -> Result<Option<Entry>> {
        self.step(Probe::Higher)
    }

    fn prev(&mut self) -> Result<Option<Entry>> {
        self.step(Probe::Lower)
    }
}

impl OrderedStore for Engine {
    type Cursor<'a>
        = EngineCursor<'a>
    where
        Self: 'a;

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.put(key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Engine::get(self, key)
    }

    fn write_batch(&self, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Result<()> {
        Engine::write_batch(self, pairs)
    }

    fn seek(&self, key: &[u8]) -> Result<EngineCursor<'_>> {
        Ok(EngineCursor {
            engine: self,
            position: self.probe(key, Probe::Ceiling),
        })
    }

    fn seek_last(&self) -> Result<EngineCursor<'_>> {
        Ok(EngineCursor {
            engine: self,
            position: self.last_key(),
        })
    }
}

//! Storage Manager
//!
//! Owns the set of immutable SSTables under `{data_dir}/sstables`.
//!
//! ## Responsibilities
//! - Reopen every `sstable_NNNNNN.sst` found at startup, and delete staging
//!   files a crashed flush left behind
//! - Answer point reads with the newest table holding the key
//! - Merge nearest-key probes across tables for cursors
//! - Turn a full MemTable into the next numbered table

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::memtable::MemTable;
use crate::store::Probe;

use super::sstable::{temp_path, TEMP_EXT};
use super::{SSTable, SSTableBuilder, SSTableReader};

const FILE_PREFIX: &str = "sstable_";
const FILE_EXT: &str = "sst";

/// The on-disk half of the engine
///
/// ## Concurrency:
/// - the table list sits behind a RwLock; only a flush takes it for writing
/// - each reader guards its own file handle, so lookups share the read lock
/// - table ids come from an atomic counter
pub struct StorageManager {
    dir: PathBuf,

    /// Readers, highest id (newest) first
    tables: RwLock<Vec<SSTableReader>>,

    next_id: AtomicU64,
}

impl StorageManager {
    /// Open the table directory, creating it when missing
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let mut ids = Self::discover(dir)?;
        ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut tables = Vec::with_capacity(ids.len());
        for &id in &ids {
            let reader = SSTableReader::open(&table_path(dir, id))?;
            tracing::debug!(
                path = %reader.path().display(),
                entries = reader.entry_count(),
                "loaded SSTable"
            );
            tables.push(reader);
        }

        let next_id = ids.first().map_or(1, |&newest| newest + 1);

        Ok(Self {
            dir: dir.to_path_buf(),
            tables: RwLock::new(tables),
            next_id: AtomicU64::new(next_id),
        })
    }

    /// Ids of the table files present in `dir`
    ///
    /// Staging files are never valid tables; their rows are still in the
    /// WAL, so they are removed.
    fn discover(dir: &Path) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if is_staging(&path) {
                tracing::warn!(path = %path.display(), "removing unfinished SSTable");
                fs::remove_file(&path)?;
            } else if let Some(id) = parse_table_id(&path) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Value of `key` in the newest table that has it
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        for reader in self.tables.read().iter() {
            if !reader.might_contain(key) {
                continue;
            }
            if let Some(value) = reader.get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Nearest key in the given direction across all tables
    pub fn probe(&self, key: &[u8], probe: Probe) -> Option<Vec<u8>> {
        let tables = self.tables.read();
        let candidates = tables.iter().filter_map(|reader| reader.probe(key, probe));

        let best = match probe {
            Probe::Ceiling | Probe::Higher => candidates.min(),
            Probe::Lower => candidates.max(),
        };
        best.map(<[u8]>::to_vec)
    }

    /// Largest key on disk
    pub fn last_key(&self) -> Option<Vec<u8>> {
        self.tables
            .read()
            .iter()
            .filter_map(SSTableReader::max_key)
            .max()
            .map(<[u8]>::to_vec)
    }

    /// Write `memtable` out as the next table and start serving it
    ///
    /// The new reader is visible to lookups before this returns, so the
    /// caller may clear the MemTable afterwards.
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(Error::Storage("refusing to flush an empty MemTable".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let path = table_path(&self.dir, id);

        let table = match Self::write_table(&path, memtable) {
            Ok(table) => table,
            Err(e) => {
                // best effort; discover removes it on the next open anyway
                let _ = fs::remove_file(temp_path(&path));
                return Err(e);
            }
        };

        let reader = SSTableReader::open(&path)?;
        self.tables.write().insert(0, reader);

        Ok(table)
    }

    fn write_table(path: &Path, memtable: &MemTable) -> Result<SSTable> {
        let mut builder = SSTableBuilder::new(path)?;
        for (key, value) in memtable.iter() {
            builder.add(&key, &value)?;
        }
        builder.finish()
    }

    pub fn sstable_count(&self) -> usize {
        self.tables.read().len()
    }
}

fn table_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{FILE_PREFIX}{id:06}.{FILE_EXT}"))
}

/// `sstable_000042.sst.tmp`
fn is_staging(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.starts_with(FILE_PREFIX) && name.ends_with(&format!(".{TEMP_EXT}"))
}

/// `sstable_000042.sst` → `Some(42)`
fn parse_table_id(path: &Path) -> Option<u64> {
    if path.extension()? != FILE_EXT {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(FILE_PREFIX)?
        .parse()
        .ok()
}

//! On-disk sorted tables
//!
//! A table is written once by [`SSTableBuilder`] from a MemTable snapshot
//! and then only read through [`SSTableReader`]. The builder writes to
//! `<name>.sst.tmp` and renames onto `<name>.sst` after an fsync, so a file
//! with the final name is always complete. Integers are little-endian.
//!
//! ```text
//! offset          field          size
//! ──────────────  ─────────────  ─────────────────────────────
//! 0               magic          4     "GTSS"
//! 4               format         2     u16
//! 6               entries        8     u64
//! 14              data block     Σ     (klen u32, vlen u32, key, value)*
//! index_offset    index block    Σ     (klen u32, data offset u64, key)*
//! len - 16        index_offset   8     u64
//! len - 8         data crc32     4     over the data block only
//! len - 4         reserved       4     zeroes
//! ```

mod builder;
mod reader;

use std::path::{Path, PathBuf};

pub use builder::SSTableBuilder;
pub use reader::SSTableReader;

pub(crate) const MAGIC: &[u8; 4] = b"GTSS";
pub(crate) const VERSION: u16 = 1;

pub(crate) const HEADER_SIZE: u64 = 4 + 2 + 8;
pub(crate) const FOOTER_SIZE: u64 = 8 + 4 + 4;

pub(crate) const TEMP_EXT: &str = "sst.tmp";

/// Where the builder stages the table that ends up at `path`
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(TEMP_EXT)
}

/// What the builder reports after `finish`
#[derive(Debug, Clone)]
pub struct SSTable {
    pub path: PathBuf,
    pub entry_count: u64,
    /// First key written; empty for a table with no entries
    pub min_key: Vec<u8>,
    pub max_key: Vec<u8>,
    pub file_size: u64,
}

impl SSTable {
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}

pub(crate) fn read_u32(buf: &[u8], pos: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[pos..pos + 4]);
    u32::from_le_bytes(raw)
}

pub(crate) fn read_u64(buf: &[u8], pos: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[pos..pos + 8]);
    u64::from_le_bytes(raw)
}

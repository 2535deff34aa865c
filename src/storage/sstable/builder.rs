//! Streams a sorted run of entries into a new table file

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{temp_path, SSTable, HEADER_SIZE, MAGIC, VERSION};

/// Byte offset of the entry count inside the header
const COUNT_OFFSET: u64 = 6;

/// Single-use writer for one SSTable
///
/// `add` must see keys in strictly ascending order. Entries go to the
/// staging file; `path` only appears once `finish` has synced and renamed
/// it. A builder dropped early leaves the staging file behind.
pub struct SSTableBuilder {
    path: PathBuf,
    staging: PathBuf,
    out: BufWriter<File>,
    /// Offset the next entry will start at
    offset: u64,
    /// Every key with the offset of its entry, in write order
    index: Vec<(Vec<u8>, u64)>,
    crc: crc32fast::Hasher,
}

impl SSTableBuilder {
    pub fn new(path: &Path) -> Result<Self> {
        let staging = temp_path(path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&staging)?;
        let mut out = BufWriter::new(file);

        // count is patched in by finish
        out.write_all(MAGIC)?;
        out.write_all(&VERSION.to_le_bytes())?;
        out.write_all(&0u64.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            staging,
            out,
            offset: HEADER_SIZE,
            index: Vec::new(),
            crc: crc32fast::Hasher::new(),
        })
    }

    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if let Some((prev, _)) = self.index.last() {
            if key <= prev.as_slice() {
                return Err(Error::Storage(format!(
                    "SSTable keys out of order: {:?} after {:?}",
                    key, prev
                )));
            }
        }

        let key_len = (key.len() as u32).to_le_bytes();
        let value_len = (value.len() as u32).to_le_bytes();
        for chunk in [&key_len[..], &value_len[..], key, value] {
            self.out.write_all(chunk)?;
            self.crc.update(chunk);
        }

        self.index.push((key.to_vec(), self.offset));
        self.offset += (key_len.len() + value_len.len() + key.len() + value.len()) as u64;
        Ok(())
    }

    /// Write index and footer, patch the header count, fsync, then move the
    /// staging file onto the final path
    pub fn finish(self) -> Result<SSTable> {
        let Self {
            path,
            staging,
            mut out,
            offset: index_offset,
            index,
            crc,
        } = self;

        for (key, entry_offset) in &index {
            out.write_all(&(key.len() as u32).to_le_bytes())?;
            out.write_all(&entry_offset.to_le_bytes())?;
            out.write_all(key)?;
        }

        out.write_all(&index_offset.to_le_bytes())?;
        out.write_all(&crc.finalize().to_le_bytes())?;
        out.write_all(&[0u8; 4])?;

        let mut file = out
            .into_inner()
            .map_err(|e| Error::Storage(format!("flushing {}: {}", staging.display(), e)))?;

        let entry_count = index.len() as u64;
        file.seek(SeekFrom::Start(COUNT_OFFSET))?;
        file.write_all(&entry_count.to_le_bytes())?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();
        drop(file);
        fs::rename(&staging, &path)?;

        let mut keys = index.into_iter().map(|(key, _)| key);
        let min_key = keys.next().unwrap_or_default();
        let max_key = keys.next_back().unwrap_or_else(|| min_key.clone());

        Ok(SSTable {
            path,
            entry_count,
            min_key,
            max_key,
            file_size,
        })
    }
}

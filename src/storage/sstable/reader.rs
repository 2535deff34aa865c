//! Read side of a table: the whole key index lives in memory, values stay
//! on disk and are fetched one seek per hit.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::store::Probe;

use super::{read_u32, read_u64, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// An open, verified table
pub struct SSTableReader {
    path: PathBuf,
    /// Held only for the seek and read of one value
    file: Mutex<BufReader<File>>,
    /// key → offset of its data entry
    index: BTreeMap<Vec<u8>, u64>,
    entry_count: u64,
}

impl SSTableReader {
    /// Check header, footer and data CRC, then load the index
    ///
    /// Any mismatch is an [`Error::Storage`]; a damaged table is never
    /// served.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(Error::Storage(format!(
                "SSTable {} too small: {} bytes",
                path.display(),
                file_size
            )));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(Error::Storage(format!(
                "Invalid SSTable magic: expected GTSS, got {:?}",
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(Error::Storage(format!(
                "Unsupported SSTable version: {}",
                version
            )));
        }

        let entry_count = read_u64(&header, 6);

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = read_u64(&footer, 0);
        let data_crc = read_u32(&footer, 8);

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(Error::Storage(format!(
                "SSTable {} has index offset {} outside the file",
                path.display(),
                index_offset
            )));
        }

        Self::verify_data(&mut file, index_offset, data_crc, path)?;

        let index_block_size = file_size - FOOTER_SIZE - index_offset;
        let mut index_data = vec![0u8; index_block_size as usize];
        file.seek(SeekFrom::Start(index_offset))?;
        file.read_exact(&mut index_data)?;

        let index = Self::parse_index(&index_data, path)?;
        if index.len() as u64 != entry_count {
            return Err(Error::Storage(format!(
                "SSTable {} index holds {} keys, header says {}",
                path.display(),
                index.len(),
                entry_count
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufReader::new(file)),
            index,
            entry_count,
        })
    }

    /// CRC32 of the data block must equal the footer's
    fn verify_data(file: &mut File, index_offset: u64, expected: u32, path: &Path) -> Result<()> {
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut data = BufReader::new(&mut *file).take(index_offset - HEADER_SIZE);
        let mut hasher = crc32fast::Hasher::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = data.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
        }

        let actual = hasher.finalize();
        if actual != expected {
            return Err(Error::Storage(format!(
                "SSTable {} data checksum mismatch: stored {:#010x}, computed {:#010x}",
                path.display(),
                expected,
                actual
            )));
        }
        Ok(())
    }

    /// `(klen u32, offset u64, key)*` until the block ends
    fn parse_index(index_data: &[u8], path: &Path) -> Result<BTreeMap<Vec<u8>, u64>> {
        let mut index = BTreeMap::new();
        let mut pos = 0;
        while pos < index_data.len() {
            if pos + 12 > index_data.len() {
                return Err(Error::Storage(format!(
                    "SSTable {} index truncated at byte {}",
                    path.display(),
                    pos
                )));
            }
            let key_len = read_u32(index_data, pos) as usize;
            let offset = read_u64(index_data, pos + 4);
            pos += 12;

            if pos + key_len > index_data.len() {
                return Err(Error::Storage(format!(
                    "SSTable {} index key overruns block at byte {}",
                    path.display(),
                    pos
                )));
            }
            index.insert(index_data[pos..pos + key_len].to_vec(), offset);
            pos += key_len;
        }
        Ok(index)
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => return Ok(None),
        };

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; 8];
        file.read_exact(&mut header)?;

        let key_len = read_u32(&header, 0) as i64;
        let val_len = read_u32(&header, 4) as usize;

        // key already known from the index
        file.seek(SeekFrom::Current(key_len))?;

        let mut value = vec![0u8; val_len];
        file.read_exact(&mut value)?;

        Ok(Some(value))
    }

    /// Index neighbour of `key` in the given direction
    pub fn probe(&self, key: &[u8], probe: Probe) -> Option<&[u8]> {
        let found = match probe {
            Probe::Ceiling => self.index.range::<[u8], _>((Included(key), Unbounded)).next(),
            Probe::Higher => self.index.range::<[u8], _>((Excluded(key), Unbounded)).next(),
            Probe::Lower => self.index.range::<[u8], _>((Unbounded, Excluded(key))).next_back(),
        };
        found.map(|(k, _)| k.as_slice())
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Key-span check; `false` for an empty table
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }
}

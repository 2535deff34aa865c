//! Appending side of the log

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{Error, Result};

use super::{Operation, WalEntry, WalRecovery};

/// Owns `wal.log` for appends; the engine keeps it behind a mutex
pub struct WalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// LSN the next appended entry will get
    current_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries written since the last fsync
    uncommitted: usize,
}

impl WalWriter {
    /// Open `path` for appending, creating it if needed
    ///
    /// LSNs continue after the last entry on file. A file ending in a torn
    /// frame is refused; run [`WalRecovery::recover`] on it first.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let current_lsn = if path.exists() {
            let stats = WalRecovery::verify(path)?;
            if stats.was_truncated {
                return Err(Error::WalCorruption(format!(
                    "{} ends with a partial entry; recover it before writing",
                    path.display()
                )));
            }
            stats.last_lsn + 1
        } else {
            1
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            current_lsn,
            sync_strategy,
            uncommitted: 0,
        })
    }

    /// Frame and write `operation`, fsyncing as the strategy demands
    ///
    /// Returns the LSN assigned to it.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.current_lsn;
        let bytes = WalEntry::new(lsn, operation).serialize()?;

        self.writer
            .write_all(&bytes)
            .and_then(|_| self.writer.flush())
            .map_err(|e| Error::WalWrite(format!("{}: {}", self.path.display(), e)))?;

        self.current_lsn += 1;
        self.uncommitted += 1;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } => {
                if self.uncommitted >= count {
                    self.sync()?;
                }
            }
        }

        Ok(lsn)
    }

    /// fsync now
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Drop every entry; called once they are durable elsewhere
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_ref();
        file.set_len(0)?;
        file.sync_all()?;

        self.current_lsn = 1;
        self.uncommitted = 0;
        Ok(())
    }

    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    /// Entries appended since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }
}

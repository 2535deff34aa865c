//! Startup scan of the log after an unclean shutdown

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;

use super::reader::{Frame, WalReader};
use super::WalEntry;

pub struct WalRecovery;

/// Counters from one pass over the log
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    pub entries_recovered: u64,
    /// Complete frames that failed their CRC or did not decode
    pub entries_corrupted: u64,
    pub last_lsn: u64,
    /// The file ended inside a frame
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Every intact entry in file order
    ///
    /// Damaged frames are skipped and counted. A torn tail is cut off the
    /// file so the writer can append after the last good frame.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let mut entries = Vec::new();
        let (result, valid_len) = Self::scan(path, |entry| entries.push(entry))?;

        if result.was_truncated {
            tracing::warn!(
                path = %path.display(),
                valid_len,
                "truncating partial WAL tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Same scan as [`WalRecovery::recover`], read-only
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (result, _) = Self::scan(path, |_| {})?;
        Ok(result)
    }

    /// Walk every frame, handing valid entries to `on_entry`
    ///
    /// Returns the stats and the length of the valid prefix of the file.
    fn scan(path: &Path, mut on_entry: impl FnMut(WalEntry)) -> Result<(RecoveryResult, u64)> {
        let mut reader = WalReader::open(path)?;
        let mut result = RecoveryResult::default();

        while let Some(frame) = reader.next_frame()? {
            match frame {
                Frame::Entry(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = result.last_lsn.max(entry.lsn);
                    on_entry(entry);
                }
                Frame::Corrupt { lsn, reason } => {
                    tracing::warn!(lsn, %reason, "skipping corrupted WAL entry");
                    result.entries_corrupted += 1;
                }
                Frame::Truncated => {
                    result.was_truncated = true;
                    break;
                }
            }
        }

        Ok((result, reader.position()))
    }
}

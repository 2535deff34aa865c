//! Sequential frame reader over `wal.log`

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Error, Result};

use super::entry::FrameHeader;
use super::{WalEntry, HEADER_SIZE};

/// One frame as found on disk
pub(super) enum Frame {
    /// A well-formed entry
    Entry(WalEntry),

    /// A complete frame whose checksum or body did not verify
    Corrupt { lsn: u64, reason: String },

    /// The file ends in the middle of a frame
    Truncated,
}

/// Forward-only reader; recovery drives it frame by frame
pub struct WalReader {
    reader: BufReader<File>,
    /// Byte offset of the next frame
    position: u64,
    file_len: u64,
}

impl WalReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            file_len,
        })
    }

    /// `Ok(None)` at a clean end of file; a torn or damaged frame is a
    /// `WalCorruption` error
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.next_frame()? {
            None => Ok(None),
            Some(Frame::Entry(entry)) => Ok(Some(entry)),
            Some(Frame::Corrupt { reason, .. }) => Err(Error::WalCorruption(reason)),
            Some(Frame::Truncated) => Err(Error::WalCorruption(format!(
                "partial entry at offset {}",
                self.position
            ))),
        }
    }

    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Offset just past the last frame fully consumed
    pub(super) fn position(&self) -> u64 {
        self.position
    }

    /// Read the next frame without interpreting failures
    ///
    /// The position only advances past complete frames, so after
    /// `Truncated` it still points at the start of the partial tail.
    pub(super) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let got = read_up_to(&mut self.reader, &mut header_buf)?;
        if got == 0 {
            return Ok(None);
        }
        if got < HEADER_SIZE {
            return Ok(Some(Frame::Truncated));
        }

        let header = FrameHeader::parse(&header_buf)?;
        let frame_end = self.position + HEADER_SIZE as u64 + header.len as u64;
        if frame_end > self.file_len {
            return Ok(Some(Frame::Truncated));
        }

        let mut body = vec![0u8; header.len as usize];
        if read_up_to(&mut self.reader, &mut body)? < body.len() {
            return Ok(Some(Frame::Truncated));
        }
        self.position = frame_end;

        match WalEntry::from_parts(header, &body) {
            Ok(entry) => Ok(Some(Frame::Entry(entry))),
            Err(Error::WalCorruption(reason)) => Ok(Some(Frame::Corrupt {
                lsn: header.lsn,
                reason,
            })),
            Err(e) => Err(e),
        }
    }
}

/// Fill `buf` as far as the stream allows, returning the byte count
fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Stops after yielding the first error
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

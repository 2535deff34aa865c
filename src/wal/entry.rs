//! Log entries and their on-disk frame

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// lsn u64 ‖ crc u32 ‖ len u32
pub const HEADER_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    pub lsn: u64,
    pub operation: Operation,
    /// Unix millis at creation
    pub timestamp: u64,
}

/// A mutation as it will be replayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Replayed whole; a batch whose frame is torn or damaged is dropped
    Batch { pairs: Vec<(Vec<u8>, Vec<u8>)> },
}

/// Body of a frame, the part covered by the length field
#[derive(Serialize, Deserialize)]
struct Body {
    operation: Operation,
    timestamp: u64,
}

impl WalEntry {
    /// Create an entry stamped with the current wall-clock time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Encode the entry as `[lsn][crc][len][body]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let body = self.encode_body()?;
        let crc = Self::checksum(self.lsn, &body);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode one framed entry, verifying its checksum
    ///
    /// `bytes` must hold exactly one frame; trailing bytes are rejected.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::parse(bytes)?;

        let expected = HEADER_SIZE + header.len as usize;
        if bytes.len() != expected {
            return Err(Error::WalCorruption(format!(
                "frame length mismatch: header says {} bytes, got {}",
                expected,
                bytes.len()
            )));
        }

        Self::from_parts(header, &bytes[HEADER_SIZE..])
    }

    /// Build an entry from a parsed header and its body bytes
    pub(super) fn from_parts(header: FrameHeader, body: &[u8]) -> Result<Self> {
        let actual = Self::checksum(header.lsn, body);
        if actual != header.crc {
            return Err(Error::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:#010x}, computed {:#010x}",
                header.lsn, header.crc, actual
            )));
        }

        let decoded: Body = bincode::deserialize(body)
            .map_err(|e| Error::WalCorruption(format!("undecodable body: {}", e)))?;

        Ok(Self {
            lsn: header.lsn,
            operation: decoded.operation,
            timestamp: decoded.timestamp,
        })
    }

    fn body_ref(&self) -> Body {
        Body {
            operation: self.operation.clone(),
            timestamp: self.timestamp,
        }
    }

    fn encode_body(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.body_ref())?)
    }

    fn checksum(lsn: u64, body: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(body);
        hasher.finalize()
    }
}

/// Decoded fixed-size frame header
#[derive(Debug, Clone, Copy)]
pub(super) struct FrameHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::WalCorruption(format!(
                "frame too short: {} bytes, header needs {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&bytes[0..8]);
        crc.copy_from_slice(&bytes[8..12]);
        len.copy_from_slice(&bytes[12..16]);

        Ok(Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len),
        })
    }
}

//! Tests for WAL entry framing
//!
//! These tests verify:
//! - Put and Batch operations survive encoding
//! - CRC mismatches and bad lengths are reported as corruption

use geots::wal::{Operation, WalEntry, HEADER_SIZE};
use geots::Error;

fn batch_entry(lsn: u64) -> WalEntry {
    WalEntry::new(
        lsn,
        Operation::Batch {
            pairs: vec![
                (b"\x02item".to_vec(), br#"{"load":0.5}"#.to_vec()),
                (b"\x01cpu".to_vec(), b"\x02item".to_vec()),
            ],
        },
    )
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_batch_entry_decodes_intact() {
    let entry = batch_entry(7);
    let bytes = entry.serialize().unwrap();

    assert_eq!(WalEntry::deserialize(&bytes).unwrap(), entry);
}

#[test]
fn test_header_layout() {
    let entry = WalEntry::new(
        0x0102,
        Operation::Put {
            key: b"k".to_vec(),
            value: vec![],
        },
    );
    let bytes = entry.serialize().unwrap();

    assert_eq!(&bytes[0..8], &0x0102u64.to_le_bytes());
    let body_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
    assert_eq!(bytes.len(), HEADER_SIZE + body_len);

    // crc covers the lsn and the body
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&bytes[0..8]);
    hasher.update(&bytes[HEADER_SIZE..]);
    assert_eq!(&bytes[8..12], &hasher.finalize().to_le_bytes());
}

// =============================================================================
// Corruption Detection Tests
// =============================================================================

#[test]
fn test_flipped_body_byte_detected() {
    let mut bytes = batch_entry(1).serialize().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    assert!(matches!(
        WalEntry::deserialize(&bytes),
        Err(Error::WalCorruption(_))
    ));
}

#[test]
fn test_flipped_lsn_detected() {
    // The LSN is covered by the checksum
    let mut bytes = batch_entry(1).serialize().unwrap();
    bytes[0] ^= 0x01;

    assert!(matches!(
        WalEntry::deserialize(&bytes),
        Err(Error::WalCorruption(_))
    ));
}

#[test]
fn test_truncated_and_padded_frames_rejected() {
    let bytes = batch_entry(1).serialize().unwrap();

    assert!(WalEntry::deserialize(&bytes[..HEADER_SIZE - 1]).is_err());
    assert!(WalEntry::deserialize(&bytes[..bytes.len() - 1]).is_err());

    let mut padded = bytes.clone();
    padded.push(0);
    assert!(WalEntry::deserialize(&padded).is_err());
}

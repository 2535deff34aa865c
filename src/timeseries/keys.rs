//! Composite key encoding for versioned series.
//!
//! Keys are designed so the store's byte order is the logical order:
//! - all items of one series are contiguous and sorted by version
//! - all latest-pointer records sort before every item
//!
//! # Key Format
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Item key                                                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  tag: u8            (1 byte)  - 0x02                         │
//! │  name_len: u32 LE   (4 bytes) - length of the series name    │
//! │  name               (n bytes)                                │
//! │  version: u64 BE    (8 bytes) - two's complement of the i64  │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Meta (latest-pointer) key                                   │
//! ├──────────────────────────────────────────────────────────────┤
//! │  tag: u8            (1 byte)  - 0x01                         │
//! │  name               (n bytes)                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The length field keeps two series from interleaving when one name is a
//! prefix of another. Big-endian versions make byte order match numeric
//! order for non-negative versions; negative versions sort after them.

use crate::error::{Error, Result};

/// Namespace tag of latest-pointer records.
pub const TAG_META: u8 = 0x01;

/// Namespace tag of versioned item records.
pub const TAG_ITEM: u8 = 0x02;

/// Tag plus the name length field.
const ITEM_HEADER: usize = 5;

/// Width of the trailing version field.
const VERSION_LEN: usize = 8;

/// Encode the key of one version of a series.
#[must_use]
pub fn encode_item_key(name: &[u8], version: i64) -> Vec<u8> {
    let mut key = item_prefix(name);
    key.extend_from_slice(&(version as u64).to_be_bytes());
    key
}

/// Decode an item key back into its series name and version.
pub fn decode_item_key(key: &[u8]) -> Result<(Vec<u8>, i64)> {
    if key.len() < ITEM_HEADER + VERSION_LEN {
        return Err(Error::MalformedKey(format!(
            "item key too short: {} bytes",
            key.len()
        )));
    }
    if key[0] != TAG_ITEM {
        return Err(Error::MalformedKey(format!(
            "expected item tag {:#04x}, found {:#04x}",
            TAG_ITEM, key[0]
        )));
    }

    let mut len = [0u8; 4];
    len.copy_from_slice(&key[1..ITEM_HEADER]);
    let name_len = u32::from_le_bytes(len) as usize;

    if key.len() != ITEM_HEADER + name_len + VERSION_LEN {
        return Err(Error::MalformedKey(format!(
            "name length {} does not fit a {}-byte key",
            name_len,
            key.len()
        )));
    }

    let name = key[ITEM_HEADER..ITEM_HEADER + name_len].to_vec();
    Ok((name, version_of(key)?))
}

/// Read the version out of an item key without decoding the name.
///
/// Latest-pointer values are item keys, so this resolves a pointer's
/// version.
pub fn version_of(key: &[u8]) -> Result<i64> {
    if key.len() < ITEM_HEADER + VERSION_LEN {
        return Err(Error::MalformedKey(format!(
            "item key too short: {} bytes",
            key.len()
        )));
    }

    let mut raw = [0u8; VERSION_LEN];
    raw.copy_from_slice(&key[key.len() - VERSION_LEN..]);
    Ok(u64::from_be_bytes(raw) as i64)
}

/// Common prefix of every item key of a series.
#[must_use]
pub fn item_prefix(name: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(ITEM_HEADER + name.len() + VERSION_LEN);
    key.push(TAG_ITEM);
    key.extend_from_slice(&(name.len() as u32).to_le_bytes());
    key.extend_from_slice(name);
    key
}

/// Encode the latest-pointer key of a series.
#[must_use]
pub fn encode_meta_key(name: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + name.len());
    key.push(TAG_META);
    key.extend_from_slice(name);
    key
}

/// Series name of a meta key, or `None` for keys of another namespace.
#[must_use]
pub fn decode_meta_key(key: &[u8]) -> Option<&[u8]> {
    match key.split_first() {
        Some((&TAG_META, name)) => Some(name),
        _ => None,
    }
}

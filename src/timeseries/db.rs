//! Write/Read Path
//!
//! Every write stores two records in one batch:
//!
//! ```text
//!   item(name, version) → payload
//!   meta(name)          → item(name, version)     (latest pointer)
//! ```
//!
//! The pointer always names the most recently *written* version, which is
//! not necessarily the numerically largest one.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::store::OrderedStore;

use super::keys::{encode_item_key, encode_meta_key, version_of};

/// One version of a series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: Vec<u8>,
    pub version: i64,
    pub data: Vec<u8>,
}

/// A window of records plus the position to resume from
///
/// The cursor is a version for time scans and a series name for name scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<C> {
    pub records: Vec<Record>,
    pub cursor: C,
}

/// Versioned time-series storage over an ordered store
pub struct TimeSeriesDb<S = Engine> {
    pub(super) store: S,
}

impl<S: OrderedStore> TimeSeriesDb<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the store, e.g. to close it
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Append a version of `name`
    ///
    /// A `version` below 1 is replaced by the current time in nanoseconds.
    pub fn put(&self, name: &[u8], data: &[u8], version: i64) -> Result<Record> {
        let version = if version < 1 { now_nanos() } else { version };
        let item_key = encode_item_key(name, version);

        let batch = vec![
            (item_key.clone(), data.to_vec()),
            (encode_meta_key(name), item_key),
        ];
        if let Err(e) = self.store.write_batch(batch) {
            if let Error::PartialWrite { applied, .. } = &e {
                tracing::error!(
                    series = %String::from_utf8_lossy(name),
                    version,
                    applied,
                    "latest pointer not updated after item write"
                );
            }
            return Err(e);
        }

        Ok(Record {
            name: name.to_vec(),
            version,
            data: data.to_vec(),
        })
    }

    /// Whether any version of `name` was ever written
    pub fn exists(&self, name: &[u8]) -> Result<bool> {
        Ok(self.store.get(&encode_meta_key(name))?.is_some())
    }

    /// Read one version of `name`; a `version` below 1 reads the latest
    pub fn get(&self, name: &[u8], version: i64) -> Result<Record> {
        let pointer = self
            .store
            .get(&encode_meta_key(name))?
            .ok_or_else(|| not_found(name))?;

        if version < 1 {
            self.resolve(name, &pointer)
        } else {
            self.resolve(name, &encode_item_key(name, version))
        }
    }

    /// Load the record stored under an item key
    pub(super) fn resolve(&self, name: &[u8], item_key: &[u8]) -> Result<Record> {
        let version = version_of(item_key)?;
        let data = self
            .store
            .get(item_key)?
            .ok_or_else(|| Error::MissingVersion {
                name: String::from_utf8_lossy(name).into_owned(),
                version,
            })?;

        Ok(Record {
            name: name.to_vec(),
            version,
            data,
        })
    }
}

pub(super) fn not_found(name: &[u8]) -> Error {
    Error::NotFound(String::from_utf8_lossy(name).into_owned())
}

/// Wall-clock time in nanoseconds since the Unix epoch, never below 1
pub fn now_nanos() -> i64 {
    version_at(SystemTime::now())
}

/// Version for a write stamped at `time`
///
/// Versions below 1 mean "latest" to readers, so a clock set before the
/// epoch is clamped to 1.
fn version_at(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX).max(1),
        Err(e) => {
            tracing::warn!(behind = ?e.duration(), "system clock is before the Unix epoch");
            1
        }
    }
}

//! Ordered Store Contract
//!
//! The minimal interface the time-series layer needs from a byte-keyed,
//! lexicographically ordered key-value store.
//!
//! ## Cursor semantics
//! - `seek(key)` positions on the first key `>= key`, or past the end
//! - `next()` returns the entry under the cursor, then moves forward
//! - `prev()` returns the entry under the cursor, then moves backward
//! - once a cursor walks off either end it reports EOF (`None`) both ways
//! - `seek_last()` positions on the last key of the store

use crate::error::{Error, Result};

/// A key/value pair yielded by a cursor
pub type Entry = (Vec<u8>, Vec<u8>);

/// Direction of a nearest-key lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Smallest key `>= target`
    Ceiling,
    /// Smallest key `> target`
    Higher,
    /// Largest key `< target`
    Lower,
}

/// Bidirectional cursor over an ordered store
pub trait StoreCursor {
    fn next(&mut self) -> Result<Option<Entry>>;

    fn prev(&mut self) -> Result<Option<Entry>>;
}

/// Byte-keyed store iterated in lexicographic key order
pub trait OrderedStore: Send + Sync {
    type Cursor<'a>: StoreCursor
    where
        Self: 'a;

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Store several pairs
    ///
    /// The default applies them one by one; a failure after the first pair
    /// is reported as `PartialWrite`. Stores that can apply a batch
    /// atomically should override this.
    fn write_batch(&self, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Result<()> {
        for (applied, (key, value)) in pairs.iter().enumerate() {
            if let Err(e) = self.set(key, value) {
                if applied == 0 {
                    return Err(e);
                }
                return Err(Error::PartialWrite {
                    applied,
                    source: Box::new(e),
                });
            }
        }
        Ok(())
    }

    fn seek(&self, key: &[u8]) -> Result<Self::Cursor<'_>>;

    fn seek_last(&self) -> Result<Self::Cursor<'_>>;
}

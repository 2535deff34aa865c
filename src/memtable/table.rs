use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::store::Probe;

/// Sorted in-memory buffer in front of the SSTables
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    /// Sum of key and value lengths; drives the flush threshold
    size: AtomicUsize,
}

impl MemTable {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Insert or overwrite, returning the size afterwards
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        let mut data = self.data.write();
        self.insert_locked(&mut data, key, value);
        self.size()
    }

    /// Insert every pair under one write guard, returning the size afterwards
    pub fn put_batch(&self, pairs: Vec<(Vec<u8>, Vec<u8>)>) -> usize {
        let mut data = self.data.write();
        for (key, value) in pairs {
            self.insert_locked(&mut data, key, value);
        }
        self.size()
    }

    fn insert_locked(&self, data: &mut BTreeMap<Vec<u8>, Vec<u8>>, key: Vec<u8>, value: Vec<u8>) {
        let key_len = key.len();
        let value_len = value.len();
        match data.insert(key, value) {
            // key bytes were already counted, only the value changed
            Some(old) => {
                self.size.fetch_add(value_len, Ordering::SeqCst);
                self.size.fetch_sub(old.len(), Ordering::SeqCst);
            }
            None => {
                self.size.fetch_add(key_len + value_len, Ordering::SeqCst);
            }
        }
    }

    /// Nearest key in the given direction
    pub fn probe(&self, key: &[u8], probe: Probe) -> Option<Vec<u8>> {
        let data = self.data.read();
        let found = match probe {
            Probe::Ceiling => data.range::<[u8], _>((Included(key), Unbounded)).next(),
            Probe::Higher => data.range::<[u8], _>((Excluded(key), Unbounded)).next(),
            Probe::Lower => data.range::<[u8], _>((Unbounded, Excluded(key))).next_back(),
        };
        found.map(|(k, _)| k.clone())
    }

    /// Largest key held
    pub fn last_key(&self) -> Option<Vec<u8>> {
        self.data.read().keys().next_back().cloned()
    }

    pub fn size(&self) -> usize {
        self.size.load(Ordering::SeqCst)
    }

    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Sorted copy of the contents, taken under the read lock
    pub fn iter(&self) -> MemTableIterator {
        let entries: Vec<_> = self
            .data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        MemTableIterator {
            inner: entries.into_iter(),
        }
    }

    pub fn clear(&self) {
        let mut data = self.data.write();
        data.clear();
        self.size.store(0, Ordering::SeqCst);
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned entries returned by [`MemTable::iter`]
pub struct MemTableIterator {
    inner: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl Iterator for MemTableIterator {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

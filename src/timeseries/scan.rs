//! Range Scanner
//!
//! Three paginated walks over the ordered store:
//!
//! | scan           | namespace | direction | bounds                      | cursor               |
//! |----------------|-----------|-----------|-----------------------------|----------------------|
//! | `data_points`  | items     | backward  | `(end, start)` exclusive    | last version         |
//! | `keys`         | meta      | forward   | `[start, end]`              | `next_key(last)`     |
//! | `reverse_keys` | meta      | backward  | `[end, start]`              | `prev_key(last)`     |
//!
//! A limit of 0 means unbounded. Cursors re-read the store on every step, so
//! a scan running next to writers may or may not see their records.

use crate::error::Result;
use crate::store::{Entry, OrderedStore, StoreCursor};

use super::db::{not_found, now_nanos, Page, Record, TimeSeriesDb};
use super::keys::{
    decode_item_key, decode_meta_key, encode_item_key, encode_meta_key, item_prefix, TAG_ITEM,
};
use super::step::{next_key, prev_key};

impl<S: OrderedStore> TimeSeriesDb<S> {
    /// Versions of `name` strictly between `end` and `start`, newest first
    ///
    /// A `start` below 1 means now. Pass the returned cursor as the next
    /// call's `start`; the boundary version is not returned twice.
    pub fn data_points(&self, name: &[u8], start: i64, end: i64, limit: usize) -> Result<Page<i64>> {
        if !self.exists(name)? {
            return Err(not_found(name));
        }

        let start = if start < 1 { now_nanos() } else { start };
        let seek_key = encode_item_key(name, start);
        let end_key = encode_item_key(name, end);
        let prefix = item_prefix(name);

        let (mut cursor, landing) = self.seek_backward(&seek_key)?;
        let mut entry = match landing {
            Some((key, _)) if key >= seek_key => cursor.prev()?,
            other => other,
        };

        let mut records = Vec::new();
        while let Some((key, data)) = entry {
            if !key.starts_with(&prefix) || key <= end_key {
                break;
            }

            let (_, version) = decode_item_key(&key)?;
            records.push(Record {
                name: name.to_vec(),
                version,
                data,
            });
            if limit_reached(&records, limit) {
                break;
            }
            entry = cursor.prev()?;
        }

        let cursor = records.last().map_or(0, |r| r.version);
        Ok(Page { records, cursor })
    }

    /// Latest record of every series named in `[start, end]`, ascending
    ///
    /// An empty `end` means no upper bound.
    pub fn keys(&self, start: &[u8], end: &[u8], limit: usize) -> Result<Page<Vec<u8>>> {
        let end_key = (!end.is_empty()).then(|| encode_meta_key(end));

        let mut cursor = self.store.seek(&encode_meta_key(start))?;
        let mut records = Vec::new();
        while let Some((key, pointer)) = cursor.next()? {
            let Some(name) = decode_meta_key(&key) else {
                break;
            };
            if end_key.as_ref().is_some_and(|end_key| key > *end_key) {
                break;
            }

            records.push(self.resolve(name, &pointer)?);
            if limit_reached(&records, limit) {
                break;
            }
        }

        let cursor = records.last().map(|r| next_key(&r.name)).unwrap_or_default();
        Ok(Page { records, cursor })
    }

    /// Latest record of every series named in `[end, start]`, descending
    ///
    /// An empty `start` begins at the last series.
    pub fn reverse_keys(&self, start: &[u8], end: &[u8], limit: usize) -> Result<Page<Vec<u8>>> {
        // Item keys all sort above the meta namespace
        let bound = if start.is_empty() {
            vec![TAG_ITEM]
        } else {
            encode_meta_key(start)
        };
        let end_key = encode_meta_key(end);

        let (mut cursor, landing) = self.seek_backward(&bound)?;
        let mut entry = match landing {
            Some((key, _)) if key > bound || decode_meta_key(&key).is_none() => cursor.prev()?,
            other => other,
        };

        let mut records = Vec::new();
        while let Some((key, pointer)) = entry {
            let Some(name) = decode_meta_key(&key) else {
                break;
            };
            if key < end_key {
                break;
            }

            records.push(self.resolve(name, &pointer)?);
            if limit_reached(&records, limit) {
                break;
            }
            entry = cursor.prev()?;
        }

        let cursor = records.last().map(|r| prev_key(&r.name)).unwrap_or_default();
        Ok(Page { records, cursor })
    }

    /// Seek to `key` and take the first backward step
    ///
    /// When the seek lands past the end of the store the walk restarts once
    /// from the last key.
    fn seek_backward(&self, key: &[u8]) -> Result<(S::Cursor<'_>, Option<Entry>)> {
        let mut cursor = self.store.seek(key)?;
        if let Some(entry) = cursor.prev()? {
            return Ok((cursor, Some(entry)));
        }

        let mut cursor = self.store.seek_last()?;
        let entry = cursor.prev()?;
        Ok((cursor, entry))
    }
}

fn limit_reached(records: &[Record], limit: usize) -> bool {
    limit != 0 && records.len() >= limit
}

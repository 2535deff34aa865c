//! Time-Series Module
//!
//! Versioned series stored in an [`OrderedStore`]. Series names are opaque
//! bytes, versions are `i64` (nanoseconds by convention) and payloads are
//! opaque bytes.
//!
//! ## Layers
//! - `keys`: composite key codec
//! - `step`: lexicographic successor/predecessor for name cursors
//! - `db`: write path and point lookups
//! - `scan`: paginated range scans

pub mod keys;
pub mod step;

mod db;
mod scan;

pub use db::{now_nanos, Page, Record, TimeSeriesDb};

use crate::error::Result;
use crate::store::OrderedStore;

/// The operations the HTTP layer needs from a series store
pub trait TimeSeries: Send + Sync {
    fn put(&self, name: &[u8], data: &[u8], version: i64) -> Result<Record>;

    fn get(&self, name: &[u8], version: i64) -> Result<Record>;

    fn data_points(&self, name: &[u8], start: i64, end: i64, limit: usize) -> Result<Page<i64>>;
}

impl<S: OrderedStore> TimeSeries for TimeSeriesDb<S> {
    fn put(&self, name: &[u8], data: &[u8], version: i64) -> Result<Record> {
        TimeSeriesDb::put(self, name, data, version)
    }

    fn get(&self, name: &[u8], version: i64) -> Result<Record> {
        TimeSeriesDb::get(self, name, version)
    }

    fn data_points(&self, name: &[u8], start: i64, end: i64, limit: usize) -> Result<Page<i64>> {
        TimeSeriesDb::data_points(self, name, start, end, limit)
    }
}

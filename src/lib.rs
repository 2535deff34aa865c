//! # geots
//!
//! Versioned time-series storage on an embedded ordered key-value store.
//!
//! A series is a name plus a run of `(version, payload)` points, where the
//! version is normally a nanosecond timestamp. Points of one series sit next
//! to each other in key order, ascending by version, and a per-series meta
//! key points at the newest point.
//!
//! ## Layers
//!
//! ```text
//!   api (axum)          geots-cli
//!        \                 /
//!         TimeSeriesDb            timeseries::{keys, step, scan}
//!              |
//!         OrderedStore            set / get / write_batch / seek cursors
//!              |
//!           Engine                one writer, many readers
//!          /      \
//!       wal      memtable ──flush──▶ storage (SSTables)
//! ```

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod store;
pub mod engine;
pub mod timeseries;
pub mod api;

pub use error::{Error, Result};
pub use config::Config;
pub use engine::Engine;
pub use store::{OrderedStore, StoreCursor};
pub use timeseries::{Page, Record, TimeSeries, TimeSeriesDb};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

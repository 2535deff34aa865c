//! On-disk layer: immutable SSTables and the manager that owns them
//!
//! Tables are never compacted. A point read walks them newest first; an
//! ordered probe asks every table and keeps the closest answer.

mod sstable;
mod manager;

pub use sstable::{SSTable, SSTableBuilder, SSTableReader};
pub use manager::StorageManager;

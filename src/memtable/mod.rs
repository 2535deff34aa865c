//! Writes that have not reached an SSTable yet
//!
//! A `BTreeMap` behind a `parking_lot::RwLock`. Sorted keys give the
//! flush its input order and answer cursor probes directly. A batch is
//! inserted under one write guard, so readers see all of it or none.

mod table;

pub use table::{MemTable, MemTableIterator};

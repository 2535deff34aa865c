//! Time-series layer tests


use geots::config::{Config, WalSyncStrategy};
use geots::{Engine, TimeSeriesDb};
use tempfile::TempDir;

/// A database on a fresh engine in a temp directory
pub fn setup_db() -> (TempDir, TimeSeriesDb) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build();
    let db = TimeSeriesDb::new(Engine::open(config).unwrap());
    (temp_dir, db)
}

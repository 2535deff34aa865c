//! Engine and server settings

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Settings for one geots instance
///
/// ```text
/// {data_dir}/
///   wal.log        appended before every mutation
///   sstables/      sstable_000001.sst, sstable_000002.sst, ...
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,

    pub wal_sync_strategy: WalSyncStrategy,

    /// Approximate MemTable footprint, in bytes, that triggers a flush
    pub memtable_size_limit: usize,

    /// Address `geots-server` binds to
    pub listen_addr: String,

    /// Data points per response of `GET /api/timeseries/{name}`
    pub page_size: usize,
}

/// When the WAL writer calls fsync
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// After each appended entry
    EveryWrite,

    /// Once `count` entries are pending
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./geots_data"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            memtable_size_limit: 64 << 20,
            listen_addr: "127.0.0.1:8010".to_string(),
            page_size: 50,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.memtable_size_limit == 0 {
            return Err(Error::Config("memtable_size_limit must be positive".to_string()));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(Error::Config("WAL sync count must be positive".to_string()));
        }
        Ok(())
    }
}

/// Starts from [`Config::default`]; every setter overrides one field
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

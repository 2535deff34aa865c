//! Error types for geots
//!
//! Provides a unified error type for the store and the time-series layer.

use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for geots operations
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    /// A multi-key write stopped after `applied` keys had been stored.
    #[error("Partial write: {applied} key(s) applied before failure: {source}")]
    PartialWrite {
        applied: usize,
        #[source]
        source: Box<Error>,
    },

    // -------------------------------------------------------------------------
    // Time-Series Errors
    // -------------------------------------------------------------------------
    /// No latest-pointer record exists for the series.
    #[error("Series not found: {0}")]
    NotFound(String),

    /// The series exists but the requested version has no value.
    #[error("Version {version} of series {name} has no value")]
    MissingVersion { name: String, version: i64 },

    #[error("Malformed key: {0}")]
    MalformedKey(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

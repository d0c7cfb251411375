//! Error types for kvbench
//!
//! Three families of failure exist: backend errors raised by the storage
//! engines under test, validation errors raised when read-back data does not
//! match what was written, and configuration errors. Workload generation is
//! total and has no error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The main error type for a benchmark run
#[derive(Error, Debug)]
pub enum BenchError {
    /// Storage backend errors
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Write/read sets disagree
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Report rendering errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors outside of a backend (report output, storage root)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A result record was built before both phases completed
    #[error("Benchmark result is missing its {0} phase")]
    IncompleteResult(&'static str),
}

impl BenchError {
    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            BenchError::Backend(_) => "backend",
            BenchError::Validation(_) => "validation",
            BenchError::Config(_) => "config",
            BenchError::Serialization(_) => "serialization",
            BenchError::Io(_) => "io",
            BenchError::IncompleteResult(_) => "internal",
        }
    }

    /// Whether the error may be swallowed without invalidating a run
    pub fn is_tolerated(&self) -> bool {
        matches!(self, BenchError::Backend(e) if e.is_tolerated())
    }
}

/// Errors surfaced by a storage backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] heed::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Storage not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to delete storage directory {}: {source}", path.display())]
    StorageDirectoryDelete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Key listed without a value: {key}")]
    MissingValue { key: String },

    #[error("Stored bytes are not valid for this encoding: {reason}")]
    Decode { reason: String },

    #[error("Handle used after close")]
    Closed,

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BackendError {
    /// A failed clear of a storage directory usually means there was nothing
    /// to delete; it does not invalidate the run.
    pub fn is_tolerated(&self) -> bool {
        matches!(self, BackendError::StorageDirectoryDelete { .. })
    }
}

/// Disagreement between the written workload and the read-back entries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Read {read} entries but wrote {written}")]
    LengthMismatch { written: usize, read: usize },

    #[error("Written key {key} was not read back")]
    MissingKey { key: String },

    #[error("Read back key {key} that was never written")]
    UnexpectedKey { key: String },

    #[error("Value mismatch for key {key}: wrote {written}, read {read}")]
    ValueMismatch {
        key: String,
        written: String,
        read: String,
    },
}

impl ValidationError {
    /// Key the mismatch was reported on, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            ValidationError::LengthMismatch { .. } => None,
            ValidationError::MissingKey { key }
            | ValidationError::UnexpectedKey { key }
            | ValidationError::ValueMismatch { key, .. } => Some(key),
        }
    }
}

/// Configuration related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },

    #[error("Invalid environment override {var}={value}")]
    Env { var: String, value: String },
}

pub type Result<T> = std::result::Result<T, BenchError>;
pub type BackendResult<T> = std::result::Result<T, BackendError>;

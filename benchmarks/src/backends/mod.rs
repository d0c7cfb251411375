//! Storage backend capability contract
//!
//! Every store under test is reached through [`StorageBackend`], which opens a
//! [`StorageHandle`]. Handles are closed by value, so each one is released
//! exactly once. Synchronous stores implement the async methods by doing
//! their work inline; asynchronous stores await their storage thread.
//!
//! Stores that expose a forward-only cursor implement [`Cursor`] and read
//! through [`collect_entries`], which always closes the cursor.

pub mod lmdb_cache;
pub mod memory;
pub mod sled_store;
pub mod sqlite_storage;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, BackendResult, ConfigError};
use crate::workload::{generate_random_token, Encoding, KeyValuePair, Token, NAME_TOKEN_LENGTH};

pub use lmdb_cache::LmdbCache;
pub use memory::MemoryBackend;
pub use sled_store::SledStore;
pub use sqlite_storage::SqliteStorage;

/// Where and how to open a storage instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    pub root: PathBuf,
    pub name: String,
    pub create_if_missing: bool,
    pub error_if_exists: bool,
}

impl OpenOptions {
    /// A fresh, uniquely named instance that must not exist yet
    pub fn ephemeral(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            name: format!("{}.db", generate_random_token(NAME_TOKEN_LENGTH)),
            create_if_missing: true,
            error_if_exists: true,
        }
    }

    /// A named instance reused across runs
    pub fn in_place(root: impl Into<PathBuf>, name: &str) -> Self {
        Self {
            root: root.into(),
            name: name.to_string(),
            create_if_missing: true,
            error_if_exists: false,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// Resolve the instance path, enforcing the existence flags
    pub fn check_path(&self) -> BackendResult<PathBuf> {
        let path = self.path();
        let exists = path.exists();
        if exists && self.error_if_exists {
            return Err(BackendError::AlreadyExists { path });
        }
        if !exists && !self.create_if_missing {
            return Err(BackendError::NotFound { path });
        }
        Ok(path)
    }
}

/// A store that can be opened for a benchmark run
#[async_trait]
pub trait StorageBackend<T: Token>: Send + Sync {
    type Handle: StorageHandle<T>;

    /// Fixed instance name for stores that live in one place and are cleared
    /// before each run. `None` means every run opens a fresh instance.
    fn instance_name(&self) -> Option<&str> {
        None
    }

    async fn open(&self, options: &OpenOptions) -> BackendResult<Self::Handle>;
}

/// An open storage instance
#[async_trait]
pub trait StorageHandle<T: Token>: Send {
    /// Remove all stored entries
    async fn clear(&mut self) -> BackendResult<()>;

    /// Insert every pair, in order
    async fn write_all(&mut self, pairs: &[KeyValuePair<T>]) -> BackendResult<()>;

    /// Every stored pair, starting from the first entry
    async fn read_all(&mut self) -> BackendResult<Vec<KeyValuePair<T>>>;

    /// Release the instance and its native resources
    async fn close(self) -> BackendResult<()>
    where
        Self: Sized;
}

/// Forward-only iteration over raw stored entries
pub trait Cursor {
    /// Position on the first entry, if any
    fn seek_to_first(&mut self) -> BackendResult<()>;

    /// Current entry, `None` once iteration is exhausted
    fn entry(&self) -> Option<(&[u8], &[u8])>;

    fn next(&mut self) -> BackendResult<()>;

    fn close(self) -> BackendResult<()>
    where
        Self: Sized;

    fn valid(&self) -> bool {
        self.entry().is_some()
    }

    fn key(&self) -> Option<&[u8]> {
        self.entry().map(|(key, _)| key)
    }

    fn value(&self) -> Option<&[u8]> {
        self.entry().map(|(_, value)| value)
    }
}

/// Drain a cursor from its first entry, decoding each pair.
///
/// The cursor is closed whether or not draining succeeded.
pub fn collect_entries<T: Token, C: Cursor>(mut cursor: C) -> BackendResult<Vec<KeyValuePair<T>>> {
    let drained = drain(&mut cursor);
    let closed = cursor.close();
    let entries = drained?;
    closed?;
    Ok(entries)
}

fn drain<T: Token, C: Cursor>(cursor: &mut C) -> BackendResult<Vec<KeyValuePair<T>>> {
    let mut entries = Vec::new();
    cursor.seek_to_first()?;
    while let Some((key, value)) = cursor.entry() {
        entries.push(KeyValuePair::new(T::from_bytes(key)?, T::from_bytes(value)?));
        cursor.next()?;
    }
    Ok(entries)
}

/// The stores the runner knows how to benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    SledString,
    SledBuffer,
    LmdbCache,
    SqliteAsync,
    Memory,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] = [
        BackendKind::SledBuffer,
        BackendKind::SledString,
        BackendKind::LmdbCache,
        BackendKind::SqliteAsync,
        BackendKind::Memory,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::SledString => "sled-string",
            BackendKind::SledBuffer => "sled-buffer",
            BackendKind::LmdbCache => "lmdb-cache",
            BackendKind::SqliteAsync => "sqlite-async",
            BackendKind::Memory => "memory",
        }
    }

    /// Heading shown above the backend's results
    pub fn title(&self) -> &'static str {
        match self {
            BackendKind::SledString => "Sled String",
            BackendKind::SledBuffer => "Sled Buffer",
            BackendKind::LmdbCache => "LMDB Cache",
            BackendKind::SqliteAsync => "SQLite AsyncStorage",
            BackendKind::Memory => "Memory",
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            BackendKind::SledBuffer => Encoding::Binary,
            _ => Encoding::Text,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BackendKind::SledString => "embedded log-structured store, string keys and values",
            BackendKind::SledBuffer => "embedded log-structured store, raw byte buffers",
            BackendKind::LmdbCache => "memory-mapped key-value cache",
            BackendKind::SqliteAsync => "asynchronous key-value storage on SQLite",
            BackendKind::Memory => "in-process ordered map",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.label() == s)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "backend".to_string(),
                value: s.to_string(),
            })
    }
}

pub(crate) fn ensure_dir(path: &Path) -> BackendResult<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

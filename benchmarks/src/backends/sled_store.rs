//! Embedded log-structured store (sled)
//!
//! Each run opens a fresh database directory under the storage root. Writes
//! are individual inserts; reads walk a cursor from the first key, so
//! read-back order is key order rather than write order.

use std::path::PathBuf;

use async_trait::async_trait;
use sled::IVec;
use tracing::debug;

use super::{collect_entries, Cursor, OpenOptions, StorageBackend, StorageHandle};
use crate::error::{BackendError, BackendResult};
use crate::workload::{KeyValuePair, Token};

/// Page cache given to each opened database
const DEFAULT_CACHE_CAPACITY: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct SledStore {
    cache_capacity: u64,
}

impl SledStore {
    pub fn new() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    pub fn with_cache_capacity(cache_capacity: u64) -> Self {
        Self { cache_capacity }
    }
}

impl Default for SledStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Token> StorageBackend<T> for SledStore {
    type Handle = SledHandle;

    async fn open(&self, options: &OpenOptions) -> BackendResult<SledHandle> {
        let path = options.check_path()?;
        let db = sled::Config::new()
            .path(&path)
            .cache_capacity(self.cache_capacity)
            .open()?;
        debug!(path = %path.display(), "opened sled database");

        Ok(SledHandle { db, path })
    }
}

pub struct SledHandle {
    db: sled::Db,
    path: PathBuf,
}

impl SledHandle {
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn put(&self, key: &[u8], value: &[u8]) -> BackendResult<()> {
        self.db.insert(key, value)?;
        Ok(())
    }

    pub fn new_cursor(&self) -> SledCursor {
        SledCursor {
            db: self.db.clone(),
            iter: None,
            current: None,
        }
    }
}

#[async_trait]
impl<T: Token> StorageHandle<T> for SledHandle {
    async fn clear(&mut self) -> BackendResult<()> {
        self.db.clear()?;
        Ok(())
    }

    async fn write_all(&mut self, pairs: &[KeyValuePair<T>]) -> BackendResult<()> {
        for pair in pairs {
            self.put(pair.key.as_bytes(), pair.value.as_bytes())?;
        }
        Ok(())
    }

    async fn read_all(&mut self) -> BackendResult<Vec<KeyValuePair<T>>> {
        collect_entries(self.new_cursor())
    }

    async fn close(self) -> BackendResult<()> {
        self.db.flush()?;
        debug!(path = %self.path.display(), "closed sled database");
        Ok(())
    }
}

/// Forward cursor over a sled tree
pub struct SledCursor {
    db: sled::Db,
    iter: Option<sled::Iter>,
    current: Option<(IVec, IVec)>,
}

impl SledCursor {
    fn advance(&mut self) -> BackendResult<()> {
        let iter = self.iter.as_mut().ok_or(BackendError::Closed)?;
        self.current = iter.next().transpose()?;
        Ok(())
    }
}

impl Cursor for SledCursor {
    fn seek_to_first(&mut self) -> BackendResult<()> {
        self.iter = Some(self.db.iter());
        self.advance()
    }

    fn entry(&self) -> Option<(&[u8], &[u8])> {
        self.current
            .as_ref()
            .map(|(key, value)| (key.as_ref(), value.as_ref()))
    }

    fn next(&mut self) -> BackendResult<()> {
        self.advance()
    }

    fn close(mut self) -> BackendResult<()> {
        self.current = None;
        self.iter = None;
        Ok(())
    }
}

//! In-process reference store
//!
//! An ordered map shared by every handle the backend opens, so it behaves as
//! an in-place store: contents survive a close and are cleared before each
//! run. Reads go through a snapshot cursor.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{collect_entries, Cursor, OpenOptions, StorageBackend, StorageHandle};
use crate::error::{BackendError, BackendResult};
use crate::workload::{KeyValuePair, Token};

type Entries = BTreeMap<Vec<u8>, Vec<u8>>;

const INSTANCE_NAME: &str = "memory";

#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored
    pub fn len(&self) -> BackendResult<usize> {
        Ok(lock(&self.entries)?.len())
    }

    pub fn is_empty(&self) -> BackendResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn lock(entries: &Mutex<Entries>) -> BackendResult<MutexGuard<'_, Entries>> {
    entries.lock().map_err(|_| BackendError::Poisoned)
}

#[async_trait]
impl<T: Token> StorageBackend<T> for MemoryBackend {
    type Handle = MemoryHandle;

    fn instance_name(&self) -> Option<&str> {
        Some(INSTANCE_NAME)
    }

    async fn open(&self, _options: &OpenOptions) -> BackendResult<MemoryHandle> {
        Ok(MemoryHandle {
            entries: Arc::clone(&self.entries),
        })
    }
}

pub struct MemoryHandle {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryHandle {
    fn put(&self, key: &[u8], value: &[u8]) -> BackendResult<()> {
        lock(&self.entries)?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn new_cursor(&self) -> MemoryCursor {
        MemoryCursor {
            entries: Arc::clone(&self.entries),
            snapshot: Vec::new(),
            pos: 0,
        }
    }
}

#[async_trait]
impl<T: Token> StorageHandle<T> for MemoryHandle {
    async fn clear(&mut self) -> BackendResult<()> {
        lock(&self.entries)?.clear();
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
        Ok(())
    }
}

/// Cursor over a point-in-time copy of the map
pub struct MemoryCursor {
    entries: Arc<Mutex<Entries>>,
    snapshot: Vec<(Vec<u8>, Vec<u8>)>,
    pos: usize,
}

impl Cursor for MemoryCursor {
    fn seek_to_first(&mut self) -> BackendResult<()> {
        self.snapshot = lock(&self.entries)?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.pos = 0;
        Ok(())
    }

    fn entry(&self) -> Option<(&[u8], &[u8])> {
        self.snapshot
            .get(self.pos)
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    fn next(&mut self) -> BackendResult<()> {
        self.pos += 1;
        Ok(())
    }

    fn close(self) -> BackendResult<()> {
        Ok(())
    }
}

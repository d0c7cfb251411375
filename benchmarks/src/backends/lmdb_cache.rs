//! Memory-mapped key-value cache (LMDB via heed)
//!
//! A single named instance is reused across runs and cleared before each
//! one. The read side lists every key first and then fetches values one by
//! one, the way a cache exposes `all_keys` and `get_string`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tracing::debug;

use super::{ensure_dir, OpenOptions, StorageBackend, StorageHandle};
use crate::error::{BackendError, BackendResult};
use crate::workload::{KeyValuePair, Token};

const INSTANCE_NAME: &str = "lmdb-cache";

/// Default map size, 1 GiB
pub const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;

type RawDatabase = Database<Bytes, Bytes>;

#[derive(Debug, Clone)]
pub struct LmdbCache {
    map_size: usize,
}

impl LmdbCache {
    pub fn new(map_size: usize) -> Self {
        Self { map_size }
    }
}

impl Default for LmdbCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAP_SIZE)
    }
}

#[async_trait]
impl<T: Token> StorageBackend<T> for LmdbCache {
    type Handle = LmdbHandle;

    fn instance_name(&self) -> Option<&str> {
        Some(INSTANCE_NAME)
    }

    async fn open(&self, options: &OpenOptions) -> BackendResult<LmdbHandle> {
        let path = options.check_path()?;
        ensure_dir(&path)?;

        let env = open_env(&path, self.map_size)?;
        let mut wtxn = env.write_txn()?;
        let db: RawDatabase = env.create_database(&mut wtxn, None)?;
        wtxn.commit()?;
        debug!(path = %path.display(), map_size = self.map_size, "opened LMDB environment");

        Ok(LmdbHandle { env, db, path })
    }
}

fn open_env(path: &Path, map_size: usize) -> BackendResult<Env> {
    // SAFETY: each instance directory is opened by at most one handle at a
    // time and is never modified outside of this process.
    let env = unsafe { EnvOpenOptions::new().map_size(map_size).max_dbs(1).open(path)? };
    Ok(env)
}

pub struct LmdbHandle {
    env: Env,
    db: RawDatabase,
    path: PathBuf,
}

impl LmdbHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn clear_all(&self) -> BackendResult<()> {
        let mut wtxn = self.env.write_txn()?;
        self.db.clear(&mut wtxn)?;
        wtxn.commit()?;
        Ok(())
    }

    fn put_all<T: Token>(&self, pairs: &[KeyValuePair<T>]) -> BackendResult<()> {
        let mut wtxn = self.env.write_txn()?;
        for pair in pairs {
            self.db.put(&mut wtxn, pair.key.as_bytes(), pair.value.as_bytes())?;
        }
        wtxn.commit()?;
        Ok(())
    }

    /// Every stored key, in key order
    pub fn all_keys<T: Token>(&self) -> BackendResult<Vec<T>> {
        let rtxn = self.env.read_txn()?;
        let mut keys = Vec::new();
        for entry in self.db.iter(&rtxn)? {
            let (key, _) = entry?;
            keys.push(T::from_bytes(key)?);
        }
        Ok(keys)
    }

    pub fn get<T: Token>(&self, key: &T) -> BackendResult<Option<T>> {
        let rtxn = self.env.read_txn()?;
        match self.db.get(&rtxn, key.as_bytes())? {
            Some(value) => Ok(Some(T::from_bytes(value)?)),
            None => Ok(None),
        }
    }

    fn get_many<T: Token>(&self, keys: Vec<T>) -> BackendResult<Vec<KeyValuePair<T>>> {
        let mut pairs = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.get(&key)?.ok_or_else(|| BackendError::MissingValue {
                key: key.describe(),
            })?;
            pairs.push(KeyValuePair::new(key, value));
        }
        Ok(pairs)
    }
}

#[async_trait]
impl<T: Token> StorageHandle<T> for LmdbHandle {
    async fn clear(&mut self) -> BackendResult<()> {
        self.clear_all()
    }

    async fn write_all(&mut self, pairs: &[KeyValuePair<T>]) -> BackendResult<()> {
        self.put_all(pairs)
    }

    async fn read_all(&mut self) -> BackendResult<Vec<KeyValuePair<T>>> {
        let keys = self.all_keys::<T>()?;
        self.get_many(keys)
    }

    async fn close(self) -> BackendResult<()> {
        let LmdbHandle { env, path, .. } = self;
        env.force_sync()?;
        env.prepare_for_closing().wait();
        debug!(path = %path.display(), "closed LMDB environment");
        Ok(())
    }
}

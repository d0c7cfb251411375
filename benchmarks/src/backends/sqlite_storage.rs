//! Asynchronous string storage on SQLite
//!
//! Every operation is shipped to the blocking pool and awaited, so callers
//! see a fully asynchronous API over a synchronous engine. The database file
//! lives in a storage directory that is created lazily on first use; clearing
//! the store deletes that directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{OpenOptions, StorageBackend, StorageHandle};
use crate::error::{BackendError, BackendResult};
use crate::workload::KeyValuePair;

const INSTANCE_NAME: &str = "async-storage";
const DATABASE_FILE: &str = "storage.sqlite";

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)";

#[derive(Debug, Clone, Default)]
pub struct SqliteStorage;

impl SqliteStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StorageBackend<String> for SqliteStorage {
    type Handle = SqliteHandle;

    fn instance_name(&self) -> Option<&str> {
        Some(INSTANCE_NAME)
    }

    async fn open(&self, options: &OpenOptions) -> BackendResult<SqliteHandle> {
        let dir = options.check_path()?;
        debug!(dir = %dir.display(), "opened async storage");
        Ok(SqliteHandle {
            dir,
            conn: Arc::new(Mutex::new(None)),
        })
    }
}

type SharedConnection = Arc<Mutex<Option<Connection>>>;

pub struct SqliteHandle {
    dir: PathBuf,
    conn: SharedConnection,
}

impl SqliteHandle {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run `op` against the connection on the blocking pool, opening the
    /// database first if needed
    async fn with_connection<R, F>(&self, op: F) -> BackendResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Connection) -> BackendResult<R> + Send + 'static,
    {
        let dir = self.dir.clone();
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            let conn = ensure_open(&mut guard, &dir)?;
            op(conn)
        })
        .await?
    }

    /// Store every pair in one transaction.
    ///
    /// The blocking pool needs owned data, so the pairs are copied once before
    /// the hand-off. That copy is part of what crossing the async bridge costs
    /// and is counted in the write phase.
    pub async fn multi_set(&self, pairs: &[KeyValuePair<String>]) -> BackendResult<()> {
        let pairs = pairs.to_vec();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached("INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)")?;
                for pair in &pairs {
                    stmt.execute(params![pair.key, pair.value])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_all_keys(&self) -> BackendResult<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached("SELECT key FROM kv ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keys)
        })
        .await
    }

    /// Values for `keys`, in the same order; `None` where a key has no value
    pub async fn multi_get(&self, keys: Vec<String>) -> BackendResult<Vec<(String, Option<String>)>> {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
            let mut entries = Vec::with_capacity(keys.len());
            for key in keys {
                let value = stmt
                    .query_row(params![key], |row| row.get::<_, String>(0))
                    .optional()?;
                entries.push((key, value));
            }
            Ok(entries)
        })
        .await
    }

    /// Close the connection and delete the storage directory
    async fn clear_storage(&self) -> BackendResult<()> {
        let dir = self.dir.clone();
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            if let Some(open) = lock(&conn)?.take() {
                close_connection(open)?;
            }
            std::fs::remove_dir_all(&dir)
                .map_err(|source| BackendError::StorageDirectoryDelete { path: dir, source })
        })
        .await?
    }
}

fn lock(conn: &Mutex<Option<Connection>>) -> BackendResult<MutexGuard<'_, Option<Connection>>> {
    conn.lock().map_err(|_| BackendError::Poisoned)
}

fn ensure_open<'a>(slot: &'a mut Option<Connection>, dir: &Path) -> BackendResult<&'a mut Connection> {
    if slot.is_none() {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join(DATABASE_FILE))?;
        conn.execute(CREATE_TABLE, [])?;
        *slot = Some(conn);
    }
    slot.as_mut().ok_or(BackendError::Closed)
}

fn close_connection(conn: Connection) -> BackendResult<()> {
    conn.close().map_err(|(_, e)| BackendError::Sqlite(e))
}

#[async_trait]
impl StorageHandle<String> for SqliteHandle {
    async fn clear(&mut self) -> BackendResult<()> {
        self.clear_storage().await
    }

    async fn write_all(&mut self, pairs: &[KeyValuePair<String>]) -> BackendResult<()> {
        self.multi_set(pairs).await
    }

    async fn read_all(&mut self) -> BackendResult<Vec<KeyValuePair<String>>> {
        let keys = self.get_all_keys().await?;
        self.multi_get(keys)
            .await?
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => Ok(KeyValuePair::new(key, value)),
                None => Err(BackendError::MissingValue { key }),
            })
            .collect()
    }

    async fn close(self) -> BackendResult<()> {
        let SqliteHandle { dir, conn } = self;
        tokio::task::spawn_blocking(move || match lock(&conn)?.take() {
            Some(open) => close_connection(open),
            None => Ok(()),
        })
        .await??;
        debug!(dir = %dir.display(), "closed async storage");
        Ok(())
    }
}

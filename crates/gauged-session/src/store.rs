use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use redb_bincode::TableDefinition;
use snafu::Snafu;

use crate::SessionId;

/// Key: session id string, value: encoded session record.
const SESSIONS_TABLE: TableDefinition<String, String> = TableDefinition::new("sessions");

/// The backing persistence surface could not be reached or failed mid
/// operation. Fatal for the request that triggered it.
#[derive(Debug, Snafu)]
#[snafu(display("session store unavailable: {message}"))]
pub struct StoreError {
    message: String,
}

impl StoreError {
    fn backend(err: impl fmt::Display) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Key/value persistence for serialized session records.
///
/// Implementations hold no session logic: expiry and state derivation are
/// the manager's concern. Concurrent writes to the same key are
/// last-write-wins.
#[async_trait]
pub trait SessionStore: fmt::Debug + Send + Sync {
    async fn get(&self, id: &SessionId) -> StoreResult<Option<String>>;
    async fn set(&self, id: &SessionId, value: String) -> StoreResult<()>;
    async fn delete(&self, id: &SessionId) -> StoreResult<()>;
}

/// Error type for opening the redb-backed store.
#[derive(Debug, Snafu)]
pub enum StoreOpenError {
    #[snafu(transparent)]
    Database { source: redb::DatabaseError },
    #[snafu(transparent)]
    Transaction {
        #[snafu(source(from(redb::TransactionError, Box::new)))]
        source: Box<redb::TransactionError>,
    },
    #[snafu(transparent)]
    Table { source: redb::TableError },
    #[snafu(transparent)]
    Commit { source: redb::CommitError },
}

/// Redb-backed session store.
///
/// The database handle is opened once at process start and shared; redb
/// serializes writers internally, so the store is safe for concurrently
/// executing requests.
#[derive(Debug, Clone)]
pub struct RedbSessionStore {
    db: Arc<redb_bincode::Database>,
}

impl RedbSessionStore {
    /// Create a store over an already-open database, initializing the
    /// sessions table if it doesn't exist.
    ///
    /// Performs blocking I/O; call from a blocking context or wrap in
    /// `spawn_blocking`.
    pub fn new(db: Arc<redb_bincode::Database>) -> Result<Self, StoreOpenError> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(&SESSIONS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

#[async_trait]
impl SessionStore for RedbSessionStore {
    async fn get(&self, id: &SessionId) -> StoreResult<Option<String>> {
        let key = id.as_str().to_owned();

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let read_txn = db.begin_read().map_err(StoreError::backend)?;
            let table = read_txn
                .open_table(&SESSIONS_TABLE)
                .map_err(StoreError::backend)?;

            Ok(table
                .get(&key)
                .map_err(StoreError::backend)?
                .map(|g| g.value()))
        })
        .await
        .map_err(StoreError::backend)?
    }

    async fn set(&self, id: &SessionId, value: String) -> StoreResult<()> {
        let key = id.as_str().to_owned();

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write().map_err(StoreError::backend)?;
            {
                let mut table = write_txn
                    .open_table(&SESSIONS_TABLE)
                    .map_err(StoreError::backend)?;
                table.insert(&key, &value).map_err(StoreError::backend)?;
            }
            write_txn.commit().map_err(StoreError::backend)?;
            Ok(())
        })
        .await
        .map_err(StoreError::backend)?
    }

    async fn delete(&self, id: &SessionId) -> StoreResult<()> {
        let key = id.as_str().to_owned();

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let write_txn = db.begin_write().map_err(StoreError::backend)?;
            {
                let mut table = write_txn
                    .open_table(&SESSIONS_TABLE)
                    .map_err(StoreError::backend)?;
                table.remove(&key).map_err(StoreError::backend)?;
            }
            write_txn.commit().map_err(StoreError::backend)?;
            Ok(())
        })
        .await
        .map_err(StoreError::backend)?
    }
}

/// In-memory store for tests and ephemeral setups.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<SessionId, String>>,
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, id: &SessionId) -> StoreResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .expect("Locking failed")
            .get(id)
            .cloned())
    }

    async fn set(&self, id: &SessionId, value: String) -> StoreResult<()> {
        self.entries
            .lock()
            .expect("Locking failed")
            .insert(id.clone(), value);
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> StoreResult<()> {
        self.entries.lock().expect("Locking failed").remove(id);
        Ok(())
    }
}

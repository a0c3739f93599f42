//! SQLite-backed document store.
//!
//! Each collection is one table holding the JSON document in `body`, with
//! `number` and `is_synced` lifted into indexed columns for the two lookups
//! the sync engine needs:
//!
//! ```text
//! id TEXT PRIMARY KEY | number INTEGER UNIQUE | is_synced INTEGER | body TEXT
//! ```
//!
//! `rusqlite` is blocking, so every call runs on the blocking thread pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use time::OffsetDateTime;
use tracing::warn;
use workbridge_core::{timestamp, InternalWorkOrder};

use crate::error::StorageError;
use crate::record::{DocumentId, StoredWorkOrder};
use crate::traits::{DocumentStore, StoreConnector};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen) => {
                StorageError::Unavailable(e.to_string())
            }
            _ => StorageError::Backend(e.to_string()),
        }
    }
}

fn is_valid_collection(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Opens [`SqliteStore`] handles on one database file and collection.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
    collection: String,
}

impl SqliteConnector {
    /// The collection name becomes a table name, so it must be a plain
    /// identifier (`[A-Za-z_][A-Za-z0-9_]*`).
    pub fn new(path: impl Into<PathBuf>, collection: &str) -> Result<Self, StorageError> {
        if !is_valid_collection(collection) {
            return Err(StorageError::Backend(format!(
                "invalid collection name '{collection}'"
            )));
        }
        Ok(SqliteConnector {
            path: path.into(),
            collection: collection.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl StoreConnector for SqliteConnector {
    type Store = SqliteStore;

    fn describe(&self) -> String {
        format!("sqlite://{} ({})", self.path.display(), self.collection)
    }

    async fn open(&self) -> Result<SqliteStore, StorageError> {
        let path = self.path.clone();
        let table = self.collection.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StorageError> {
            let conn = Connection::open(&path)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id        TEXT PRIMARY KEY,
                    number    INTEGER NOT NULL UNIQUE,
                    is_synced INTEGER NOT NULL DEFAULT 0,
                    body      TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS {table}_is_synced ON {table} (is_synced);"
            ))?;
            Ok(conn)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("blocking task failed: {e}")))??;

        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(Some(conn))),
            table: self.collection.clone().into(),
        })
    }
}

/// An open handle on one SQLite collection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
    table: Arc<str>,
}

impl SqliteStore {
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let table = Arc::clone(&self.table);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            let conn = guard.as_ref().ok_or(StorageError::Closed)?;
            f(conn, &table)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("blocking task failed: {e}")))?
    }
}

fn encode(order: &InternalWorkOrder) -> Result<String, StorageError> {
    serde_json::to_string(order).map_err(|e| StorageError::InvalidDocument {
        id: format!("number {}", order.number),
        message: e.to_string(),
    })
}

fn decode(id: String, body: &str) -> Result<StoredWorkOrder, StorageError> {
    match serde_json::from_str(body) {
        Ok(order) => Ok(StoredWorkOrder {
            id: DocumentId::from(id),
            order,
        }),
        Err(e) => Err(StorageError::InvalidDocument {
            id,
            message: e.to_string(),
        }),
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn ping(&self) -> Result<(), StorageError> {
        self.with_conn(|conn, _| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    async fn find_by_number(&self, number: i64) -> Result<Option<StoredWorkOrder>, StorageError> {
        self.with_conn(move |conn, table| {
            let row = conn
                .query_row(
                    &format!("SELECT id, body FROM {table} WHERE number = ?1"),
                    params![number],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;
            row.map(|(id, body)| decode(id, &body)).transpose()
        })
        .await
    }

    async fn find_unsynced(&self, limit: usize) -> Result<Vec<StoredWorkOrder>, StorageError> {
        // The cap applies to decodable documents. Undecodable rows stay
        // unsynced, so a SQL LIMIT would let them crowd out valid ones.
        self.with_conn(move |conn, table| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, body FROM {table} WHERE is_synced = 0 ORDER BY rowid"
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut docs = Vec::new();
            for row in rows {
                if limit != 0 && docs.len() >= limit {
                    break;
                }
                let (id, body) = row?;
                match decode(id, &body) {
                    Ok(doc) => docs.push(doc),
                    Err(e) => warn!(error = %e, "skipping undecodable work order document"),
                }
            }
            Ok(docs)
        })
        .await
    }

    async fn insert(&self, order: &InternalWorkOrder) -> Result<DocumentId, StorageError> {
        let body = encode(order)?;
        let number = order.number;
        let is_synced = order.is_synced;
        self.with_conn(move |conn, table| {
            let id = DocumentId::generate();
            let result = conn.execute(
                &format!("INSERT INTO {table} (id, number, is_synced, body) VALUES (?1, ?2, ?3, ?4)"),
                params![id.as_str(), number, is_synced, body],
            );
            match result {
                Ok(_) => Ok(id),
                Err(e) if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                    Err(StorageError::DuplicateNumber { number })
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn replace(&self, order: &InternalWorkOrder) -> Result<u64, StorageError> {
        let body = encode(order)?;
        let number = order.number;
        let is_synced = order.is_synced;
        self.with_conn(move |conn, table| {
            let rows = conn.execute(
                &format!("UPDATE {table} SET is_synced = ?1, body = ?2 WHERE number = ?3"),
                params![is_synced, body, number],
            )?;
            Ok(rows as u64)
        })
        .await
    }

    async fn set_synced(&self, id: &DocumentId, at: OffsetDateTime) -> Result<u64, StorageError> {
        let id = id.clone();
        let synced_at = timestamp::format(at);
        self.with_conn(move |conn, table| {
            let rows = conn.execute(
                &format!(
                    "UPDATE {table}
                     SET is_synced = 1,
                         body = json_set(body, '$.isSynced', json('true'), '$.syncedAt', ?2)
                     WHERE id = ?1"
                ),
                params![id.as_str(), synced_at],
            )?;
            Ok(rows as u64)
        })
        .await
    }

    async fn close(&self) -> Result<(), StorageError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let taken = conn.lock().unwrap_or_else(PoisonError::into_inner).take();
            match taken {
                Some(conn) => conn.close().map_err(|(_, e)| StorageError::from(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| StorageError::Backend(format!("blocking task failed: {e}")))?
    }
}

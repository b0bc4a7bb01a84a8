//! SQLite store adapter: the preferred, host-wide durable backing.
//!
//! A single `kv` table keyed by string, shared by every process pointed at
//! the same database file. Cloned handles share one connection and one
//! listener registry.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;

use super::{Listener, StateStore};

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl SqliteStore {
    /// Open the database at `path`, creating the schema if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let conn = Connection::open(&path).map_err(|err| StoreError::OpenFailed {
            path: path.clone(),
            message: err.to_string(),
        })?;
        Self::from_connection(conn, &path)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|err| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            message: err.to_string(),
        })?;
        Self::from_connection(conn, &PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, path: &PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|err| StoreError::OpenFailed {
            path: path.clone(),
            message: err.to_string(),
        })?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            listeners: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn notify(&self, key: &str, value: &str) {
        let listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(key, value);
        }
    }
}

impl StateStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get::<_, String>(0)
        })
        .optional()
        .map_err(|err| StoreError::ReadFailed {
            key: key.to_string(),
            message: err.to_string(),
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        {
            let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|err| StoreError::WriteFailed {
                key: key.to_string(),
                message: err.to_string(),
            })?;
        }
        self.notify(key, value);
        Ok(())
    }

    fn subscribe(&self, listener: Listener) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_upsert() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(store.get("timer.state").unwrap(), None);
        store.set("timer.state", "one").unwrap();
        store.set("timer.state", "two").unwrap();
        assert_eq!(store.get("timer.state").unwrap(), Some("two".to_string()));
    }

    #[test]
    fn listener_fires_across_handles() {
        let store = SqliteStore::open_memory().unwrap();
        let other = store.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        other.subscribe(Arc::new(move |key, _value| {
            sink.lock().unwrap().push(key.to_string());
        }));
        store.set("timer.state", "{}").unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), &["timer.state".to_string()]);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("k", "v").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
    }
}

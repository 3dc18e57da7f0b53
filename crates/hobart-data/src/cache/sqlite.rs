//! SQLite-backed object store for the remote tier.
//!
//! Objects live in a single table, `objects(key, payload, published_at)`. Distribution
//! files are produced with [`SqliteBackend::publish`] and opened read-only by consumers.

use super::RemoteBackend;
use super::codec::encode_panel;
use crate::error::{DataError, Result};
use crate::panel::Panel;
use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Object store in a SQLite database.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open an existing distribution file read-only.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open or create a writable database, used to publish objects.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let backend = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        backend.initialize_schema()?;
        Ok(backend)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let backend = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        backend.initialize_schema()?;
        Ok(backend)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn()?.execute(
            "CREATE TABLE IF NOT EXISTS objects (
                key TEXT PRIMARY KEY,
                payload BLOB NOT NULL,
                published_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DataError::Cache("sqlite connection lock poisoned".to_string()))
    }

    /// Write raw bytes under `object_key`, replacing any previous object.
    pub fn publish_bytes(&self, object_key: &str, payload: &[u8]) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO objects (key, payload, published_at) VALUES (?1, ?2, ?3)",
            params![object_key, payload, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Encode `panel` and publish it under `object_key`.
    pub fn publish(&self, object_key: &str, panel: &Panel) -> Result<()> {
        self.publish_bytes(object_key, &encode_panel(panel)?)
    }

    /// Every object key, sorted.
    pub fn object_keys(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM objects ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }
}

impl RemoteBackend for SqliteBackend {
    fn exists(&self, object_key: &str) -> Result<bool> {
        let found = self
            .conn()?
            .query_row(
                "SELECT 1 FROM objects WHERE key = ?1",
                params![object_key],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn fetch(&self, object_key: &str) -> Result<Option<Vec<u8>>> {
        let payload = self
            .conn()?
            .query_row(
                "SELECT payload FROM objects WHERE key = ?1",
                params![object_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload)
    }
}

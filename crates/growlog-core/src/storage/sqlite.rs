//! `SQLite`-backed buffer

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use super::{check_capacity, migrations, slot_size, LocalBuffer, DEFAULT_CAPACITY_BYTES};
use crate::error::{Error, Result};

/// Buffer stored in a local `SQLite` file, one row per slot
pub struct SqliteBuffer {
    conn: Mutex<Connection>,
    capacity: usize,
}

impl SqliteBuffer {
    /// Open (or create) the buffer database at `path`
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        if let Err(error) = conn.pragma_update(None, "journal_mode", "WAL") {
            tracing::debug!("WAL journal unavailable, keeping default mode: {}", error);
        }
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        tracing::debug!("Opened local buffer at {}", path.display());
        Self::from_connection(conn)
    }

    /// Open an in-memory buffer (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            capacity: DEFAULT_CAPACITY_BYTES,
        })
    }

    /// Override the capacity in bytes
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|error| Error::Storage(format!("sqlite buffer lock poisoned: {error}")))
    }

    fn write_slot(&self, tx: &Transaction<'_>, key: &str, value: &str) -> Result<()> {
        let others: i64 = tx.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
             FROM local_buffer WHERE key != ?",
            params![key],
            |row| row.get(0),
        )?;
        let others = usize::try_from(others).unwrap_or(usize::MAX);
        check_capacity(others.saturating_add(slot_size(key, value)), self.capacity)?;

        tx.execute(
            "INSERT INTO local_buffer (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }
}

impl LocalBuffer for SqliteBuffer {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM local_buffer WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        self.write_slot(&tx, key, value)?;
        tx.commit()?;
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Result<String>,
    ) -> Result<()> {
        let mut conn = self.lock()?;
        // Take the write lock up front so other connections wait instead of
        // writing between our read and write
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = tx
            .query_row(
                "SELECT value FROM local_buffer WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        let next = apply(current)?;
        self.write_slot(&tx, key, &next)?;
        tx.commit()?;
        Ok(())
    }
}

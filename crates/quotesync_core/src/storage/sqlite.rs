//! SQLite-backed durable key-value store.
//!
//! # Invariants
//! - Every write stamps `updated_at` from the injected clock.
//! - Construction fails when the `kv_entries` table is missing, so an
//!   unmigrated connection can never be used.

use super::{KeyValueStore, KvError, KvResult};
use crate::clock::Clock;
use crate::db::open_db;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

const KV_TABLE: &str = "kv_entries";

pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteKeyValueStore {
    /// Wraps an already migrated connection.
    pub fn try_new(conn: Connection, clock: Arc<dyn Clock>) -> KvResult<Self> {
        if !table_exists(&conn, KV_TABLE)? {
            return Err(KvError::MissingTable(KV_TABLE));
        }
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }

    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> KvResult<Self> {
        let conn = open_db(path)?;
        Self::try_new(conn, clock)
    }

    /// Last write time for `key` in epoch milliseconds.
    pub fn updated_at(&self, key: &str) -> KvResult<Option<i64>> {
        let conn = self.conn.lock().map_err(|_| KvError::Poisoned)?;
        let value = conn
            .query_row(
                "SELECT updated_at FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| KvError::Poisoned)?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let now = self.clock.now_ms();
        let conn = self.conn.lock().map_err(|_| KvError::Poisoned)?;
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        let conn = self.conn.lock().map_err(|_| KvError::Poisoned)?;
        conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

fn table_exists(conn: &Connection, table: &str) -> KvResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

//! SQLite-backed key-value store.
//!
//! # Responsibility
//! - Persist byte blobs in the `kv_entries` table.
//! - Keep SQL details inside the storage boundary.
//!
//! # Invariants
//! - `set` is a single upsert statement, so SQLite's statement atomicity
//!   guarantees whole-value replacement.
//! - The connection must have migrations applied (see `db::open_db`).

use super::{validate_key, KeyValueStore, KvError, KvResult};
use rusqlite::{params, Connection};

/// Key-value store over a migrated SQLite connection.
pub struct SqliteKeyValueStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKeyValueStore<'conn> {
    /// Constructs a store from a migrated/ready connection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   has not been migrated.
    pub fn try_new(conn: &'conn Connection) -> KvResult<Self> {
        ensure_kv_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKeyValueStore<'_> {
    fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        validate_key(key)?;
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv_entries WHERE key = ?1;")?;
        let mut rows = stmt.query([key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(row.get("value")?));
        }
        Ok(None)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> KvResult<()> {
        validate_key(key)?;
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> KvResult<()> {
        validate_key(key)?;
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

fn ensure_kv_connection_ready(conn: &Connection) -> KvResult<()> {
    if !table_exists(conn, "kv_entries")? {
        return Err(KvError::MissingRequiredTable("kv_entries"));
    }

    for column in ["key", "value", "updated_at"] {
        if !table_has_column(conn, "kv_entries", column)? {
            return Err(KvError::MissingRequiredColumn {
                table: "kv_entries",
                column,
            });
        }
    }

    Ok(())
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

fn table_has_column(conn: &Connection, table: &str, column: &str) -> KvResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

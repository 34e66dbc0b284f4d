//! Durable key/value storage.
//!
//! The composer keeps exactly two values: the in-progress draft and the
//! archived report list, each serialized as JSON under its own key.
//! `SqliteKeyValueStore` persists them in a local SQLite file;
//! `MemoryKeyValueStore` is the ephemeral equivalent for tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};

use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;

/// Get/set/remove of string values under string keys.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key has never been written or was removed.
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;

    /// Write a value (upsert).
    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError>;

    /// Delete a value. No-op when absent.
    fn remove(&self, key: &str) -> Result<(), DatabaseError>;
}

// ── SqliteKeyValueStore ───────────────────────────────────

/// SQLite-backed store over the `kv_store` table.
///
/// `rusqlite::Connection` is not `Sync`, so the connection sits behind a
/// mutex. Every operation is a single statement.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    /// Open (or create) the database file and run migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_database(path)?))
    }

    /// In-memory database with the full schema.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    /// Wrap an already-migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv_store WHERE key = ?1")?;
        match stmt.query_row([key], |row| row.get::<_, String>(0)) {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }
}

// ── MemoryKeyValueStore ───────────────────────────────────

/// Process-local store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, DatabaseError> {
        self.values.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DatabaseError> {
        self.values()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("draft").unwrap(), None);

        store.set("draft", "{\"a\":1}").unwrap();
        assert_eq!(store.get("draft").unwrap().as_deref(), Some("{\"a\":1}"));

        store.set("draft", "{\"a\":2}").unwrap();
        assert_eq!(store.get("draft").unwrap().as_deref(), Some("{\"a\":2}"));

        store.remove("draft").unwrap();
        assert_eq!(store.get("draft").unwrap(), None);

        // Removing an absent key is fine
        store.remove("draft").unwrap();
    }

    #[test]
    fn sqlite_store_get_set_remove() {
        let store = SqliteKeyValueStore::in_memory().unwrap();
        exercise(&store);
    }

    #[test]
    fn memory_store_get_set_remove() {
        let store = MemoryKeyValueStore::new();
        exercise(&store);
    }

    #[test]
    fn keys_are_independent() {
        let store = SqliteKeyValueStore::in_memory().unwrap();
        store.set("sjb-daily-draft", "draft").unwrap();
        store.set("sjb-reports", "[]").unwrap();
        store.remove("sjb-daily-draft").unwrap();
        assert_eq!(store.get("sjb-reports").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn sqlite_store_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("fieldreport.db");

        {
            let store = SqliteKeyValueStore::open(&path).unwrap();
            store.set("sjb-daily-draft", "persisted").unwrap();
        }

        let reopened = SqliteKeyValueStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("sjb-daily-draft").unwrap().as_deref(),
            Some("persisted")
        );
    }

    #[test]
    fn store_is_object_safe() {
        fn _assert_store(_: &dyn KeyValueStore) {}
    }
}

//! SQLite-backed durable state.
//!
//! One file holds three things a browser would otherwise provide:
//! - `kv`: the session record fields, JSON-encoded
//! - `dynamic_rules`: the installed blocking rules
//! - `alarms`: named wake-timers and when they are due

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{data_dir, Store};
use crate::error::{PolicyError, StorageError};
use crate::policy::{BlockRule, RuleEngine, WakeTimer};

/// SQLite database for the session record and platform state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/coding-mode/coding-mode.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(&data_dir()?.join("coding-mode.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS dynamic_rules (
                id   INTEGER PRIMARY KEY,
                rule TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alarms (
                name     TEXT PRIMARY KEY,
                fire_at  INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alarms_fire_at ON alarms(fire_at);",
        )?;
        Ok(())
    }

    /// Get a raw value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
    }

    /// Set a raw value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Alarms whose instant has passed, oldest first.
    pub fn due_alarms(&self, now_ms: i64) -> Result<Vec<(String, i64)>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, fire_at FROM alarms WHERE fire_at <= ?1 ORDER BY fire_at")?;
        let rows = stmt.query_map(params![now_ms], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut due = Vec::new();
        for row in rows {
            due.push(row?);
        }
        Ok(due)
    }
}

impl Store for Database {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        match self.kv_get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::CorruptValue {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                params![key, value.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl RuleEngine for Database {
    fn dynamic_rules(&self) -> Result<Vec<BlockRule>, PolicyError> {
        let mut stmt = self.conn.prepare("SELECT rule FROM dynamic_rules ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut rules = Vec::new();
        for row in rows {
            let raw = row?;
            let rule: BlockRule = serde_json::from_str(&raw).map_err(|e| StorageError::CorruptValue {
                key: "dynamic_rules".into(),
                message: e.to_string(),
            })?;
            rules.push(rule);
        }
        Ok(rules)
    }

    fn update_dynamic_rules(&self, remove_ids: &[u32], add: Vec<BlockRule>) -> Result<(), PolicyError> {
        let tx = self.conn.unchecked_transaction()?;
        for id in remove_ids {
            tx.execute("DELETE FROM dynamic_rules WHERE id = ?1", params![id])?;
        }
        for rule in &add {
            let json = serde_json::to_string(rule)
                .map_err(|e| PolicyError::RuleUpdateRejected(e.to_string()))?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO dynamic_rules (id, rule) VALUES (?1, ?2)",
                params![rule.id, json],
            )?;
            if inserted == 0 {
                // Dropping `tx` rolls the whole update back.
                return Err(PolicyError::RuleUpdateRejected(format!(
                    "rule id {} already exists",
                    rule.id
                )));
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl WakeTimer for Database {
    fn schedule_at(&self, name: &str, at_ms: i64) -> Result<(), PolicyError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO alarms (name, fire_at) VALUES (?1, ?2)",
            params![name, at_ms],
        )?;
        Ok(())
    }

    fn cancel(&self, name: &str) -> Result<(), PolicyError> {
        self.conn
            .execute("DELETE FROM alarms WHERE name = ?1", params![name])?;
        Ok(())
    }

    fn scheduled(&self, name: &str) -> Result<Option<i64>, PolicyError> {
        let at = self
            .conn
            .query_row(
                "SELECT fire_at FROM alarms WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(at)
    }
}

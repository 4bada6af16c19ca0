// Key/value blobs the client keeps between runs, the way a browser keeps localStorage
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::DbPool;

#[derive(Clone)]
pub struct LocalStore {
    pool: DbPool,
}

impl LocalStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn get(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.pool.get()?;
        let value = conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO local_storage (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    /// Returns true if an entry was removed.
    pub fn remove(&self, key: &str) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    pub fn remove_prefix(&self, prefix: &str) -> AppResult<usize> {
        let conn = self.pool.get()?;
        let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let rows = conn.execute(
            "DELETE FROM local_storage WHERE key LIKE ?1 ESCAPE '\\'",
            params![pattern],
        )?;
        Ok(rows)
    }

    pub fn contains(&self, key: &str) -> AppResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Load a JSON blob. A blob that no longer parses is dropped and
    /// reported as absent.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let Some(raw) = self.get(key)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("Discarding corrupt local storage entry {}: {}", key, e);
                self.remove(key)?;
                Ok(None)
            }
        }
    }

    pub fn save_json<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.set(key, &json)
    }
}

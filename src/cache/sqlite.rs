//! SQLite cache backend
//!
//! Payloads are stored as JSON text keyed by fingerprint, so a cache file
//! survives process restarts and can be reused by later runs.

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{CacheError, CacheResult, CacheStore};
use crate::request::CachedPayload;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed cache store
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Opens or creates the cache database at `path`
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        tracing::debug!("Opened response cache at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Database("cache connection lock poisoned".to_string()))
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &str) -> CacheResult<Option<CachedPayload>> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM responses WHERE fingerprint = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, payload: &CachedPayload) -> CacheResult<()> {
        let text = serde_json::to_string(payload)?;
        let now = Utc::now().to_rfc3339();
        self.conn()?.execute(
            "INSERT INTO responses (fingerprint, url, status_code, payload, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(fingerprint) DO UPDATE SET
                url = excluded.url,
                status_code = excluded.status_code,
                payload = excluded.payload,
                stored_at = excluded.stored_at",
            params![key, payload.url, payload.status_code, text, now],
        )?;
        Ok(())
    }

    fn len(&self) -> CacheResult<usize> {
        let count: i64 =
            self.conn()?
                .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

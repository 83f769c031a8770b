//! Cache backing store trait and error types

use crate::request::CachedPayload;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache task failed: {0}")]
    Task(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A key-value store for fetched payloads
///
/// Keys are fingerprint hex strings. Implementations are called from blocking
/// threads and must be safe to share between them.
pub trait CacheStore: Send + Sync {
    /// Looks up a payload
    fn get(&self, key: &str) -> CacheResult<Option<CachedPayload>>;

    /// Stores a payload, replacing any previous entry for `key`
    fn put(&self, key: &str, payload: &CachedPayload) -> CacheResult<()>;

    /// Number of stored entries
    fn len(&self) -> CacheResult<usize>;

    fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }
}

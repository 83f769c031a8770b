//! Response cache keyed by request fingerprint
//!
//! The engine talks to a [`Cache`] handle, which runs the backing
//! [`CacheStore`] on tokio's blocking pool and turns every store error into a
//! logged warning. A broken cache slows a run down; it never fails it.

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryCacheStore;
pub use sqlite::SqliteCacheStore;
pub use traits::{CacheError, CacheResult, CacheStore};

use crate::config::{CacheConfig, CacheKind};
use crate::request::{CachedPayload, Fingerprint};
use std::sync::Arc;

/// Opens the backing store described by the configuration
///
/// Returns `Ok(None)` when caching is disabled.
pub fn open_store(config: &CacheConfig) -> CacheResult<Option<Arc<dyn CacheStore>>> {
    if !config.enabled {
        return Ok(None);
    }

    let store: Arc<dyn CacheStore> = match config.kind {
        CacheKind::Sqlite => Arc::new(SqliteCacheStore::open(&config.path)?),
        CacheKind::Memory => Arc::new(MemoryCacheStore::new()),
    };
    Ok(Some(store))
}

/// Best-effort async handle over a cache store
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl Cache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Looks up the payload stored for `key`
    ///
    /// Store errors are logged and reported as a miss.
    pub async fn get(&self, key: &Fingerprint) -> Option<CachedPayload> {
        let store = self.store.clone();
        let lookup = key.as_str().to_string();

        match tokio::task::spawn_blocking(move || store.get(&lookup)).await {
            Ok(Ok(payload)) => payload,
            Ok(Err(e)) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                None
            }
            Err(e) => {
                tracing::warn!("Cache read task failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Writes `payload` through to the store
    ///
    /// Store errors are logged and otherwise ignored.
    pub async fn put(&self, key: &Fingerprint, payload: CachedPayload) {
        let store = self.store.clone();
        let target = key.as_str().to_string();

        match tokio::task::spawn_blocking(move || store.put(&target, &payload)).await {
            Ok(Ok(())) => tracing::trace!("Cached payload for {}", key),
            Ok(Err(e)) => tracing::warn!("Cache write failed for {}: {}", key, e),
            Err(e) => tracing::warn!("Cache write task failed for {}: {}", key, e),
        }
    }
}

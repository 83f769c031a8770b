use crate::cache::traits::{CacheResult, CacheStore};
use crate::request::CachedPayload;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Process-local cache store
///
/// Clones share the same map, so one store can be handed to several engines
/// to carry cached payloads from one run to the next.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<Mutex<HashMap<String, CachedPayload>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> CacheResult<Option<CachedPayload>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, payload: &CachedPayload) -> CacheResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), payload.clone());
        Ok(())
    }

    fn len(&self) -> CacheResult<usize> {
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).len())
    }
}

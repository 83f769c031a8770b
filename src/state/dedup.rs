use crate::request::Fingerprint;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Set of fingerprints already claimed in one run
///
/// Workers use [`Deduplicator::check_and_mark`], which tests and records a
/// fingerprint under one lock so two workers can never both claim it.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: Mutex<HashSet<Fingerprint>>,
    discarded: AtomicU64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, key: &Fingerprint) -> bool {
        self.lock().contains(key)
    }

    pub fn mark(&self, key: Fingerprint) {
        self.lock().insert(key);
    }

    /// Claims `key`; returns `false` if it was already claimed
    ///
    /// A rejected claim counts as one discarded duplicate.
    pub fn check_and_mark(&self, key: &Fingerprint) -> bool {
        let inserted = self.lock().insert(key.clone());
        if !inserted {
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
        inserted
    }

    /// Number of duplicates rejected by `check_and_mark`
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Fingerprint>> {
        // A poisoned set is still a valid set
        self.seen.lock().unwrap_or_else(|e| e.into_inner())
    }
}

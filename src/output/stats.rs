//! Run statistics
//!
//! Counters are updated by workers while a run is live and can be read at any
//! time through [`RunStats::snapshot`].

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one run
#[derive(Debug, Default)]
pub struct RunStats {
    enqueued: AtomicU64,
    fetched: AtomicU64,
    cache_hits: AtomicU64,
    duplicates: AtomicU64,
    retries: AtomicU64,
    records: AtomicU64,
    failures: AtomicU64,
    drained: AtomicU64,
}

macro_rules! counter {
    ($inc:ident, $add:ident, $field:ident) => {
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        pub fn $add(&self, n: u64) {
            self.$field.fetch_add(n, Ordering::Relaxed);
        }
    };
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(inc_enqueued, add_enqueued, enqueued);
    counter!(inc_fetched, add_fetched, fetched);
    counter!(inc_cache_hits, add_cache_hits, cache_hits);
    counter!(inc_duplicates, add_duplicates, duplicates);
    counter!(inc_retries, add_retries, retries);
    counter!(inc_records, add_records, records);
    counter!(inc_failures, add_failures, failures);
    counter!(inc_drained, add_drained, drained);

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RunStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Requests accepted into the work queue, seeds included
    pub enqueued: u64,

    /// Payloads obtained from a transport
    pub fetched: u64,

    /// Payloads served from the cache
    pub cache_hits: u64,

    /// Requests skipped because their fingerprint was already seen
    pub duplicates: u64,

    /// Extra transport attempts made after transient failures
    pub retries: u64,

    /// Records delivered to the result stream
    pub records: u64,

    /// Entries written to the failure log
    pub failures: u64,

    /// Requests dropped without processing after cancellation
    pub drained: u64,
}

impl StatsSnapshot {
    /// Share of processed requests that produced a payload
    pub fn success_rate(&self) -> f64 {
        let processed = self.fetched + self.cache_hits + self.failures;
        if processed == 0 {
            0.0
        } else {
            (self.fetched + self.cache_hits) as f64 / processed as f64 * 100.0
        }
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StatsSnapshot) {
    println!("=== Harvest Statistics ===\n");

    println!("Requests:");
    println!("  Enqueued: {}", stats.enqueued);
    println!("  Fetched: {}", stats.fetched);
    println!("  Served from cache: {}", stats.cache_hits);
    println!("  Duplicates discarded: {}", stats.duplicates);
    println!("  Retries: {}", stats.retries);
    if stats.drained > 0 {
        println!("  Drained on cancel: {}", stats.drained);
    }
    println!();

    println!("Results:");
    println!("  Records: {}", stats.records);
    println!("  Failures: {}", stats.failures);
    println!();

    println!("Success Rate: {:.1}%", stats.success_rate());
}

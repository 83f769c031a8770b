//! Engine coordinator - run orchestration
//!
//! This module wires one run together:
//! - Seeding the work queue
//! - Spawning the worker pool and the driver task
//! - Processing each item through dedup, cache, throttle, retry and transport
//! - Routing extraction outputs to the work queue or the result channel
//! - Handling cancellation

use crate::cache::{self, Cache, CacheStore};
use crate::config::{validate, Config};
use crate::engine::bridge::{BlockingHarvest, Harvest};
use crate::engine::limiter::Throttle;
use crate::engine::retry::RetryPolicy;
use crate::engine::scheduler::WorkQueue;
use crate::engine::{FailedFetch, FetchResult};
use crate::extract::{ExtractError, Output};
use crate::output::stats::RunStats;
use crate::request::{FetchRequest, FetchResponse};
use crate::state::{Deduplicator, Failure, FailureLog, FailurePhase, ItemState, WorkItem};
use crate::transport::TransportError;
use crate::{HarvestError, Record, Result};
use futures::future::join_all;
use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Recursive fetch-and-extract engine
///
/// An engine holds validated configuration and the cache backing store. Each
/// call to [`Engine::run`] or [`Engine::run_blocking`] starts an independent
/// run with its own queue, dedup set, failure log and statistics; only the
/// cache store is shared between runs.
pub struct Engine {
    config: Arc<Config>,
    cache_store: Option<Arc<dyn CacheStore>>,
    runs: AtomicU64,
}

impl Engine {
    /// Creates an engine, failing fast on invalid configuration
    ///
    /// Opens the cache store when caching is enabled.
    pub fn new(config: Config) -> Result<Self> {
        validate(&config)?;
        let cache_store = cache::open_store(&config.cache)?;

        Ok(Self {
            config: Arc::new(config),
            cache_store,
            runs: AtomicU64::new(0),
        })
    }

    /// Uses `store` as the cache backing store, enabling caching
    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Starts a run on the current tokio runtime
    ///
    /// Returns immediately; records arrive through the returned [`Harvest`]
    /// stream, which ends once no work remains or the run is cancelled.
    pub async fn run(&self, seeds: Vec<FetchRequest>) -> Harvest {
        let run_id = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        let span = tracing::info_span!("harvest", run = run_id);

        let (records, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let failures = FailureLog::new();
        let stats = Arc::new(RunStats::new());
        let concurrency = self.config.engine.concurrency;

        let ctx = Arc::new(RunContext {
            queue: WorkQueue::new(),
            dedup: self
                .config
                .engine
                .deduplication
                .then(Deduplicator::new),
            cache: self.cache_store.clone().map(Cache::new),
            throttle: Throttle::from_config(&self.config),
            retry: RetryPolicy::from_config(&self.config.retry),
            failures: failures.clone(),
            stats: stats.clone(),
            records,
            cancel: cancel.clone(),
        });

        span.in_scope(|| {
            tracing::info!(
                "Starting harvest with {} seed(s) and {} worker(s)",
                seeds.len(),
                concurrency
            );
        });

        for seed in seeds {
            ctx.enqueue(seed);
        }

        let workers: Vec<_> = (0..concurrency)
            .map(|id| tokio::spawn(worker(id, ctx.clone()).instrument(span.clone())))
            .collect();

        tokio::spawn(drive(ctx, workers).instrument(span));

        Harvest::new(receiver, failures, stats, cancel)
    }

    /// Starts a run on a private current-thread runtime
    ///
    /// The returned iterator drives the runtime while waiting for each record.
    /// Must not be called from within an async context.
    pub fn run_blocking(&self, seeds: Vec<FetchRequest>) -> Result<BlockingHarvest> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(HarvestError::Runtime)?;

        let harvest = runtime.block_on(self.run(seeds));
        Ok(BlockingHarvest::new(harvest, runtime))
    }
}

/// State scoped to a single run
struct RunContext {
    queue: WorkQueue,
    dedup: Option<Deduplicator>,
    cache: Option<Cache>,
    throttle: Throttle,
    retry: RetryPolicy,
    failures: FailureLog,
    stats: Arc<RunStats>,
    records: mpsc::UnboundedSender<Record>,
    cancel: CancellationToken,
}

impl RunContext {
    fn enqueue(&self, request: FetchRequest) {
        if self.queue.push(WorkItem::new(request)) {
            self.stats.inc_enqueued();
        } else {
            tracing::debug!("Work queue closed, dropping discovered request");
            self.stats.inc_drained();
        }
    }

    fn emit(&self, record: Record) {
        self.stats.inc_records();
        // the caller may have dropped the stream; the run still completes
        let _ = self.records.send(record);
    }

    fn fail(&self, item: &WorkItem, error: String, attempts: u32, phase: FailurePhase) {
        self.stats.inc_failures();
        self.failures.record(Failure {
            request: item.request.clone(),
            fingerprint: item.fingerprint.clone(),
            error,
            attempts,
            phase,
        });
    }

    /// Processes one item through dedup, fetch and extraction
    async fn process(&self, mut item: WorkItem) {
        if let Some(dedup) = &self.dedup {
            if !dedup.check_and_mark(&item.fingerprint) {
                tracing::debug!("Skipping duplicate request {}", item.request);
                self.stats.inc_duplicates();
                item.advance(ItemState::Discarded);
                return;
            }
        }

        let response = match self.fetch(&mut item).await {
            FetchResult::Success(response) => response,
            FetchResult::Failure(failed) => {
                item.advance(ItemState::Failed);
                self.fail(
                    &item,
                    failed.error.to_string(),
                    failed.attempts,
                    FailurePhase::Fetch,
                );
                return;
            }
        };

        item.advance(ItemState::Extracting);
        self.extract(&item, response).await;
        item.advance(ItemState::Completed);
    }

    /// Obtains the payload for an item from the cache or the transport
    async fn fetch(&self, item: &mut WorkItem) -> FetchResult {
        if let Some(cache) = &self.cache {
            if let Some(payload) = cache.get(&item.fingerprint).await {
                tracing::debug!("Cache hit for {}", item.request);
                self.stats.inc_cache_hits();
                item.advance(ItemState::Fetched);
                return FetchResult::Success(FetchResponse::from_payload(
                    item.request.clone(),
                    payload,
                ));
            }
        }

        item.advance(ItemState::Fetching);

        let request = &item.request;
        let target = request.to_string();
        let throttle = &self.throttle;
        let outcome = self
            .retry
            .execute(&target, move |attempt| async move {
                throttle.acquire().await;
                tracing::trace!("Fetching {} (attempt {})", request, attempt);
                AssertUnwindSafe(request.transport().fetch(request))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(TransportError::Other(format!(
                            "transport '{}' panicked: {}",
                            request.transport().name(),
                            panic_message(panic.as_ref())
                        )))
                    })
            })
            .await;

        item.attempts = outcome.attempts;
        self.stats
            .add_retries(u64::from(outcome.attempts.saturating_sub(1)));

        match outcome.result {
            Ok(response) => {
                self.stats.inc_fetched();
                item.advance(ItemState::Fetched);
                if let Some(cache) = &self.cache {
                    cache.put(&item.fingerprint, response.to_payload()).await;
                }
                FetchResult::Success(response)
            }
            Err(error) => FetchResult::Failure(FailedFetch {
                request: item.request.clone(),
                error,
                attempts: outcome.attempts,
            }),
        }
    }

    /// Drains the extraction stream, routing every output as it arrives
    async fn extract(&self, item: &WorkItem, response: FetchResponse) {
        let extractor = item.request.extractor().clone();

        let stream =
            std::panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(response)));
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(panic) => {
                let error = extractor_panic(extractor.name(), panic.as_ref());
                self.fail(item, error.to_string(), item.attempts, FailurePhase::Extraction);
                return;
            }
        };

        loop {
            match AssertUnwindSafe(stream.next()).catch_unwind().await {
                Ok(Some(Ok(Output::Record(record)))) => self.emit(record),
                Ok(Some(Ok(Output::Request(request)))) => self.enqueue(request),
                Ok(Some(Err(e))) => {
                    self.fail(item, e.to_string(), item.attempts, FailurePhase::Extraction);
                }
                Ok(None) => break,
                Err(panic) => {
                    let error = extractor_panic(extractor.name(), panic.as_ref());
                    self.fail(item, error.to_string(), item.attempts, FailurePhase::Extraction);
                    break;
                }
            }
        }
    }
}

/// Pops and processes items until the queue closes
async fn worker(id: usize, ctx: Arc<RunContext>) {
    tracing::trace!("Worker {} started", id);

    while let Some(item) = ctx.queue.pop().await {
        let request = item.request.to_string();
        if AssertUnwindSafe(ctx.process(item))
            .catch_unwind()
            .await
            .is_err()
        {
            tracing::error!("Worker {} panicked while processing {}", id, request);
        }
        ctx.queue.complete();
    }

    tracing::trace!("Worker {} finished", id);
}

/// Waits for the workers, draining the queue if the run is cancelled
///
/// The result channel closes when this task drops the last context handle.
async fn drive(ctx: Arc<RunContext>, workers: Vec<tokio::task::JoinHandle<()>>) {
    let started = std::time::Instant::now();
    let all_workers = join_all(workers);
    tokio::pin!(all_workers);

    tokio::select! {
        _ = &mut all_workers => {}
        _ = ctx.cancel.cancelled() => {
            let drained = ctx.queue.close();
            ctx.stats.add_drained(drained.len() as u64);
            tracing::info!(
                "Harvest cancelled, dropped {} pending request(s)",
                drained.len()
            );
            all_workers.await;
        }
    }

    let stats = ctx.stats.snapshot();
    tracing::info!(
        "Harvest finished in {:?}: {} fetched, {} from cache, {} duplicate(s), {} record(s), {} failure(s)",
        started.elapsed(),
        stats.fetched,
        stats.cache_hits,
        stats.duplicates,
        stats.records,
        stats.failures
    );
}

fn extractor_panic(name: &str, panic: &(dyn Any + Send)) -> ExtractError {
    ExtractError::Panicked(format!("extractor '{}': {}", name, panic_message(panic)))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

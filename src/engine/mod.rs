//! Engine module - the concurrent scheduling core
//!
//! This module contains the run machinery, including:
//! - The work queue with quiescence detection
//! - Fetch pacing (delay policy and token bucket)
//! - Retry with exponential backoff
//! - The worker pool and per-item processing
//! - The async and blocking result bridges

mod bridge;
mod coordinator;
pub mod limiter;
pub mod retry;
mod scheduler;

pub use bridge::{BlockingHarvest, Harvest};
pub use coordinator::Engine;
pub use limiter::{DelayPolicy, Throttle, TokenBucket};
pub use retry::{RetryOutcome, RetryPolicy};
pub use scheduler::WorkQueue;

use crate::request::{FetchRequest, FetchResponse};
use crate::transport::TransportError;

/// Result of obtaining the payload for one request
#[derive(Debug)]
pub enum FetchResult {
    Success(FetchResponse),
    Failure(FailedFetch),
}

/// A fetch that failed permanently or ran out of attempts
#[derive(Debug)]
pub struct FailedFetch {
    pub request: FetchRequest,
    pub error: TransportError,
    pub attempts: u32,
}

//! Retry policy for fetch attempts
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Timeout | Retry with backoff |
//! | Network error | Retry with backoff |
//! | Status in `retryable-statuses` | Retry with backoff |
//! | Any 5xx (when `retry-server-errors`) | Retry with backoff |
//! | Anything else | Fail immediately |
//!
//! The wait before attempt `n + 1` is
//! `clamp(multiplier * 2^(n-1), min, max)`.

use crate::config::RetryConfig;
use crate::transport::TransportError;
use std::future::Future;
use std::time::Duration;

/// Outcome of a retried operation
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, TransportError>,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

/// Decides whether and when a failed fetch is attempted again
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_min: Duration,
    backoff_max: Duration,
    multiplier: Duration,
    retryable_statuses: Vec<u16>,
    retry_server_errors: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_min: Duration::from_millis(config.backoff_min_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
            multiplier: Duration::from_millis(config.backoff_multiplier_ms),
            retryable_statuses: config.retryable_statuses.clone(),
            retry_server_errors: config.retry_server_errors,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if `error` is worth another attempt
    pub fn is_transient(&self, error: &TransportError) -> bool {
        match error {
            TransportError::Timeout { .. } | TransportError::Network { .. } => true,
            TransportError::Status { status, .. } => {
                self.retryable_statuses.contains(status)
                    || (self.retry_server_errors && (500..=599).contains(status))
            }
            TransportError::Other(_) => false,
        }
    }

    /// Wait before the attempt following attempt number `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let raw = self.multiplier.saturating_mul(1u32 << exponent);
        raw.max(self.backoff_min).min(self.backoff_max)
    }

    /// Runs `op` until it succeeds, fails permanently or runs out of attempts
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, target: &str, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(e) if attempt < self.max_attempts && self.is_transient(&e) => {
                    let wait = self.backoff(attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        target,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    return RetryOutcome {
                        result: Err(e),
                        attempts: attempt,
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

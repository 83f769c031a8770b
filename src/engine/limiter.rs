//! Fetch pacing
//!
//! A [`Throttle`] combines two optional gates, both checked before every fetch
//! attempt:
//! - a delay policy spacing consecutive fetch starts by a fixed or random gap
//! - a token bucket allowing at most `max_rate` starts per `period`
//!
//! Both work by reserving a start slot under a short-lived lock and then
//! sleeping outside it, so waiting workers never block each other.

use crate::config::{Config, DelayConfig, DelayKind, RateLimitConfig};
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Gap inserted between consecutive fetch starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    Fixed(Duration),
    /// Uniformly random gap in `0..=max`
    Random(Duration),
}

impl DelayPolicy {
    pub fn from_config(config: &DelayConfig) -> Self {
        match config.kind {
            DelayKind::Fixed => Self::Fixed(config.amount()),
            DelayKind::Random => Self::Random(config.amount()),
        }
    }

    fn next_gap(&self) -> Duration {
        match self {
            Self::Fixed(gap) => *gap,
            Self::Random(max) => {
                let millis = rand::thread_rng().gen_range(0..=max.as_millis() as u64);
                Duration::from_millis(millis)
            }
        }
    }
}

struct Spacing {
    policy: DelayPolicy,
    next_start: Mutex<Option<Instant>>,
}

impl Spacing {
    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next_start = self.next_start.lock().unwrap_or_else(|e| e.into_inner());
        let slot = next_start.map_or(now, |next| next.max(now));
        *next_start = Some(slot + self.policy.next_gap());
        slot
    }
}

/// Token bucket holding up to `max_rate` tokens, refilled one every
/// `period / max_rate`
///
/// The bucket starts empty: the first token is released one refill interval
/// after creation. Slots are handed out with a theoretical-arrival-time
/// reservation, so concurrent callers are served in arrival order.
pub struct TokenBucket {
    interval: Duration,
    burst: Duration,
    next_token: Mutex<Instant>,
}

impl TokenBucket {
    pub fn new(max_rate: u32, period: Duration) -> Self {
        let max_rate = max_rate.max(1);
        let interval = period / max_rate;
        let burst = interval * (max_rate - 1);
        Self {
            interval,
            burst,
            // theoretical arrival time of the next token, offset by the burst window
            next_token: Mutex::new(Instant::now() + interval + burst),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_rate, config.period())
    }

    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut tat = self.next_token.lock().unwrap_or_else(|e| e.into_inner());
        let earliest = tat.checked_sub(self.burst).unwrap_or(now);
        let slot = earliest.max(now);
        *tat = (*tat).max(slot) + self.interval;
        slot
    }

    /// Waits until a token is available and takes it
    pub async fn acquire(&self) {
        tokio::time::sleep_until(self.reserve()).await;
    }
}

/// Gate every worker passes before starting a fetch attempt
#[derive(Default)]
pub struct Throttle {
    spacing: Option<Spacing>,
    bucket: Option<TokenBucket>,
}

impl Throttle {
    /// A throttle that never waits
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn new(delay: Option<DelayPolicy>, bucket: Option<TokenBucket>) -> Self {
        Self {
            spacing: delay.map(|policy| Spacing {
                policy,
                next_start: Mutex::new(None),
            }),
            bucket,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.delay.as_ref().map(DelayPolicy::from_config),
            config.rate_limit.as_ref().map(TokenBucket::from_config),
        )
    }

    pub fn is_unlimited(&self) -> bool {
        self.spacing.is_none() && self.bucket.is_none()
    }

    /// Suspends the caller until it may start a fetch
    pub async fn acquire(&self) {
        if let Some(bucket) = &self.bucket {
            bucket.acquire().await;
        }
        if let Some(spacing) = &self.spacing {
            tokio::time::sleep_until(spacing.reserve()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_never_waits() {
        let throttle = Throttle::unlimited();
        let start = Instant::now();
        for _ in 0..100 {
            throttle.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_spaces_starts() {
        let throttle = Throttle::new(Some(DelayPolicy::Fixed(Duration::from_millis(100))), None);
        let start = Instant::now();

        for _ in 0..4 {
            throttle.acquire().await;
        }

        // first start is immediate, the next three wait one gap each
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(310));
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_delay_is_bounded() {
        let throttle = Throttle::new(Some(DelayPolicy::Random(Duration::from_millis(50))), None);
        let start = Instant::now();

        for _ in 0..5 {
            throttle.acquire().await;
        }

        assert!(start.elapsed() <= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_starts_empty() {
        let bucket = TokenBucket::new(2, Duration::from_millis(100));
        let start = Instant::now();

        for _ in 0..10 {
            bucket.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_allows_burst_after_idle() {
        let bucket = TokenBucket::new(4, Duration::from_millis(400));
        tokio::time::sleep(Duration::from_secs(2)).await;

        let start = Instant::now();
        for _ in 0..4 {
            bucket.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(1));

        bucket.acquire().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(110));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_bucket() {
        let throttle = std::sync::Arc::new(Throttle::new(
            None,
            Some(TokenBucket::new(1, Duration::from_millis(10))),
        ));
        let start = Instant::now();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let throttle = throttle.clone();
                tokio::spawn(async move { throttle.acquire().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        assert!(Throttle::from_config(&config).is_unlimited());

        config.rate_limit = Some(RateLimitConfig {
            max_rate: 2,
            period_ms: 100,
        });
        assert!(!Throttle::from_config(&config).is_unlimited());
    }
}

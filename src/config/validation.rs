use crate::config::types::{
    CacheConfig, CacheKind, Config, DelayConfig, DelayKind, EngineConfig, HttpConfig,
    RateLimitConfig, RetryConfig, SeedEntry,
};
use crate::transport::ProxyConfig;
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool size
pub const MAX_CONCURRENCY: usize = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_engine_config(&config.engine)?;
    if let Some(delay) = &config.delay {
        validate_delay_config(delay)?;
    }
    if let Some(rate_limit) = &config.rate_limit {
        validate_rate_limit_config(rate_limit)?;
    }
    validate_retry_config(&config.retry)?;
    validate_cache_config(&config.cache)?;
    validate_http_config(&config.http)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

/// Validates worker pool configuration
fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }
    Ok(())
}

/// Validates the delay policy
fn validate_delay_config(config: &DelayConfig) -> Result<(), ConfigError> {
    if config.kind == DelayKind::Random && config.amount_ms == 0 {
        return Err(ConfigError::Validation(
            "random delay requires amount-ms > 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates the token bucket settings
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.max_rate < 1 {
        return Err(ConfigError::Validation(format!(
            "rate-limit max-rate must be >= 1, got {}",
            config.max_rate
        )));
    }

    if config.period_ms < 1 {
        return Err(ConfigError::Validation(
            "rate-limit period-ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_min_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "retry backoff-min-ms ({}) must not exceed backoff-max-ms ({})",
            config.backoff_min_ms, config.backoff_max_ms
        )));
    }

    for status in &config.retryable_statuses {
        if !(100..=599).contains(status) {
            return Err(ConfigError::Validation(format!(
                "retryable status {} is not a valid HTTP status code",
                status
            )));
        }
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.enabled && config.kind == CacheKind::Sqlite && config.path.as_os_str().is_empty()
    {
        return Err(ConfigError::Validation(
            "cache path cannot be empty when the sqlite cache is enabled".to_string(),
        ));
    }
    Ok(())
}

/// Validates HTTP transport settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        ProxyConfig::from_url(proxy)?;
    }

    Ok(())
}

/// Validates seed entries
fn validate_seeds(seeds: &[SeedEntry]) -> Result<(), ConfigError> {
    for seed in seeds {
        let url = Url::parse(&seed.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed.url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed.url
            )));
        }
    }
    Ok(())
}

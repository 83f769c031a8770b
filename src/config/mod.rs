//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All options have defaults, so an empty file (or `Config::default()`) is valid.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvest will use {} workers", config.engine.concurrency);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    CacheConfig, CacheKind, Config, DelayConfig, DelayKind, EngineConfig, HarvestConfig,
    HttpConfig, RateLimitConfig, RetryConfig, SeedEntry, DEFAULT_CONCURRENCY,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, MAX_CONCURRENCY};

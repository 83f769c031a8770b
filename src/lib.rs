//! Sumi-Harvest: a recursive, asynchronous data-gathering engine
//!
//! This crate takes a set of seed fetch requests, retrieves each resource through
//! a pluggable transport, runs caller-supplied extraction logic against the result
//! and follows every newly produced request until no work remains. Extracted
//! records are handed back as a flat stream, either asynchronously or through a
//! blocking iterator.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sumi_harvest::extract::{FnExtractor, Output};
//! use sumi_harvest::transport::HttpTransport;
//! use sumi_harvest::{Config, Engine, FetchRequest};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::new()?);
//! let titles = Arc::new(FnExtractor::new("titles", |response| {
//!     let title = response.title();
//!     Ok(vec![Output::record(serde_json::json!({ "title": title }))])
//! }));
//!
//! let seed = FetchRequest::get("https://example.com/", titles, transport)?;
//! let engine = Engine::new(Config::default())?;
//! for record in engine.run_blocking(vec![seed])? {
//!     println!("{}", record);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod extract;
pub mod output;
pub mod request;
pub mod state;
pub mod transport;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
///
/// Only configuration and startup problems surface through this type. Failures
/// inside a run become [`state::Failure`] entries instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to start runtime: {0}")]
    Runtime(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while building a fetch request
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Invalid request: {0}")]
    Invalid(String),
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for request construction
pub type RequestResult<T> = std::result::Result<T, RequestError>;

/// A single extracted record
///
/// Records are arbitrary structured data; the engine never inspects them.
pub type Record = serde_json::Value;

// Re-export commonly used types
pub use config::Config;
pub use engine::{BlockingHarvest, Engine, FetchResult, Harvest};
pub use extract::{Extractor, Output};
pub use request::{fingerprint, Fingerprint, FetchRequest, FetchResponse, Method};
pub use state::{Failure, FailurePhase};
pub use transport::{Transport, TransportError};

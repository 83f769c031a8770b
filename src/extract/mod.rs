//! Extraction steps
//!
//! An [`Extractor`] receives a fetched payload and yields a lazy stream of
//! [`Output`] items: records for the caller and new requests for the engine.
//! Items are routed in the order the stream produces them.
//!
//! # Components
//!
//! - `Extractor`, `Output`, `ExtractionStream`: the extraction contract
//! - `FnExtractor`: adapts a closure returning a `Vec` of outputs
//! - `html`: title, link and selector helpers over scraper documents
//! - `PageHarvester`: the built-in page-per-record extractor used by the CLI

mod harvester;
pub mod html;

pub use harvester::PageHarvester;

use crate::request::{FetchRequest, FetchResponse};
use crate::{Record, RequestError};
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use thiserror::Error;

/// Errors raised by an extraction step
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Response from {0} is not HTML")]
    NotHtml(String),

    #[error("Invalid CSS selector: {0}")]
    Selector(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid follow-up request: {0}")]
    Request(#[from] RequestError),

    #[error("Extraction panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

/// One item produced by an extraction step
pub enum Output {
    /// Extracted data delivered to the caller
    Record(Record),
    /// A further request to schedule
    Request(FetchRequest),
}

impl Output {
    pub fn record(value: impl Into<Record>) -> Self {
        Self::Record(value.into())
    }

    pub fn request(request: FetchRequest) -> Self {
        Self::Request(request)
    }
}

impl From<FetchRequest> for Output {
    fn from(request: FetchRequest) -> Self {
        Self::Request(request)
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(record) => f.debug_tuple("Record").field(record).finish(),
            Self::Request(request) => f.debug_tuple("Request").field(&request.to_string()).finish(),
        }
    }
}

/// Lazy sequence of extraction outputs
pub type ExtractionStream = BoxStream<'static, Result<Output, ExtractError>>;

/// Capability that turns a fetched payload into outputs
///
/// `extract` itself should return quickly; heavy work belongs inside the
/// returned stream. An `Err` item marks the request as failed but the stream
/// keeps being drained, so outputs produced before and after it are kept.
pub trait Extractor: Send + Sync {
    /// Short name used in logs and debug output
    fn name(&self) -> &str;

    fn extract(&self, response: FetchResponse) -> ExtractionStream;
}

/// Extractor built from a closure
///
/// # Example
///
/// ```
/// use sumi_harvest::extract::{FnExtractor, Output};
///
/// let extractor = FnExtractor::new("status", |response| {
///     Ok(vec![Output::record(serde_json::json!({ "status": response.status_code }))])
/// });
/// ```
pub struct FnExtractor<F> {
    name: String,
    func: F,
}

impl<F> FnExtractor<F>
where
    F: Fn(&FetchResponse) -> Result<Vec<Output>, ExtractError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Extractor for FnExtractor<F>
where
    F: Fn(&FetchResponse) -> Result<Vec<Output>, ExtractError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, response: FetchResponse) -> ExtractionStream {
        match (self.func)(&response) {
            Ok(outputs) => stream::iter(outputs.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }
}

//! Fetch transports
//!
//! A [`Transport`] turns a [`FetchRequest`] into a [`FetchResponse`]. The
//! engine never assumes HTTP; [`HttpTransport`] is the bundled implementation.

mod http;

pub use http::{build_http_client, HttpTransport, ProxyConfig};

use crate::request::{FetchRequest, FetchResponse};
use async_trait::async_trait;
use thiserror::Error;

/// Errors a transport can report for one attempt
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// Capability that fetches a request
///
/// The engine calls `fetch` from many workers at once and never serializes
/// calls, so implementations must tolerate concurrent use.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs and debug output
    fn name(&self) -> &str;

    /// Performs one fetch attempt
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let status = TransportError::Status {
            url: "https://example.com/".to_string(),
            status: 503,
        };
        assert_eq!(status.status(), Some(503));
        assert!(!status.is_timeout());

        let timeout = TransportError::Timeout {
            url: "https://example.com/".to_string(),
        };
        assert!(timeout.is_timeout());
        assert_eq!(timeout.status(), None);

        let network = TransportError::Network {
            url: "https://example.com/".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(network.is_network());
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::Status {
            url: "https://example.com/x".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://example.com/x");
    }
}

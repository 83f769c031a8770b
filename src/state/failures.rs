use crate::request::{FetchRequest, Fingerprint};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Where in the pipeline a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePhase {
    /// The transport failed permanently or retries ran out
    Fetch,
    /// The extraction step returned an error or panicked
    Extraction,
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => f.write_str("fetch"),
            Self::Extraction => f.write_str("extraction"),
        }
    }
}

/// A request that did not complete cleanly
#[derive(Debug, Clone)]
pub struct Failure {
    pub request: FetchRequest,
    pub fingerprint: Fingerprint,
    pub error: String,
    /// Fetch attempts made; zero when the payload came from the cache
    pub attempts: u32,
    pub phase: FailurePhase,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed during {} after {} attempt(s): {}",
            self.request, self.phase, self.attempts, self.error
        )
    }
}

/// Append-only failure list shared by the workers of one run
#[derive(Debug, Clone, Default)]
pub struct FailureLog {
    entries: Arc<Mutex<Vec<Failure>>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, failure: Failure) {
        tracing::warn!("{}", failure);
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(failure);
    }

    /// Copy of the failures recorded so far
    pub fn snapshot(&self) -> Vec<Failure> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::fingerprint;
    use crate::request::testing::get;

    fn failure(url: &str, phase: FailurePhase) -> Failure {
        let request = get(url);
        Failure {
            fingerprint: fingerprint(&request),
            request,
            error: "boom".to_string(),
            attempts: 2,
            phase,
        }
    }

    #[test]
    fn test_log_is_shared_between_clones() {
        let log = FailureLog::new();
        let other = log.clone();

        log.record(failure("https://example.com/a", FailurePhase::Fetch));
        other.record(failure("https://example.com/b", FailurePhase::Extraction));

        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].phase, FailurePhase::Fetch);
        assert_eq!(entries[1].phase, FailurePhase::Extraction);
    }

    #[test]
    fn test_display() {
        let text = failure("https://example.com/a", FailurePhase::Fetch).to_string();
        assert_eq!(
            text,
            "GET https://example.com/a failed during fetch after 2 attempt(s): boom"
        );
    }
}

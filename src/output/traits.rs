//! Output sink trait and shared types
//!
//! Record sinks receive records one at a time while a run is live and are
//! finished once the stream ends.

use crate::output::stats::StatsSnapshot;
use crate::state::Failure;
use crate::Record;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for harvested records
pub trait RecordSink {
    /// Writes one record
    fn write_record(&mut self, record: &Record) -> OutputResult<()>;

    /// Completes the output; no records may be written afterwards
    fn finish(&mut self) -> OutputResult<()>;

    /// Number of records written so far
    fn written(&self) -> u64;
}

/// Everything needed to describe a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_hash: Option<String>,
    pub cancelled: bool,
    pub stats: StatsSnapshot,
    pub failures: Vec<Failure>,
}

impl RunSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds().max(0)
    }

    pub fn status(&self) -> &'static str {
        if self.cancelled {
            "cancelled"
        } else {
            "completed"
        }
    }
}

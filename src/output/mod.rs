//! Output module for records and run reports
//!
//! This module handles:
//! - Writing harvested records as a JSON array, JSON lines or CSV
//! - Generating markdown summaries of finished runs
//! - Recording run statistics

mod delimited;
mod json;
mod markdown;
pub mod stats;
mod traits;

pub use delimited::CsvWriter;
pub use json::{open_sink, JsonArrayWriter, JsonLinesWriter};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_statistics, RunStats, StatsSnapshot};
pub use traits::{OutputError, OutputResult, RecordSink, RunSummary};

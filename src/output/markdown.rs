//! Markdown summary generation
//!
//! Renders a finished run as a human-readable report: run information,
//! request and result counters, and a table of failures.

use crate::output::traits::{OutputResult, RunSummary};
use crate::state::FailurePhase;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Failures listed individually before the table is truncated
const MAX_LISTED_FAILURES: usize = 50;

/// Writes the markdown summary of `summary` to `output_path`
pub fn generate_markdown_summary(summary: &RunSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run summary as markdown
pub fn format_markdown_summary(summary: &RunSummary) -> String {
    let stats = &summary.stats;
    let mut md = String::new();

    md.push_str("# Sumi-Harvest Run Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        summary.duration_seconds()
    ));
    md.push_str(&format!("- **Status**: {}\n", summary.status()));
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Statistics\n\n");
    md.push_str("| Counter | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Enqueued | {} |\n", stats.enqueued));
    md.push_str(&format!("| Fetched | {} |\n", stats.fetched));
    md.push_str(&format!("| Served from cache | {} |\n", stats.cache_hits));
    md.push_str(&format!("| Duplicates discarded | {} |\n", stats.duplicates));
    md.push_str(&format!("| Retries | {} |\n", stats.retries));
    md.push_str(&format!("| Records | {} |\n", stats.records));
    md.push_str(&format!("| Failures | {} |\n", stats.failures));
    md.push_str(&format!("| Drained on cancel | {} |\n\n", stats.drained));
    md.push_str(&format!(
        "**Success Rate**: {:.2}%\n\n",
        stats.success_rate()
    ));

    if !summary.failures.is_empty() {
        let fetch = summary
            .failures
            .iter()
            .filter(|f| f.phase == FailurePhase::Fetch)
            .count();

        md.push_str("## Failures\n\n");
        md.push_str(&format!(
            "{} during fetch, {} during extraction\n\n",
            fetch,
            summary.failures.len() - fetch
        ));
        md.push_str("| Request | Phase | Attempts | Error |\n");
        md.push_str("|---------|-------|----------|-------|\n");

        for failure in summary.failures.iter().take(MAX_LISTED_FAILURES) {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                escape_cell(&failure.request.to_string()),
                failure.phase,
                failure.attempts,
                escape_cell(&failure.error)
            ));
        }

        if summary.failures.len() > MAX_LISTED_FAILURES {
            md.push_str(&format!(
                "\n... and {} more\n",
                summary.failures.len() - MAX_LISTED_FAILURES
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

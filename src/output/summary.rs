//! End-of-run summary
//!
//! Built from the run context's counters when a run completes; logged
//! through `tracing` and optionally printed by the binary.

use chrono::{DateTime, Utc};

/// What a run did, as reported when it completes
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Dispatched attempts, retries included
    pub total_requests: usize,

    pub downloaded_files: usize,

    /// Cycles of an indefinite scrape after the first one
    pub repetition_cycles: usize,

    /// Descriptions of iterations that failed in their last attempt
    pub failed_iterations: Vec<String>,
}

impl RunSummary {
    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds().max(0)
    }

    pub fn has_final_errors(&self) -> bool {
        !self.failed_iterations.is_empty()
    }

    /// The one-line outcome of the run
    pub fn outcome(&self) -> String {
        if self.has_final_errors() {
            format!(
                "Number of requests that failed, in their last attempt: {}",
                self.failed_iterations.len()
            )
        } else {
            "All done, no final errors".to_string()
        }
    }
}

/// Logs the summary lines of a completed run
pub fn log_summary(summary: &RunSummary) {
    if summary.has_final_errors() {
        tracing::warn!("{}", summary.outcome());
    } else {
        tracing::info!("{}", summary.outcome());
    }
    tracing::info!("Overall files: {}", summary.downloaded_files);
    tracing::debug!(
        "Overall requests: {}, repetition cycles: {}",
        summary.total_requests,
        summary.repetition_cycles
    );
}

/// Prints the summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Scrape Summary ===\n");

    println!("Run:");
    println!("  Started:  {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {} seconds", summary.duration_seconds());
    println!();

    println!("Totals:");
    println!("  Requests: {}", summary.total_requests);
    println!("  Downloaded files: {}", summary.downloaded_files);
    if summary.repetition_cycles > 0 {
        println!("  Repetition cycles: {}", summary.repetition_cycles);
    }
    println!();

    if summary.has_final_errors() {
        println!("Final Errors ({}):", summary.failed_iterations.len());
        for error in &summary.failed_iterations {
            println!("  - {}", error);
        }
        println!();
    }

    println!("{}", summary.outcome());
}

//! Output module for everything a run writes or reports
//!
//! This module handles:
//! - Writing downloaded files through a persistence layer
//! - Exporting per-operation JSON logs when a run completes
//! - Building and displaying the run summary

mod export;
mod persistence;
mod summary;

pub use export::export_run_logs;
pub use persistence::{unique_file_path, FsPersistence, Persistence};
pub use summary::{log_summary, print_summary, RunSummary};

//! Configuration module for Trellis-Scrape
//!
//! This module handles loading, parsing, and validating TOML job files. A job
//! file carries the run-wide `[scraper]` settings and the declarative
//! `[root]` operation tree.
//!
//! # Example
//!
//! ```no_run
//! use trellis_scrape::config::load_job;
//! use std::path::Path;
//!
//! let job = load_job(Path::new("job.toml")).unwrap();
//! println!("Scraping will start at: {}", job.scraper.start_url);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    BasicAuth, CollectContentSpec, ContentType, DownloadContentSpec, DownloadKind,
    ElementSlice, JobFile, OpenLinksSpec, OpenUrlsSpec, OperationSpec, PaginationConfig,
    RootSpec, ScraperConfig, DEFAULT_SKIP_CODES,
};

pub use parser::{compute_config_hash, load_job, load_job_with_hash, parse_job};
pub use validation::{validate, validate_pagination, validate_scraper_config};

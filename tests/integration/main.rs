//! Integration tests for whole scrape runs
//!
//! `scrape_tests` drive the HTTP transport against wiremock servers;
//! `lifecycle_tests` use an in-memory transport to check run-wide timing,
//! concurrency and lifecycle behavior.

mod common;
mod lifecycle_tests;
mod scrape_tests;

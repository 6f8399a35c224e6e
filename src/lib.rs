//! Trellis-Scrape: a tree-shaped polite web scraper
//!
//! This crate walks a user-declared tree of operations over web pages: a root
//! page is fetched, its children extract content or follow links into further
//! pages, and the results are assembled into a tree mirroring the operations.
//! All fetches share one bounded queue, one request spacer and one retry policy.

pub mod config;
pub mod crawler;
pub mod operations;
pub mod output;
pub mod scraper;

use thiserror::Error;

/// Main error type for scraping operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request failed with status code {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Skipping error {code} for {url}")]
    SkippedStatus { url: String, code: u16, attempts: u32 },

    #[error("Giving up on {url} after {attempts} attempts: {source}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<ScrapeError>,
    },

    #[error("Hook '{hook}' failed: {source}")]
    Hook {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Returns the status code that classifies this failure, if it has one
    ///
    /// Network-level failures carry no code. Wrapped errors report the code
    /// of the error they wrap.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::SkippedStatus { code, .. } => Some(*code),
            Self::RetriesExhausted { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// Number of attempts made before giving up, for retry outcomes
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::SkippedStatus { attempts, .. } | Self::RetriesExhausted { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }

    /// Wraps an error returned by user hook code
    pub fn hook(hook: &'static str, source: anyhow::Error) -> Self {
        Self::Hook { hook, source }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pagination: {0}")]
    Pagination(String),
}

/// Result type alias for scraping operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use crate::config::{PaginationConfig, ScraperConfig};
pub use crate::operations::{
    CollectContent, DownloadContent, IterationRecord, OpenLinks, OpenUrls, Operation,
    OperationKind, OperationResult, Root,
};
pub use crate::scraper::{RunContext, Scraper};

//! Scraper lifecycle
//!
//! A [`Scraper`] owns one [`RunContext`] and drives an operation tree through
//! it:
//! 1. Injection: every node registers with the run and validates itself
//! 2. Scraping: the root opens the start URL and the tree recurses from there
//! 3. Completion: the completion signal fires, logs are exported when a log
//!    path is configured, and the run summary is logged
//!
//! # Example
//!
//! ```no_run
//! use trellis_scrape::{CollectContent, Root, Scraper, ScraperConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scraper = Scraper::new(ScraperConfig::new(
//!     "https://example.com",
//!     "https://example.com/",
//! ))?;
//! let root = Root::new().with_operation(CollectContent::new("h1").with_name("title"));
//!
//! let result = scraper.scrape(&root).await?;
//! println!("{} records", result.data.len());
//! # Ok(())
//! # }
//! ```

mod completion;
mod context;

pub use completion::{CompletionListener, CompletionSignal};
pub use context::{RunContext, RunStats};

use crate::config::{validate_scraper_config, ScraperConfig};
use crate::crawler::{Document, HttpTransport, Transport};
use crate::operations::{Injectable, IterationRecord, OperationResult, PageValidator, Root};
use crate::output::{export_run_logs, log_summary, FsPersistence, Persistence, RunSummary};
use crate::ScrapeError;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Configures the collaborators of a [`Scraper`]
pub struct ScraperBuilder {
    config: ScraperConfig,
    transport: Option<Arc<dyn Transport>>,
    persistence: Option<Arc<dyn Persistence>>,
    page_validator: Option<PageValidator>,
}

impl ScraperBuilder {
    /// Replaces the HTTP transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the filesystem persistence
    pub fn persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Every fetched page must pass `validator` before its children run
    pub fn page_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Document, &str) -> bool + Send + Sync + 'static,
    {
        self.page_validator = Some(Arc::new(validator));
        self
    }

    /// Validates the configuration and creates the scraper
    pub fn build(self) -> Result<Scraper, ScrapeError> {
        validate_scraper_config(&self.config)?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };
        let persistence: Arc<dyn Persistence> = match self.persistence {
            Some(persistence) => persistence,
            None => Arc::new(FsPersistence),
        };

        let mut context = RunContext::new(self.config, transport, persistence);
        if let Some(validator) = self.page_validator {
            context = context.with_page_validator(validator);
        }

        Ok(Scraper {
            context,
            started_at: Utc::now(),
            first_run: AtomicBool::new(true),
        })
    }
}

/// Runs operation trees against one run context
pub struct Scraper {
    context: RunContext,
    started_at: DateTime<Utc>,
    first_run: AtomicBool,
}

impl Scraper {
    /// Creates a scraper with the HTTP transport and filesystem persistence
    pub fn new(config: ScraperConfig) -> Result<Self, ScrapeError> {
        Self::builder(config).build()
    }

    pub fn builder(config: ScraperConfig) -> ScraperBuilder {
        ScraperBuilder {
            config,
            transport: None,
            persistence: None,
            page_validator: None,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// A listener that resolves once this run completes
    pub fn done(&self) -> CompletionListener {
        self.context.completion().subscribe()
    }

    /// Injects `root`, scrapes the whole tree, then completes the run
    ///
    /// Only configuration problems found during injection, and errors
    /// returned by the root's page-data hook, surface here. Failed pages are
    /// recorded in the result tree instead.
    pub async fn scrape(&self, root: &Root) -> Result<OperationResult, ScrapeError> {
        root.inject(&self.context)?;
        self.first_run.store(false, Ordering::SeqCst);

        tracing::info!(
            "Scraping {} with concurrency {}",
            self.context.config().start_url,
            self.context.config().concurrency
        );

        let result = root.scrape(&self.context).await;
        self.complete().await;
        result
    }

    /// Starts one more scrape cycle of `root` in the background
    ///
    /// `on_success` receives the root's data when the cycle ends, `on_error`
    /// the error that ended it. The run completes when no request is in
    /// flight at the end of the cycle.
    pub fn indefinite_scrape<S, E>(
        self: &Arc<Self>,
        root: Arc<Root>,
        on_success: S,
        on_error: E,
    ) -> Result<JoinHandle<()>, ScrapeError>
    where
        S: FnOnce(Vec<IterationRecord>) + Send + 'static,
        E: FnOnce(ScrapeError) + Send + 'static,
    {
        root.inject(&self.context)?;

        if !self.first_run.swap(false, Ordering::SeqCst) {
            let cycles = self.context.stats().record_cycle();
            tracing::debug!("Repetition cycle {}", cycles);
        }

        let scraper = Arc::clone(self);
        Ok(tokio::spawn(async move {
            match root.scrape(&scraper.context).await {
                Ok(_) => on_success(root.data()),
                Err(error) => on_error(error),
            }

            if scraper.context.stats().currently_running() == 0 {
                scraper.complete().await;
            }
        }))
    }

    /// Completes the run
    ///
    /// The completion signal fires on the first call only; logs and the
    /// summary are produced on every call. Log export failures are logged
    /// and otherwise ignored.
    pub async fn complete(&self) -> RunSummary {
        if !self.context.completion().fire() {
            tracing::debug!("Completion was already signalled");
        }

        if let Some(log_path) = &self.context.config().log_path {
            let exported = export_run_logs(
                self.context.persistence().as_ref(),
                Path::new(log_path),
                &self.context.registered(),
                &self.context.failed_iterations(),
            )
            .await;

            if let Err(error) = exported {
                tracing::error!("Error creating logs: {}", error);
            }
        }

        let summary = self.summary();
        log_summary(&summary);
        summary
    }

    /// The run's counters as of now
    pub fn summary(&self) -> RunSummary {
        let stats = self.context.stats();
        RunSummary {
            started_at: self.started_at,
            finished_at: Utc::now(),
            total_requests: stats.requests(),
            downloaded_files: stats.downloaded_files(),
            repetition_cycles: stats.repetition_cycles(),
            failed_iterations: self.context.failed_iterations(),
        }
    }
}

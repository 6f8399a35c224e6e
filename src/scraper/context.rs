//! Per-run shared state
//!
//! A [`RunContext`] is created once per scraper and handed by reference to
//! every operation. It owns the pieces all fetches share:
//! - The admission queue bounding concurrent requests
//! - The request spacer
//! - The retry policy
//! - Run counters, the failed-iteration list and the node registry

use crate::config::ScraperConfig;
use crate::crawler::{
    strip_tags, AdmissionQueue, Document, FetchRequest, FetchResponse, RequestSpacer,
    RetryController, Transport,
};
use crate::operations::{OperationHooks, OperationState, PageValidator};
use crate::output::Persistence;
use crate::scraper::completion::CompletionSignal;
use crate::ScrapeError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Counters of one run
#[derive(Debug, Default)]
pub struct RunStats {
    currently_running: AtomicUsize,
    requests: AtomicUsize,
    downloaded_files: AtomicUsize,
    repetition_cycles: AtomicUsize,
}

impl RunStats {
    /// Attempts that are between their spacer slot and their response
    pub fn currently_running(&self) -> usize {
        self.currently_running.load(Ordering::SeqCst)
    }

    /// Every dispatched attempt, retries included
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn downloaded_files(&self) -> usize {
        self.downloaded_files.load(Ordering::SeqCst)
    }

    /// Cycles of an indefinite scrape after the first one
    pub fn repetition_cycles(&self) -> usize {
        self.repetition_cycles.load(Ordering::SeqCst)
    }

    pub(crate) fn record_download(&self) {
        self.downloaded_files.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_cycle(&self) -> usize {
        self.repetition_cycles.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Keeps `currently_running` raised for the lifetime of one attempt
struct RunningGuard<'a> {
    stats: &'a RunStats,
}

impl<'a> RunningGuard<'a> {
    fn enter(stats: &'a RunStats) -> Self {
        stats.currently_running.fetch_add(1, Ordering::SeqCst);
        Self { stats }
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.stats.currently_running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything a run shares between its operations
pub struct RunContext {
    config: ScraperConfig,
    queue: AdmissionQueue,
    spacer: RequestSpacer,
    retry: RetryController,
    transport: Arc<dyn Transport>,
    persistence: Arc<dyn Persistence>,
    page_validator: Option<PageValidator>,
    stats: RunStats,
    failed_iterations: Mutex<Vec<String>>,

    /// Every injected node, in injection order
    registry: Mutex<Vec<Arc<OperationState>>>,

    done: CompletionSignal,
}

impl RunContext {
    pub fn new(
        config: ScraperConfig,
        transport: Arc<dyn Transport>,
        persistence: Arc<dyn Persistence>,
    ) -> Self {
        Self {
            queue: AdmissionQueue::new(config.concurrency),
            spacer: RequestSpacer::new(config.delay_duration()),
            retry: RetryController::from_config(&config),
            config,
            transport,
            persistence,
            page_validator: None,
            stats: RunStats::default(),
            failed_iterations: Mutex::new(Vec::new()),
            registry: Mutex::new(Vec::new()),
            done: CompletionSignal::new(),
        }
    }

    /// Sets the check every fetched page must pass before its children run
    pub fn with_page_validator(mut self, validator: PageValidator) -> Self {
        self.page_validator = Some(validator);
        self
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn queue(&self) -> &AdmissionQueue {
        &self.queue
    }

    pub fn persistence(&self) -> &Arc<dyn Persistence> {
        &self.persistence
    }

    pub fn completion(&self) -> &CompletionSignal {
        &self.done
    }

    /// Adds a node to the registry; returns false if it was already there
    pub fn register(&self, state: &Arc<OperationState>) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if registry.iter().any(|known| Arc::ptr_eq(known, state)) {
            return false;
        }
        registry.push(Arc::clone(state));
        true
    }

    /// Registered nodes in injection order
    pub fn registered(&self) -> Vec<Arc<OperationState>> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn report_failed_iteration(&self, description: String) {
        self.failed_iterations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(description);
    }

    /// Descriptions of every iteration that failed for good
    pub fn failed_iterations(&self) -> Vec<String> {
        self.failed_iterations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs the page validator; pages pass when none is set
    pub fn validate_page(&self, html: &str, address: &str) -> bool {
        match &self.page_validator {
            Some(validator) => {
                let document = Document::parse_document(html);
                validator(&document, address)
            }
            None => true,
        }
    }

    /// Fetches a page and returns its response with the markup to scrape
    ///
    /// Script and style elements are removed when configured, and the
    /// `page_html` hook runs as part of the attempt.
    pub async fn fetch_page(
        &self,
        href: &str,
        hooks: Option<&dyn OperationHooks>,
    ) -> Result<(FetchResponse, String), ScrapeError> {
        let attempt = || async move {
            let response = self.dispatch(href).await?;

            let mut html = response.text();
            if self.config.remove_style_and_script_tags {
                html = strip_tags(&html);
            }

            if let Some(hooks) = hooks {
                hooks
                    .page_html(&html, href)
                    .await
                    .map_err(|e| ScrapeError::hook("page_html", e))?;
            }

            Ok::<_, ScrapeError>((response, html))
        };

        self.queue
            .submit(self.retry.attempt(attempt, href, hooks))
            .await
    }

    /// Fetches a file to download
    pub async fn fetch_file(&self, href: &str) -> Result<FetchResponse, ScrapeError> {
        self.queue
            .submit(self.retry.attempt(|| self.dispatch(href), href, None))
            .await
    }

    /// One attempt: waits for a spacer slot, then hits the transport
    async fn dispatch(&self, href: &str) -> Result<FetchResponse, ScrapeError> {
        let _running = RunningGuard::enter(&self.stats);
        tracing::info!("Opening page: {}", href);

        self.spacer.wait().await;
        let requests = self.stats.requests.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(
            "overall requests: {}, currently running: {}",
            requests,
            self.stats.currently_running()
        );

        self.transport
            .fetch(FetchRequest::get(href, &self.config))
            .await
    }
}

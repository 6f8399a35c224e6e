//! Page processing for composite operations
//!
//! Turns one address into one [`IterationRecord`]:
//! 1. Paginated addresses fan out into page addresses (3 at a time)
//! 2. The page is fetched through the run's queue, spacer and retry policy
//! 3. The run's page validator may abandon the page (empty record, no error)
//! 4. The response hook sees the raw response
//! 5. Children run on the page in declaration order
//! 6. The page-object hook sees the children's results keyed by name
//!
//! Any failure in steps 2-6 is caught here and recorded on the iteration, on
//! the node and on the run; sibling iterations are unaffected.
//!
//! The fetched response lives only inside the iteration that fetched it.

use crate::crawler::{pagination_urls, AdmissionQueue};
use crate::operations::record::{build_page_object, IterationData, IterationRecord, OperationResult};
use crate::operations::{scrape_children, CompositeOperation};
use crate::scraper::RunContext;
use crate::ScrapeError;

/// A page handed from a composite operation to its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// Address the page was opened at
    pub url: String,

    /// Page markup
    pub html: String,
}

/// Drives the pages of one composite node
pub struct PageProcessor<'a> {
    ctx: &'a RunContext,
    node: &'a dyn CompositeOperation,
}

impl<'a> PageProcessor<'a> {
    pub fn new(ctx: &'a RunContext, node: &'a dyn CompositeOperation) -> Self {
        Self { ctx, node }
    }

    /// Processes one address, paginating it first if asked to
    pub async fn process_one_iteration(&self, href: String, should_paginate: bool) -> IterationRecord {
        if should_paginate {
            return self.paginate(href).await;
        }

        self.open_iteration(href).await
    }

    /// Splits `address` into its pages and processes each one
    ///
    /// The returned record holds one record per page, in page order.
    pub async fn paginate(&self, address: String) -> IterationRecord {
        let urls = match self.node.pagination() {
            Some(pagination) => pagination_urls(&address, pagination),
            None => Ok(vec![address.clone()]),
        };

        let urls = match urls {
            Ok(urls) => urls,
            Err(error) => {
                let mut record = IterationRecord::new(address);
                self.record_failure(&mut record, &ScrapeError::Config(error));
                return record;
            }
        };

        tracing::debug!("Paginating {} into {} pages", address, urls.len());

        let pages = AdmissionQueue::nested()
            .map_ordered(urls, |url| self.open_iteration(url))
            .await;

        IterationRecord::with_data(address, IterationData::Pages(pages))
    }

    /// Opens a single page and runs the children on it
    async fn open_iteration(&self, href: String) -> IterationRecord {
        let mut record = IterationRecord::new(href);

        match self.open_page(&record.address).await {
            Ok(Some(children)) => record.data = IterationData::Children(children),
            Ok(None) => {}
            Err(error) => self.record_failure(&mut record, &error),
        }

        record
    }

    /// Returns `None` when the page validator rejected the page
    async fn open_page(&self, href: &str) -> Result<Option<Vec<OperationResult>>, ScrapeError> {
        let hooks = self.node.hooks();
        let (response, html) = self.ctx.fetch_page(href, hooks).await?;

        if !self.ctx.validate_page(&html, href) {
            tracing::info!("Page {} was rejected by the page validator", href);
            return Ok(None);
        }

        if let Some(hooks) = hooks {
            hooks
                .page_response(&response)
                .await
                .map_err(|e| ScrapeError::hook("page_response", e))?;
        }

        let page = PageContext {
            url: href.to_string(),
            html,
        };
        let children = scrape_children(self.ctx, self.node.children(), &page).await?;

        if let Some(hooks) = hooks {
            let object = build_page_object(&children);
            hooks
                .page_object(&object, href)
                .await
                .map_err(|e| ScrapeError::hook("page_object", e))?;
        }

        Ok(Some(children))
    }

    fn record_failure(&self, record: &mut IterationRecord, error: &ScrapeError) {
        let description = record.fail(error);
        tracing::error!("{}", description);
        self.node.state().push_error(description.clone());
        self.ctx.report_failed_iteration(description);
    }
}

/// Processes every reference of a composite node and appends the records to it
///
/// References run through the node's iteration queue; the page-data hook
/// sees each record as it finishes. Records come back in reference order.
pub(crate) async fn scrape_references(
    ctx: &RunContext,
    node: &dyn CompositeOperation,
    references: Vec<String>,
) -> Result<Vec<IterationRecord>, ScrapeError> {
    let processor = PageProcessor::new(ctx, node);
    let processor = &processor;
    let should_paginate = node.pagination().is_some();
    let hooks = node.hooks();

    let results = node
        .iteration_queue(ctx)
        .map_ordered(references, |href| async move {
            let record = processor.process_one_iteration(href, should_paginate).await;
            if let Some(hooks) = hooks {
                hooks
                    .page_data(&record)
                    .await
                    .map_err(|e| ScrapeError::hook("page_data", e))?;
            }
            Ok::<_, ScrapeError>(record)
        })
        .await;

    let records = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    node.state().push_data(records.iter().cloned());

    Ok(records)
}

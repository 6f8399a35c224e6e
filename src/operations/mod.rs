//! The operation tree
//!
//! A tree is a [`Root`] whose children are [`Operation`]s. Composite kinds
//! (Root, OpenLinks, OpenUrls) open pages and run their children on each
//! page; leaf kinds (CollectContent, DownloadContent) work on the page they
//! are given.
//!
//! Every node takes part in two contracts:
//! - [`Injectable`]: registers with a run and validates itself before scraping
//! - [`CompositeOperation`]: for composite kinds, exposes what the page
//!   processor needs to drive its pages and children
//!
//! # Example
//!
//! ```no_run
//! use trellis_scrape::{CollectContent, OpenLinks, Root, Scraper, ScraperConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScraperConfig::new("https://example.com", "https://example.com/news");
//! let scraper = Scraper::new(config)?;
//!
//! let root = Root::new().with_operation(
//!     OpenLinks::new("a.story")
//!         .with_name("story")
//!         .with_operation(CollectContent::new("h1").with_name("title")),
//! );
//!
//! let result = scraper.scrape(&root).await?;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```

mod builder;
mod collect_content;
mod download_content;
mod hooks;
mod open_links;
mod open_urls;
mod page;
mod record;
mod root;

pub use builder::build_root;
pub use collect_content::CollectContent;
pub use download_content::DownloadContent;
pub use hooks::{Condition, ContentHooks, HookResult, HrefTransform, OperationHooks, PageValidator};
pub use open_links::OpenLinks;
pub use open_urls::OpenUrls;
pub use page::{PageContext, PageProcessor};
pub use record::{
    build_page_object, IterationData, IterationRecord, OperationKind, OperationResult,
    PageObject, ResultData,
};
pub use root::Root;

use crate::config::PaginationConfig;
use crate::crawler::{AdmissionQueue, ElementData};
use crate::scraper::RunContext;
use crate::{ConfigError, ScrapeError};
use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex, PoisonError};

/// Identity, accumulated data and errors of one node
///
/// Shared between the node and the run's registry so the run can export
/// every node's data when it completes.
#[derive(Debug)]
pub struct OperationState {
    kind: OperationKind,
    name: String,

    /// One entry per processed reference, append-only
    data: Mutex<Vec<IterationRecord>>,

    errors: Mutex<Vec<String>>,
}

impl OperationState {
    pub fn new(kind: OperationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            data: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Everything this node produced so far
    pub fn data(&self) -> Vec<IterationRecord> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every error this node recorded so far
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn push_data(&self, records: impl IntoIterator<Item = IterationRecord>) {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(records);
    }

    pub(crate) fn push_error(&self, error: String) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }

    fn with_name(&self, name: impl Into<String>) -> Self {
        Self::new(self.kind, name)
    }
}

/// A node that can be attached to a run
pub trait Injectable {
    /// Registers this node and its descendants with `ctx`, then validates
    /// this node's configuration
    ///
    /// Registration happens once per run; injecting again only re-validates.
    fn inject(&self, ctx: &RunContext) -> Result<(), ConfigError>;
}

/// A node that opens pages and drives children on them
pub trait CompositeOperation: Injectable + Send + Sync {
    fn state(&self) -> &Arc<OperationState>;

    fn children(&self) -> &[Operation];

    fn pagination(&self) -> Option<&PaginationConfig>;

    fn hooks(&self) -> Option<&dyn OperationHooks>;

    /// Checks this node's own configuration
    fn validate_arguments(&self, ctx: &RunContext) -> Result<(), ConfigError>;

    /// Returns true if a child opens pages of its own
    fn has_composite_children(&self) -> bool {
        self.children().iter().any(Operation::is_composite)
    }

    /// The queue this node's iterations run through
    ///
    /// Nodes with composite children use the fixed nested bound.
    fn iteration_queue(&self, ctx: &RunContext) -> AdmissionQueue {
        if self.has_composite_children() {
            AdmissionQueue::nested()
        } else {
            AdmissionQueue::new(ctx.config().concurrency)
        }
    }
}

/// Shared injection sequence of composite kinds
pub(crate) fn inject_composite<N>(node: &N, ctx: &RunContext) -> Result<(), ConfigError>
where
    N: CompositeOperation + ?Sized,
{
    if ctx.register(node.state()) {
        for child in node.children() {
            child.inject(ctx)?;
        }
    }

    node.validate_arguments(ctx)
}

/// Applies a condition predicate, passing each element's index
pub(crate) fn filter_elements(
    elements: Vec<ElementData>,
    condition: Option<&Condition>,
) -> Vec<ElementData> {
    match condition {
        Some(condition) => elements
            .into_iter()
            .enumerate()
            .filter(|(index, element)| condition(element, *index))
            .map(|(_, element)| element)
            .collect(),
        None => elements,
    }
}

/// Any node that can appear below the root
pub enum Operation {
    OpenLinks(OpenLinks),
    OpenUrls(OpenUrls),
    CollectContent(CollectContent),
    DownloadContent(DownloadContent),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::OpenLinks(_) => OperationKind::OpenLinks,
            Self::OpenUrls(_) => OperationKind::OpenUrls,
            Self::CollectContent(_) => OperationKind::CollectContent,
            Self::DownloadContent(_) => OperationKind::DownloadContent,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.kind().is_composite()
    }

    pub fn state(&self) -> &Arc<OperationState> {
        match self {
            Self::OpenLinks(op) => op.state(),
            Self::OpenUrls(op) => op.state(),
            Self::CollectContent(op) => op.state(),
            Self::DownloadContent(op) => op.state(),
        }
    }

    pub fn name(&self) -> &str {
        self.state().name()
    }

    pub fn data(&self) -> Vec<IterationRecord> {
        self.state().data()
    }

    pub fn errors(&self) -> Vec<String> {
        self.state().errors()
    }

    pub fn children(&self) -> &[Operation] {
        match self {
            Self::OpenLinks(op) => op.children(),
            Self::OpenUrls(op) => op.children(),
            Self::CollectContent(_) | Self::DownloadContent(_) => &[],
        }
    }

    /// Runs this node against a page its parent opened
    pub fn scrape<'a>(
        &'a self,
        ctx: &'a RunContext,
        page: &'a PageContext,
    ) -> BoxFuture<'a, Result<OperationResult, ScrapeError>> {
        match self {
            Self::OpenLinks(op) => op.scrape(ctx, page).boxed(),
            Self::OpenUrls(op) => op.scrape(ctx).boxed(),
            Self::CollectContent(op) => op.scrape(page).boxed(),
            Self::DownloadContent(op) => op.scrape(ctx, page).boxed(),
        }
    }
}

impl Injectable for Operation {
    fn inject(&self, ctx: &RunContext) -> Result<(), ConfigError> {
        match self {
            Self::OpenLinks(op) => op.inject(ctx),
            Self::OpenUrls(op) => op.inject(ctx),
            Self::CollectContent(op) => op.inject(ctx),
            Self::DownloadContent(op) => op.inject(ctx),
        }
    }
}

impl From<OpenLinks> for Operation {
    fn from(op: OpenLinks) -> Self {
        Self::OpenLinks(op)
    }
}

impl From<OpenUrls> for Operation {
    fn from(op: OpenUrls) -> Self {
        Self::OpenUrls(op)
    }
}

impl From<CollectContent> for Operation {
    fn from(op: CollectContent) -> Self {
        Self::CollectContent(op)
    }
}

impl From<DownloadContent> for Operation {
    fn from(op: DownloadContent) -> Self {
        Self::DownloadContent(op)
    }
}

/// Runs children one after another on the same page, keeping their order
pub(crate) async fn scrape_children(
    ctx: &RunContext,
    children: &[Operation],
    page: &PageContext,
) -> Result<Vec<OperationResult>, ScrapeError> {
    let mut results = Vec::with_capacity(children.len());
    for child in children {
        results.push(child.scrape(ctx, page).await?);
    }
    Ok(results)
}

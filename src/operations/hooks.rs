//! User callbacks attached to operations
//!
//! Asynchronous callbacks are grouped into traits whose methods default to
//! doing nothing; implement only what you need and attach the value with
//! `with_hooks`. Synchronous predicates are plain closures.

use crate::crawler::{Document, ElementData, FetchResponse};
use crate::operations::record::{IterationRecord, PageObject};
use crate::ScrapeError;
use async_trait::async_trait;
use std::sync::Arc;

/// Result returned by user callbacks
pub type HookResult = anyhow::Result<()>;

/// Callbacks for operations that open pages (Root, OpenLinks, OpenUrls)
///
/// An error returned from these fails the iteration it ran in, the same way
/// a failed fetch does. `page_data` is the exception, see below.
/// `exception` runs between retry attempts.
#[async_trait]
pub trait OperationHooks: Send + Sync {
    /// Receives every finished iteration record of the operation
    ///
    /// An error here fails the parent's iteration instead, dropping the
    /// results of every sibling on that page. On the root it is returned
    /// from `Scraper::scrape`.
    async fn page_data(&self, _record: &IterationRecord) -> HookResult {
        Ok(())
    }

    /// Receives the html of each fetched page, after script/style stripping
    async fn page_html(&self, _html: &str, _address: &str) -> HookResult {
        Ok(())
    }

    /// Receives the children's results keyed by child name
    async fn page_object(&self, _object: &PageObject, _address: &str) -> HookResult {
        Ok(())
    }

    /// Receives the raw response of each accepted page
    async fn page_response(&self, _response: &FetchResponse) -> HookResult {
        Ok(())
    }

    /// Receives each failed attempt that is about to be retried
    async fn exception(&self, _error: &ScrapeError) -> HookResult {
        Ok(())
    }
}

/// Callbacks for CollectContent
#[async_trait]
pub trait ContentHooks: Send + Sync {
    /// Receives each extracted value; returning `Some` replaces it
    async fn element_content(
        &self,
        _content: &str,
        _address: &str,
        _element: &ElementData,
    ) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Receives all values collected from one page
    async fn all_items(&self, _items: &[String], _address: &str) -> HookResult {
        Ok(())
    }
}

/// Decides whether a selected element takes part; receives the element and its index
pub type Condition = Arc<dyn Fn(&ElementData, usize) -> bool + Send + Sync>;

/// Rewrites an address before it is opened
pub type HrefTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Run-wide page check; returning `false` abandons the page without an error
pub type PageValidator = Arc<dyn Fn(&Document, &str) -> bool + Send + Sync>;

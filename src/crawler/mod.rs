//! Crawler module for page fetching and processing primitives
//!
//! This module contains the machinery every operation fetches through:
//! - Admission queues bounding concurrent work
//! - The run-wide request spacer
//! - Retry logic with skip-code classification
//! - The HTTP transport
//! - HTML content queries and link resolution
//! - Pagination address expansion

mod fetcher;
mod pagination;
mod parser;
mod queue;
mod retry;
mod spacer;

pub use fetcher::{build_http_client, FetchRequest, FetchResponse, HttpTransport, Transport};
pub use pagination::pagination_urls;
pub use parser::{
    apply_slice, element_content, page_base_url, parse_selector, resolve_link, select_elements,
    strip_tags, Document, ElementData,
};
pub use queue::{AdmissionQueue, NESTED_CONCURRENCY};
pub use retry::RetryController;
pub use spacer::RequestSpacer;

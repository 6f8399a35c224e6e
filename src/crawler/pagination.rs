//! Expansion of one address into its paginated page addresses

use crate::config::{validate_pagination, PaginationConfig};
use crate::ConfigError;

/// Derives the ordered page addresses for `address`
///
/// # Example
///
/// ```
/// use trellis_scrape::config::PaginationConfig;
/// use trellis_scrape::crawler::pagination_urls;
///
/// let urls = pagination_urls("https://example.com/list", &PaginationConfig::query("page", 1, 2)).unwrap();
/// assert_eq!(urls, vec![
///     "https://example.com/list?page=1".to_string(),
///     "https://example.com/list?page=2".to_string(),
/// ]);
/// ```
pub fn pagination_urls(
    address: &str,
    pagination: &PaginationConfig,
) -> Result<Vec<String>, ConfigError> {
    validate_pagination(pagination)?;

    let pages: Vec<u32> = match &pagination.page_numbers {
        Some(pages) => pages.clone(),
        None => {
            // validate_pagination guarantees both bounds without page_numbers
            let begin = pagination.begin.unwrap_or_default();
            let end = pagination.end.unwrap_or_default();
            let offset = pagination.offset.unwrap_or(1).max(1);
            (begin..=end).step_by(offset as usize).collect()
        }
    };

    let urls = match (&pagination.query_string, &pagination.routing_string) {
        (Some(query), _) => {
            let separator = if address.contains('?') { '&' } else { '?' };
            pages
                .iter()
                .map(|page| format!("{}{}{}={}", address, separator, query, page))
                .collect()
        }
        (None, Some(routing)) => {
            let address = address.trim_end_matches('/');
            let routing = routing.trim_matches('/');
            pages
                .iter()
                .map(|page| format!("{}/{}/{}", address, routing, page))
                .collect()
        }
        (None, None) => Vec::new(),
    };

    Ok(urls)
}

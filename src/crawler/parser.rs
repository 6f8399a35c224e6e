//! HTML content queries
//!
//! This module is the scraper's view of page markup:
//! - Selecting elements by CSS selector, with slicing
//! - Extracting text or inner markup from selected elements
//! - Resolving link targets against the page or its `<base>` tag
//! - Removing `<script>` and `<style>` elements
//!
//! Parsed documents never outlive the function that parsed them; callers get
//! owned [`ElementData`] snapshots back.

use crate::config::{ContentType, ElementSlice};
use crate::ScrapeError;
use ::scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

/// A parsed HTML document
pub type Document = Html;

/// Owned snapshot of one selected element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Concatenated text of the element and its descendants
    pub text: String,

    /// Markup inside the element
    pub inner_html: String,

    pub attributes: BTreeMap<String, String>,
}

impl ElementData {
    fn from_element(element: ElementRef<'_>) -> Self {
        Self {
            text: element.text().collect(),
            inner_html: element.inner_html(),
            attributes: element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Parses a CSS selector
pub fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Selects all elements matching `selector`, then applies `slice`
///
/// # Example
///
/// ```
/// use trellis_scrape::crawler::select_elements;
///
/// let html = r#"<ul><li>a</li><li>b</li><li>c</li></ul>"#;
/// let items = select_elements(html, "li", None).unwrap();
/// assert_eq!(items.len(), 3);
/// assert_eq!(items[1].text, "b");
/// ```
pub fn select_elements(
    html: &str,
    selector: &str,
    slice: Option<ElementSlice>,
) -> Result<Vec<ElementData>, ScrapeError> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);

    let elements = document
        .select(&selector)
        .map(ElementData::from_element)
        .collect();

    Ok(apply_slice(elements, slice))
}

/// Keeps the part of `items` named by `slice`
///
/// Negative bounds count from the end; out-of-range bounds are clamped.
pub fn apply_slice<T>(items: Vec<T>, slice: Option<ElementSlice>) -> Vec<T> {
    let Some(slice) = slice else {
        return items;
    };

    let len = items.len() as i64;
    let clamp = |index: i64| -> usize {
        let index = if index < 0 { len + index } else { index };
        index.clamp(0, len) as usize
    };

    let (start, end) = match slice {
        ElementSlice::From(start) => (clamp(start), len as usize),
        ElementSlice::Range(start, end) => (clamp(start), clamp(end)),
    };

    if start >= end {
        return Vec::new();
    }

    items.into_iter().skip(start).take(end - start).collect()
}

/// Extracts the requested content from an element
pub fn element_content(element: &ElementData, content_type: ContentType, trim: bool) -> String {
    let content = match content_type {
        ContentType::Text => element.text.as_str(),
        ContentType::Html => element.inner_html.as_str(),
    };

    if trim {
        content.trim().to_string()
    } else {
        content.to_string()
    }
}

/// Returns the address relative links on this page resolve against
///
/// A single `<base href>` wins; `href="/"` means the site root. Otherwise the
/// page address itself is used.
pub fn page_base_url(html: &str, page_url: &str, base_site_url: &str) -> String {
    let document = Html::parse_document(html);
    let base_href = Selector::parse("base[href]").ok().and_then(|selector| {
        let mut tags = document.select(&selector);
        match (tags.next(), tags.next()) {
            (Some(tag), None) => tag.value().attr("href").map(str::to_string),
            _ => None,
        }
    });

    match base_href.as_deref() {
        Some("/") => base_site_url.to_string(),
        Some(href) => Url::parse(page_url)
            .and_then(|page| page.join(href))
            .map(|url| url.to_string())
            .unwrap_or_else(|_| page_url.to_string()),
        None => page_url.to_string(),
    }
}

/// Resolves a link href to an absolute HTTP(S) address
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:") || href.starts_with("mailto:") || href.starts_with("tel:")
    {
        return None;
    }

    let base = Url::parse(base_url).ok()?;
    let absolute = base.join(href).ok()?;

    if absolute.scheme() == "http" || absolute.scheme() == "https" {
        Some(absolute.to_string())
    } else {
        None
    }
}

/// Removes every `<script>` and `<style>` element from a document
pub fn strip_tags(html: &str) -> String {
    let mut document = Html::parse_document(html);

    let Ok(selector) = Selector::parse("script, style") else {
        return html.to_string();
    };

    let ids: Vec<_> = document.select(&selector).map(|element| element.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    document.html()
}

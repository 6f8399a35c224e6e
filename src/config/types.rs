use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Status codes that never trigger a retry, on top of any configured ones
pub const DEFAULT_SKIP_CODES: [u16; 3] = [404, 403, 400];

/// A complete job description: run-wide settings plus the operation tree
#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub root: RootSpec,
}

/// Run-wide scraper configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScraperConfig {
    /// Site the relative links of the start page are resolved against
    pub base_site_url: String,

    /// Address the root operation opens
    pub start_url: String,

    /// Maximum number of concurrent requests
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum number of retries of a failed request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Extra status codes that do not cause a retry
    #[serde(default)]
    pub error_codes_to_skip: Vec<u16>,

    /// Minimum time between two request dispatches (milliseconds)
    #[serde(default = "default_delay")]
    pub delay: u64,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub auth: Option<BasicAuth>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Proxy URL every request is routed through
    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(default = "default_true")]
    pub show_console_logs: bool,

    /// Directory the per-operation logs are written to when the run completes
    #[serde(default)]
    pub log_path: Option<String>,

    /// Directory downloaded files are written to
    #[serde(default)]
    pub file_path: Option<String>,

    /// Keep existing files and write numbered copies instead of overwriting
    #[serde(default = "default_true")]
    pub clone_files: bool,

    #[serde(default = "default_true")]
    pub remove_style_and_script_tags: bool,
}

fn default_concurrency() -> usize {
    3
}

fn default_max_retries() -> u32 {
    5
}

fn default_delay() -> u64 {
    200
}

fn default_timeout() -> u64 {
    6000
}

fn default_true() -> bool {
    true
}

impl ScraperConfig {
    /// Creates a configuration with every optional setting at its default
    pub fn new(base_site_url: impl Into<String>, start_url: impl Into<String>) -> Self {
        Self {
            base_site_url: base_site_url.into(),
            start_url: start_url.into(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            error_codes_to_skip: Vec::new(),
            delay: default_delay(),
            timeout: default_timeout(),
            auth: None,
            headers: BTreeMap::new(),
            proxy: None,
            show_console_logs: true,
            log_path: None,
            file_path: None,
            clone_files: true,
            remove_style_and_script_tags: true,
        }
    }

    /// The full set of status codes that end retries immediately
    pub fn skip_codes(&self) -> BTreeSet<u16> {
        DEFAULT_SKIP_CODES
            .iter()
            .chain(self.error_codes_to_skip.iter())
            .copied()
            .collect()
    }

    pub fn delay_duration(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

/// HTTP basic authentication credentials
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BasicAuth {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Describes how one address expands into a list of page addresses
///
/// Exactly one of `query_string` (`?page=N`) or `routing_string`
/// (`/page/N`) names the page parameter. Pages come either from the
/// `begin..=end` range stepped by `offset`, or from `page_numbers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PaginationConfig {
    pub query_string: Option<String>,
    pub routing_string: Option<String>,
    pub begin: Option<u32>,
    pub end: Option<u32>,
    pub offset: Option<u32>,
    pub page_numbers: Option<Vec<u32>>,
}

impl PaginationConfig {
    /// Pages `begin..=end` appended as a query parameter
    pub fn query(name: impl Into<String>, begin: u32, end: u32) -> Self {
        Self {
            query_string: Some(name.into()),
            begin: Some(begin),
            end: Some(end),
            ..Self::default()
        }
    }

    /// Pages `begin..=end` appended as path segments
    pub fn routing(name: impl Into<String>, begin: u32, end: u32) -> Self {
        Self {
            routing_string: Some(name.into()),
            begin: Some(begin),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_page_numbers(mut self, pages: Vec<u32>) -> Self {
        self.page_numbers = Some(pages);
        self
    }
}

/// Which part of the selected nodes a slice keeps, with JavaScript-style
/// negative indices counting from the end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ElementSlice {
    From(i64),
    Range(i64, i64),
}

/// What CollectContent extracts from each element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    #[default]
    Text,
    Html,
}

/// What DownloadContent treats as the file address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadKind {
    /// `src` attribute
    #[default]
    Image,
    /// `href` attribute
    File,
}

/// The root of the operation tree in a job file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RootSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

/// One declarative node of the operation tree
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OperationSpec {
    OpenLinks(OpenLinksSpec),
    OpenUrls(OpenUrlsSpec),
    CollectContent(CollectContentSpec),
    DownloadContent(DownloadContentSpec),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OpenLinksSpec {
    pub selector: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,
    #[serde(default)]
    pub slice: Option<ElementSlice>,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OpenUrlsSpec {
    pub urls: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CollectContentSpec {
    pub selector: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default = "default_true")]
    pub should_trim: bool,
    #[serde(default)]
    pub slice: Option<ElementSlice>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DownloadContentSpec {
    pub selector: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_type: DownloadKind,
    #[serde(default)]
    pub alternative_src: Vec<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub slice: Option<ElementSlice>,
}

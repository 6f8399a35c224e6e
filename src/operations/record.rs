//! Result values produced by operations
//!
//! An [`OperationResult`] is what one operation returns for one page; each of
//! its [`IterationRecord`]s describes one opened address and nests the results
//! of the children that ran on it. Serialized, the tree mirrors the
//! operation tree.

use crate::ScrapeError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// The closed set of operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
    Root,
    OpenLinks,
    OpenUrls,
    CollectContent,
    DownloadContent,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::OpenLinks => "OpenLinks",
            Self::OpenUrls => "OpenUrls",
            Self::CollectContent => "CollectContent",
            Self::DownloadContent => "DownloadContent",
        }
    }

    /// Returns true for kinds that open pages and own children
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Root | Self::OpenLinks | Self::OpenUrls)
    }

    /// Name given to operations that were not named explicitly
    pub fn default_name(&self) -> String {
        format!("Default {} name", self.as_str())
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of processing one address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub address: String,

    pub data: IterationData,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,

    /// Status code of the failure, when the failure had one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,

    /// Attempts made before the failure was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

/// What an iteration produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum IterationData {
    /// Results of the children, in declaration order
    Children(Vec<OperationResult>),

    /// One record per paginated page, in page order
    Pages(Vec<IterationRecord>),

    /// Values a leaf operation extracted from one page
    Values(Vec<String>),
}

impl IterationRecord {
    /// A record with no data and no error
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            data: IterationData::Children(Vec::new()),
            error: None,
            successful: None,
            code: None,
            attempts: None,
        }
    }

    pub fn with_data(address: impl Into<String>, data: IterationData) -> Self {
        Self {
            data,
            ..Self::new(address)
        }
    }

    /// Returns true if this record failed
    pub fn is_failed(&self) -> bool {
        self.successful == Some(false)
    }

    /// Returns true if nothing was produced for this address
    pub fn is_empty(&self) -> bool {
        match &self.data {
            IterationData::Children(children) => children.is_empty(),
            IterationData::Pages(pages) => pages.is_empty(),
            IterationData::Values(values) => values.is_empty(),
        }
    }

    /// Child results, empty unless this record opened a single page
    pub fn children(&self) -> &[OperationResult] {
        match &self.data {
            IterationData::Children(children) => children,
            _ => &[],
        }
    }

    /// Per-page records, empty unless this record was paginated
    pub fn pages(&self) -> &[IterationRecord] {
        match &self.data {
            IterationData::Pages(pages) => pages,
            _ => &[],
        }
    }

    /// Marks this record failed; returns the failure description
    pub(crate) fn fail(&mut self, error: &ScrapeError) -> String {
        let description = format!(
            "There was an error opening page {}, {}",
            self.address, error
        );
        self.error = Some(description.clone());
        self.successful = Some(false);
        self.code = error.status_code();
        self.attempts = error.attempts();
        description
    }
}

/// What one operation returned for one page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    #[serde(rename = "type")]
    pub kind: OperationKind,

    pub name: String,

    pub data: ResultData,
}

/// Payload of an operation result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultData {
    /// Composite operations: one record per opened address
    Iterations(Vec<IterationRecord>),

    /// Leaf operations: the extracted values
    Values(Vec<String>),
}

impl ResultData {
    pub fn iterations(&self) -> &[IterationRecord] {
        match self {
            Self::Iterations(records) => records,
            Self::Values(_) => &[],
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            Self::Values(values) => values,
            Self::Iterations(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Iterations(records) => records.len(),
            Self::Values(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Children's results of one page, keyed by child name
pub type PageObject = BTreeMap<String, ResultData>;

/// Folds ordered child results into a page object
///
/// A repeated name gets the smallest free numeric suffix: `title`,
/// `title1`, `title2`, ...
pub fn build_page_object(children: &[OperationResult]) -> PageObject {
    let mut object = PageObject::new();
    for child in children {
        let key = page_object_key(&child.name, &object);
        object.insert(key, child.data.clone());
    }
    object
}

fn page_object_key(name: &str, object: &PageObject) -> String {
    if !object.contains_key(name) {
        return name.to_string();
    }

    (1..)
        .map(|n| format!("{}{}", name, n))
        .find(|candidate| !object.contains_key(candidate))
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(name: &str, items: &[&str]) -> OperationResult {
        OperationResult {
            kind: OperationKind::CollectContent,
            name: name.to_string(),
            data: ResultData::Values(items.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(OperationKind::OpenLinks.to_string(), "OpenLinks");
        assert!(OperationKind::Root.is_composite());
        assert!(!OperationKind::DownloadContent.is_composite());
        assert_eq!(
            OperationKind::CollectContent.default_name(),
            "Default CollectContent name"
        );
    }

    #[test]
    fn test_fail_records_code() {
        let mut record = IterationRecord::new("https://example.com/a");
        let description = record.fail(&ScrapeError::SkippedStatus {
            url: "https://example.com/a".to_string(),
            code: 429,
            attempts: 1,
        });

        assert!(record.is_failed());
        assert_eq!(record.code, Some(429));
        assert_eq!(record.attempts, Some(1));
        assert!(description.contains("https://example.com/a"));
        assert_eq!(record.error.as_deref(), Some(description.as_str()));
    }

    #[test]
    fn test_fail_records_attempts_of_exhausted_retries() {
        let mut record = IterationRecord::new("https://example.com/b");
        record.fail(&ScrapeError::RetriesExhausted {
            url: "https://example.com/b".to_string(),
            attempts: 3,
            source: Box::new(ScrapeError::Http {
                url: "https://example.com/b".to_string(),
                status: 500,
            }),
        });

        assert_eq!(record.code, Some(500));
        assert_eq!(record.attempts, Some(3));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["attempts"], 3);
        assert!(serde_json::to_value(IterationRecord::new("x")).unwrap()["attempts"].is_null());
    }

    #[test]
    fn test_page_object_keys_avoid_collisions() {
        let children = vec![
            values("title", &["a"]),
            values("title", &["b"]),
            values("body", &["c"]),
            values("title", &["d"]),
        ];

        let object = build_page_object(&children);

        assert_eq!(object.len(), 4);
        assert_eq!(object["title"].values(), ["a"]);
        assert_eq!(object["title1"].values(), ["b"]);
        assert_eq!(object["title2"].values(), ["d"]);
        assert_eq!(object["body"].values(), ["c"]);
    }

    #[test]
    fn test_serialized_shape() {
        let mut failed = IterationRecord::new("https://example.com/b");
        failed.fail(&ScrapeError::Http {
            url: "https://example.com/b".to_string(),
            status: 500,
        });

        let result = OperationResult {
            kind: OperationKind::OpenUrls,
            name: "pages".to_string(),
            data: ResultData::Iterations(vec![
                IterationRecord::with_data(
                    "https://example.com/a",
                    IterationData::Children(vec![values("title", &["A"])]),
                ),
                failed,
            ]),
        };

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["type"], "OpenUrls");
        assert_eq!(json["data"][0]["address"], "https://example.com/a");
        assert_eq!(json["data"][0]["data"][0]["data"][0], "A");
        assert!(json["data"][0].get("error").is_none());
        assert_eq!(json["data"][1]["successful"], false);
        assert_eq!(json["data"][1]["code"], 500);
    }
}

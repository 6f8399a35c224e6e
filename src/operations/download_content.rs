use crate::config::{DownloadKind, ElementSlice};
use crate::crawler::{
    page_base_url, parse_selector, resolve_link, select_elements, AdmissionQueue, ElementData,
    FetchResponse,
};
use crate::operations::hooks::Condition;
use crate::operations::page::PageContext;
use crate::operations::record::{IterationData, IterationRecord, OperationKind, OperationResult, ResultData};
use crate::operations::{filter_elements, Injectable, OperationState};
use crate::output::unique_file_path;
use crate::scraper::RunContext;
use crate::{ConfigError, ScrapeError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Downloads the files or images referenced by matching elements
///
/// Each address is fetched through the run's queue, spacer and retry policy.
/// A file that fails is recorded on this node and on the run; the other
/// files of the page are still downloaded.
pub struct DownloadContent {
    state: Arc<OperationState>,
    selector: String,
    kind: DownloadKind,
    alternative_src: Vec<String>,
    file_path: Option<PathBuf>,
    slice: Option<ElementSlice>,
    condition: Option<Condition>,
}

impl DownloadContent {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            state: Arc::new(OperationState::new(
                OperationKind::DownloadContent,
                OperationKind::DownloadContent.default_name(),
            )),
            selector: selector.into(),
            kind: DownloadKind::Image,
            alternative_src: Vec::new(),
            file_path: None,
            slice: None,
            condition: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.state = Arc::new(self.state.with_name(name));
        self
    }

    /// `Image` reads `src`, `File` reads `href`
    pub fn with_kind(mut self, kind: DownloadKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attributes tried, in order, when the primary one is missing
    pub fn with_alternative_src<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternative_src = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the run-wide download directory
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_slice(mut self, slice: ElementSlice) -> Self {
        self.slice = Some(slice);
        self
    }

    pub fn with_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&ElementData, usize) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    pub fn state(&self) -> &Arc<OperationState> {
        &self.state
    }

    fn source_attribute(&self) -> &'static str {
        match self.kind {
            DownloadKind::Image => "src",
            DownloadKind::File => "href",
        }
    }

    fn directory(&self, ctx: &RunContext) -> Option<PathBuf> {
        self.file_path
            .clone()
            .or_else(|| ctx.config().file_path.as_ref().map(PathBuf::from))
    }

    /// Absolute, deduplicated addresses of the files referenced on `page`
    ///
    /// `data:` URIs are skipped.
    pub fn references(&self, ctx: &RunContext, page: &PageContext) -> Result<Vec<String>, ScrapeError> {
        let base = page_base_url(&page.html, &page.url, &ctx.config().base_site_url);
        let elements = select_elements(&page.html, &self.selector, self.slice)?;
        let elements = filter_elements(elements, self.condition.as_ref());

        let mut seen = HashSet::new();
        let references = elements
            .iter()
            .filter_map(|element| {
                std::iter::once(self.source_attribute())
                    .chain(self.alternative_src.iter().map(String::as_str))
                    .find_map(|name| element.attr(name).filter(|value| !value.trim().is_empty()))
            })
            .filter(|src| !src.trim_start().starts_with("data:"))
            .filter_map(|src| resolve_link(src, &base))
            .filter(|address| seen.insert(address.clone()))
            .collect();

        Ok(references)
    }

    pub async fn scrape(
        &self,
        ctx: &RunContext,
        page: &PageContext,
    ) -> Result<OperationResult, ScrapeError> {
        let references = self.references(ctx, page)?;
        let directory = self.directory(ctx).ok_or_else(|| {
            ConfigError::Validation(format!(
                "DownloadContent '{}' has no file path",
                self.state.name()
            ))
        })?;

        ctx.persistence().ensure_directory(&directory).await?;

        let results = AdmissionQueue::nested()
            .map_ordered(references, |address| {
                let directory = &directory;
                async move {
                    let outcome = self.download(ctx, &address, directory).await;
                    (address, outcome)
                }
            })
            .await;

        let mut downloaded = Vec::with_capacity(results.len());
        for (address, outcome) in results {
            match outcome {
                Ok(path) => {
                    tracing::debug!("Saved {} to {}", address, path.display());
                    downloaded.push(address);
                }
                Err(error) => {
                    let description =
                        format!("There was an error downloading file {}, {}", address, error);
                    tracing::error!("{}", description);
                    self.state.push_error(description.clone());
                    ctx.report_failed_iteration(description);
                }
            }
        }

        self.state.push_data([IterationRecord::with_data(
            page.url.clone(),
            IterationData::Values(downloaded.clone()),
        )]);

        Ok(OperationResult {
            kind: OperationKind::DownloadContent,
            name: self.state.name().to_string(),
            data: ResultData::Values(downloaded),
        })
    }

    async fn download(
        &self,
        ctx: &RunContext,
        address: &str,
        directory: &Path,
    ) -> Result<PathBuf, ScrapeError> {
        let response = ctx.fetch_file(address).await?;
        let file_name = file_name_for(&response);
        let persistence = ctx.persistence();

        let path = unique_file_path(
            persistence.as_ref(),
            directory,
            &file_name,
            ctx.config().clone_files,
        )
        .await?;
        persistence.write_file(&path, &response.data).await?;
        ctx.stats().record_download();

        Ok(path)
    }
}

impl Injectable for DownloadContent {
    fn inject(&self, ctx: &RunContext) -> Result<(), ConfigError> {
        ctx.register(&self.state);

        parse_selector(&self.selector).map_err(|e| {
            ConfigError::Validation(format!("DownloadContent '{}': {}", self.state.name(), e))
        })?;

        if self.directory(ctx).is_none() {
            return Err(ConfigError::Validation(format!(
                "DownloadContent '{}' requires a file-path, either its own or the scraper's",
                self.state.name()
            )));
        }

        Ok(())
    }
}

/// Name a downloaded file is stored under
///
/// The last path segment of the final address; an extension is derived from
/// the content type when the segment has none.
fn file_name_for(response: &FetchResponse) -> String {
    let segment = Url::parse(&response.url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| "file".to_string());

    if segment.contains('.') {
        return segment;
    }

    match response.content_type.as_deref().and_then(extension_for) {
        Some(extension) => format!("{}.{}", segment, extension),
        None => segment,
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let extension = match mime.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "application/pdf" => "pdf",
        "text/html" => "html",
        "text/plain" => "txt",
        "application/json" => "json",
        _ => return None,
    };
    Some(extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(url: &str, content_type: Option<&str>) -> FetchResponse {
        FetchResponse {
            url: url.to_string(),
            status: 200,
            content_type: content_type.map(str::to_string),
            data: Vec::new(),
        }
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            file_name_for(&response("https://example.com/img/cat.png?size=2", None)),
            "cat.png"
        );
        assert_eq!(
            file_name_for(&response("https://example.com/avatar", Some("image/jpeg; q=1"))),
            "avatar.jpg"
        );
        assert_eq!(file_name_for(&response("https://example.com/", None)), "file");
    }

    #[test]
    fn test_source_attribute() {
        assert_eq!(DownloadContent::new("img").source_attribute(), "src");
        assert_eq!(
            DownloadContent::new("a")
                .with_kind(DownloadKind::File)
                .source_attribute(),
            "href"
        );
    }
}

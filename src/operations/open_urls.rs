use crate::config::PaginationConfig;
use crate::operations::hooks::{HrefTransform, OperationHooks};
use crate::operations::page::scrape_references;
use crate::operations::record::{OperationKind, OperationResult, ResultData};
use crate::operations::{inject_composite, CompositeOperation, Injectable, Operation, OperationState};
use crate::scraper::RunContext;
use crate::{ConfigError, ScrapeError};
use std::sync::Arc;
use url::Url;

/// Opens a fixed list of addresses and runs its children on each
pub struct OpenUrls {
    state: Arc<OperationState>,
    urls: Vec<String>,
    children: Vec<Operation>,
    pagination: Option<PaginationConfig>,
    transform_href: Option<HrefTransform>,
    hooks: Option<Arc<dyn OperationHooks>>,
}

impl OpenUrls {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(OperationState::new(
                OperationKind::OpenUrls,
                OperationKind::OpenUrls.default_name(),
            )),
            urls: urls.into_iter().map(Into::into).collect(),
            children: Vec::new(),
            pagination: None,
            transform_href: None,
            hooks: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.state = Arc::new(self.state.with_name(name));
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Rewrites each address before it is opened
    pub fn with_transform_href<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transform_href = Some(Arc::new(transform));
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn OperationHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_operation(mut self, operation: impl Into<Operation>) -> Self {
        self.add_operation(operation);
        self
    }

    pub fn add_operation(&mut self, operation: impl Into<Operation>) {
        self.children.push(operation.into());
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub async fn scrape(&self, ctx: &RunContext) -> Result<OperationResult, ScrapeError> {
        let references = self
            .urls
            .iter()
            .map(|url| match &self.transform_href {
                Some(transform) => transform(url),
                None => url.clone(),
            })
            .collect();

        let records = scrape_references(ctx, self, references).await?;

        Ok(OperationResult {
            kind: OperationKind::OpenUrls,
            name: self.state.name().to_string(),
            data: ResultData::Iterations(records),
        })
    }
}

impl Injectable for OpenUrls {
    fn inject(&self, ctx: &RunContext) -> Result<(), ConfigError> {
        inject_composite(self, ctx)
    }
}

impl CompositeOperation for OpenUrls {
    fn state(&self) -> &Arc<OperationState> {
        &self.state
    }

    fn children(&self) -> &[Operation] {
        &self.children
    }

    fn pagination(&self) -> Option<&PaginationConfig> {
        self.pagination.as_ref()
    }

    fn hooks(&self) -> Option<&dyn OperationHooks> {
        self.hooks.as_deref()
    }

    fn validate_arguments(&self, _ctx: &RunContext) -> Result<(), ConfigError> {
        for url in &self.urls {
            Url::parse(url).map_err(|e| {
                ConfigError::InvalidUrl(format!(
                    "OpenUrls operation '{}' got an invalid URL '{}': {}",
                    self.state.name(),
                    url,
                    e
                ))
            })?;
        }

        if let Some(pagination) = &self.pagination {
            crate::config::validate_pagination(pagination)?;
        }

        Ok(())
    }
}

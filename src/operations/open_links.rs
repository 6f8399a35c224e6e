use crate::config::{ElementSlice, PaginationConfig};
use crate::crawler::{page_base_url, parse_selector, resolve_link, select_elements, ElementData};
use crate::operations::hooks::{Condition, HrefTransform, OperationHooks};
use crate::operations::page::{scrape_references, PageContext};
use crate::operations::record::{OperationKind, OperationResult, ResultData};
use crate::operations::{
    filter_elements, inject_composite, CompositeOperation, Injectable, Operation, OperationState,
};
use crate::scraper::RunContext;
use crate::{ConfigError, ScrapeError};
use std::sync::Arc;

/// Follows the links matched on its parent's page and runs its children on
/// each linked page
pub struct OpenLinks {
    state: Arc<OperationState>,
    selector: String,
    children: Vec<Operation>,
    pagination: Option<PaginationConfig>,
    slice: Option<ElementSlice>,
    condition: Option<Condition>,
    transform_href: Option<HrefTransform>,
    hooks: Option<Arc<dyn OperationHooks>>,
}

impl OpenLinks {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            state: Arc::new(OperationState::new(
                OperationKind::OpenLinks,
                OperationKind::OpenLinks.default_name(),
            )),
            selector: selector.into(),
            children: Vec::new(),
            pagination: None,
            slice: None,
            condition: None,
            transform_href: None,
            hooks: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.state = Arc::new(self.state.with_name(name));
        self
    }

    /// Paginates every opened link
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = Some(pagination);
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

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Absolute addresses of the links this node follows on `page`
    ///
    /// Relative hrefs resolve against the page's `<base>` tag when it has
    /// exactly one, otherwise against the page address.
    pub fn references(&self, ctx: &RunContext, page: &PageContext) -> Result<Vec<String>, ScrapeError> {
        let base = page_base_url(&page.html, &page.url, &ctx.config().base_site_url);
        let elements = select_elements(&page.html, &self.selector, self.slice)?;
        let elements = filter_elements(elements, self.condition.as_ref());

        let references = elements
            .iter()
            .filter_map(|element| element.attr("href"))
            .filter_map(|href| resolve_link(href, &base))
            .map(|href| match &self.transform_href {
                Some(transform) => transform(&href),
                None => href,
            })
            .collect();

        Ok(references)
    }

    pub async fn scrape(
        &self,
        ctx: &RunContext,
        page: &PageContext,
    ) -> Result<OperationResult, ScrapeError> {
        let references = self.references(ctx, page)?;
        tracing::debug!(
            "{} found {} links on {}",
            self.state.name(),
            references.len(),
            page.url
        );

        let records = scrape_references(ctx, self, references).await?;

        Ok(OperationResult {
            kind: OperationKind::OpenLinks,
            name: self.state.name().to_string(),
            data: ResultData::Iterations(records),
        })
    }
}

impl Injectable for OpenLinks {
    fn inject(&self, ctx: &RunContext) -> Result<(), ConfigError> {
        inject_composite(self, ctx)
    }
}

impl CompositeOperation for OpenLinks {
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
        parse_selector(&self.selector)
            .map_err(|e| ConfigError::Validation(format!("OpenLinks '{}': {}", self.state.name(), e)))?;

        if let Some(pagination) = &self.pagination {
            crate::config::validate_pagination(pagination)?;
        }

        Ok(())
    }
}

use crate::config::{ContentType, ElementSlice};
use crate::crawler::{element_content, parse_selector, select_elements, ElementData};
use crate::operations::hooks::{Condition, ContentHooks};
use crate::operations::page::PageContext;
use crate::operations::record::{IterationData, IterationRecord, OperationKind, OperationResult, ResultData};
use crate::operations::{filter_elements, Injectable, OperationState};
use crate::scraper::RunContext;
use crate::{ConfigError, ScrapeError};
use std::sync::Arc;

/// Extracts the text or markup of matching elements
pub struct CollectContent {
    state: Arc<OperationState>,
    selector: String,
    content_type: ContentType,
    should_trim: bool,
    slice: Option<ElementSlice>,
    condition: Option<Condition>,
    hooks: Option<Arc<dyn ContentHooks>>,
}

impl CollectContent {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            state: Arc::new(OperationState::new(
                OperationKind::CollectContent,
                OperationKind::CollectContent.default_name(),
            )),
            selector: selector.into(),
            content_type: ContentType::Text,
            should_trim: true,
            slice: None,
            condition: None,
            hooks: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.state = Arc::new(self.state.with_name(name));
        self
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Keeps surrounding whitespace when `false`
    pub fn with_trim(mut self, should_trim: bool) -> Self {
        self.should_trim = should_trim;
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

    pub fn with_hooks(mut self, hooks: Arc<dyn ContentHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn state(&self) -> &Arc<OperationState> {
        &self.state
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Collects from `page`, appending one record per call
    pub async fn scrape(&self, page: &PageContext) -> Result<OperationResult, ScrapeError> {
        let elements = select_elements(&page.html, &self.selector, self.slice)?;
        let elements = filter_elements(elements, self.condition.as_ref());

        let mut items = Vec::with_capacity(elements.len());
        for element in &elements {
            let content = element_content(element, self.content_type, self.should_trim);

            let content = match &self.hooks {
                Some(hooks) => hooks
                    .element_content(&content, &page.url, element)
                    .await
                    .map_err(|e| ScrapeError::hook("element_content", e))?
                    .unwrap_or(content),
                None => content,
            };

            items.push(content);
        }

        if let Some(hooks) = &self.hooks {
            hooks
                .all_items(&items, &page.url)
                .await
                .map_err(|e| ScrapeError::hook("all_items", e))?;
        }

        self.state.push_data([IterationRecord::with_data(
            page.url.clone(),
            IterationData::Values(items.clone()),
        )]);

        Ok(OperationResult {
            kind: OperationKind::CollectContent,
            name: self.state.name().to_string(),
            data: ResultData::Values(items),
        })
    }
}

impl Injectable for CollectContent {
    fn inject(&self, ctx: &RunContext) -> Result<(), ConfigError> {
        ctx.register(&self.state);

        parse_selector(&self.selector).map_err(|e| {
            ConfigError::Validation(format!("CollectContent '{}': {}", self.state.name(), e))
        })?;

        Ok(())
    }
}

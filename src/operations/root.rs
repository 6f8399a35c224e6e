use crate::config::PaginationConfig;
use crate::operations::hooks::OperationHooks;
use crate::operations::page::scrape_references;
use crate::operations::record::{IterationRecord, OperationKind, OperationResult, ResultData};
use crate::operations::{inject_composite, CompositeOperation, Injectable, Operation, OperationState};
use crate::scraper::RunContext;
use crate::{ConfigError, ScrapeError};
use std::sync::Arc;

/// The top of an operation tree; opens the run's start URL
pub struct Root {
    state: Arc<OperationState>,
    children: Vec<Operation>,
    pagination: Option<PaginationConfig>,
    hooks: Option<Arc<dyn OperationHooks>>,
}

impl Root {
    pub fn new() -> Self {
        Self {
            state: Arc::new(OperationState::new(OperationKind::Root, "root")),
            children: Vec::new(),
            pagination: None,
            hooks: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.state = Arc::new(self.state.with_name(name));
        self
    }

    /// Paginates the start URL
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = Some(pagination);
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

    pub fn name(&self) -> &str {
        self.state.name()
    }

    /// Every record this root produced, one per run cycle
    pub fn data(&self) -> Vec<IterationRecord> {
        self.state.data()
    }

    pub fn errors(&self) -> Vec<String> {
        self.state.errors()
    }

    /// Opens the start URL and runs the whole tree below it
    pub async fn scrape(&self, ctx: &RunContext) -> Result<OperationResult, ScrapeError> {
        let start_url = ctx.config().start_url.clone();
        let records = scrape_references(ctx, self, vec![start_url]).await?;

        Ok(OperationResult {
            kind: OperationKind::Root,
            name: self.name().to_string(),
            data: ResultData::Iterations(records),
        })
    }
}

impl Default for Root {
    fn default() -> Self {
        Self::new()
    }
}

impl Injectable for Root {
    fn inject(&self, ctx: &RunContext) -> Result<(), ConfigError> {
        inject_composite(self, ctx)
    }
}

impl CompositeOperation for Root {
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

    fn validate_arguments(&self, ctx: &RunContext) -> Result<(), ConfigError> {
        if ctx.config().start_url.is_empty() {
            return Err(ConfigError::Validation(
                "Root requires a start_url in the scraper configuration".to_string(),
            ));
        }

        if let Some(pagination) = &self.pagination {
            crate::config::validate_pagination(pagination)?;
        }

        Ok(())
    }
}

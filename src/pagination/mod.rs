//! Pagination handling for GitHub list endpoints.
//!
//! List endpoints are walked with `?per_page=N&page=K` starting at page 1
//! until the API answers with an empty array. There is no page cap: the
//! empty page is the only termination signal.

use crate::client::Transport;
use crate::config::MAX_PER_PAGE;
use crate::errors::{ScrapeError, ScrapeErrorKind, ScrapeResult};
use crate::observability::Metrics;
use crate::types::{Endpoint, Entity, EntityShape, FetchMode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::trace;

/// Pagination parameters for list requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaginationParams {
    /// Items per page (max 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    /// Page number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl PaginationParams {
    /// Creates new pagination parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page number.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets items per page.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page.min(MAX_PER_PAGE));
        self
    }

    /// Encodes the parameters as a query string, without the leading `?`.
    pub fn to_query_string(&self) -> ScrapeResult<String> {
        serde_urlencoded::to_string(self).map_err(|e| {
            ScrapeError::new(
                ScrapeErrorKind::InvalidConfiguration,
                format!("Failed to encode pagination parameters: {}", e),
            )
        })
    }
}

/// A single page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Page number.
    pub page: u32,
}

impl<T> Page<T> {
    /// Returns true if this is the terminating page.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the page and returns the items.
    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

/// Issues one logical list request and returns every item it yields.
#[derive(Clone)]
pub struct PagedFetcher {
    transport: Arc<dyn Transport>,
    per_page: u32,
    metrics: Arc<Metrics>,
}

impl PagedFetcher {
    /// Creates a fetcher over a transport.
    pub fn new(transport: Arc<dyn Transport>, per_page: u32, metrics: Arc<Metrics>) -> Self {
        Self {
            transport,
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            metrics,
        }
    }

    /// Gets the shared metrics.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Fetches an endpoint using its own pagination mode.
    pub async fn fetch(&self, endpoint: &Endpoint) -> ScrapeResult<Vec<Entity>> {
        self.fetch_with_mode(endpoint, endpoint.mode()).await
    }

    /// Fetches an endpoint with an explicit pagination mode.
    ///
    /// Any failure discards the pages read so far; callers never see a
    /// partial list.
    pub async fn fetch_with_mode(
        &self,
        endpoint: &Endpoint,
        mode: FetchMode,
    ) -> ScrapeResult<Vec<Entity>> {
        let path = endpoint.path();
        let shape = endpoint.shape();
        match mode {
            FetchMode::SingleObject => self.fetch_single(&path, shape).await,
            FetchMode::Paginated => {
                let mut all_items = Vec::new();
                let mut page = 1u32;
                loop {
                    let current = self.fetch_page(&path, shape, page).await?;
                    if current.is_empty() {
                        break;
                    }
                    all_items.extend(current.into_items());
                    page += 1;
                }
                Ok(all_items)
            }
        }
    }

    /// Fetches one page of a list endpoint.
    pub async fn fetch_page(
        &self,
        path: &str,
        shape: EntityShape,
        page: u32,
    ) -> ScrapeResult<Page<Entity>> {
        let params = PaginationParams::new().per_page(self.per_page).page(page);
        let body = self.transport.get_json(path, &params).await?;
        let items = entities_from_array(body, shape).map_err(|e| e.with_endpoint(path))?;
        trace!(path = %path, page = page, items = items.len(), "page fetched");
        if !items.is_empty() {
            self.metrics.record_page(items.len());
        }
        Ok(Page { items, page })
    }

    async fn fetch_single(&self, path: &str, shape: EntityShape) -> ScrapeResult<Vec<Entity>> {
        let params = PaginationParams::new().per_page(self.per_page);
        let body = self.transport.get_json(path, &params).await?;
        if !body.is_object() {
            return Err(ScrapeError::unexpected_shape(format!(
                "Expected a {} object, got {}",
                shape.name(),
                json_kind(&body)
            ))
            .with_endpoint(path));
        }
        let entity = validated_entity(body, shape).map_err(|e| e.with_endpoint(path))?;
        self.metrics.record_page(1);
        Ok(vec![entity])
    }
}

fn entities_from_array(body: Value, shape: EntityShape) -> ScrapeResult<Vec<Entity>> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .map(|item| validated_entity(item, shape))
            .collect(),
        other => Err(ScrapeError::unexpected_shape(format!(
            "Expected a list of {} items, got {}",
            shape.name(),
            json_kind(&other)
        ))),
    }
}

fn validated_entity(item: Value, shape: EntityShape) -> ScrapeResult<Entity> {
    shape.validate(&item).map_err(|e| {
        ScrapeError::unexpected_shape(format!("Item is not a valid {}: {}", shape.name(), e))
            .with_cause(e)
    })?;
    Entity::from_value(item)
        .ok_or_else(|| ScrapeError::unexpected_shape(format!("Expected a {} object", shape.name())))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//! Mock transport for testing the fetch engine without a network.

use crate::client::Transport;
use crate::errors::{RateLimitInfo, ScrapeError, ScrapeErrorKind, ScrapeResult};
use crate::pagination::PaginationParams;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
enum MockOutcome {
    Json(Value),
    Raw(String),
    Status { status: u16, message: String },
    RateLimited,
    ConnectionFailed,
}

/// A scripted response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    outcome: MockOutcome,
    delay: Option<std::time::Duration>,
}

impl MockResponse {
    /// A 200 response with a JSON body.
    pub fn ok(body: Value) -> Self {
        Self::from_outcome(MockOutcome::Json(body))
    }

    /// A 200 response whose body is not JSON.
    pub fn raw(body: impl Into<String>) -> Self {
        Self::from_outcome(MockOutcome::Raw(body.into()))
    }

    /// A non-success status with a GitHub style message.
    pub fn error(status: u16, message: &str) -> Self {
        Self::from_outcome(MockOutcome::Status {
            status,
            message: message.to_string(),
        })
    }

    /// A 404 Not Found response.
    pub fn not_found() -> Self {
        Self::error(404, "Not Found")
    }

    /// A 403 with an exhausted rate limit.
    pub fn rate_limited() -> Self {
        Self::from_outcome(MockOutcome::RateLimited)
    }

    /// A transport level failure; no response at all.
    pub fn connection_failed() -> Self {
        Self::from_outcome(MockOutcome::ConnectionFailed)
    }

    /// Adds a delay before responding.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn from_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            delay: None,
        }
    }

    fn into_result(self, path: &str) -> ScrapeResult<Value> {
        match self.outcome {
            MockOutcome::Json(body) => Ok(body),
            MockOutcome::Raw(body) => serde_json::from_str(&body).map_err(|e| {
                ScrapeError::new(
                    ScrapeErrorKind::InvalidJson,
                    format!("Failed to deserialize response: {}", e),
                )
                .with_status(200)
                .with_endpoint(path)
            }),
            MockOutcome::Status { status, message } => {
                Err(ScrapeError::from_status(status, message).with_endpoint(path))
            }
            MockOutcome::RateLimited => Err(ScrapeError::rate_limited(
                403,
                RateLimitInfo {
                    limit: 5000,
                    remaining: 0,
                    reset_at: Utc::now() + Duration::minutes(1),
                },
            )
            .with_endpoint(path)),
            MockOutcome::ConnectionFailed => Err(ScrapeError::new(
                ScrapeErrorKind::ConnectionFailed,
                "Connection failed: mock",
            )
            .with_endpoint(path)),
        }
    }
}

/// A recorded mock request.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Request path.
    pub path: String,
    /// Requested page, if any.
    pub page: Option<u32>,
    /// Requested page size, if any.
    pub per_page: Option<u32>,
    /// Timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Behavior for requests with no scripted response.
#[derive(Debug, Clone, Copy, Default)]
pub enum DefaultBehavior {
    /// Answer with 404.
    #[default]
    NotFound,
    /// Answer with `[]`, i.e. an endpoint with no items.
    EmptyList,
    /// Panic, for tests that need a task to die.
    Panic,
}

/// Mock transport with responses scripted per path and page.
///
/// Responses registered for the same key are served in order; the last one
/// is repeated for any further request.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    responses: Arc<RwLock<HashMap<(String, Option<u32>), Vec<MockResponse>>>>,
    requests: Arc<RwLock<Vec<MockRequest>>>,
    default_behavior: DefaultBehavior,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the behavior for requests with no scripted response.
    pub fn with_default_behavior(mut self, behavior: DefaultBehavior) -> Self {
        self.default_behavior = behavior;
        self
    }

    /// Scripts a response for any page of a path.
    pub fn on_get(&self, path: &str, response: MockResponse) {
        self.register(path, None, response);
    }

    /// Scripts a response for one page of a path.
    pub fn on_page(&self, path: &str, page: u32, response: MockResponse) {
        self.register(path, Some(page), response);
    }

    /// Scripts a complete list endpoint: one page per chunk, then `[]`.
    pub fn on_list(&self, path: &str, pages: Vec<Value>) {
        let mut page = 1;
        for chunk in pages {
            self.on_page(path, page, MockResponse::ok(chunk));
            page += 1;
        }
        self.on_page(path, page, MockResponse::ok(Value::Array(Vec::new())));
    }

    fn register(&self, path: &str, page: Option<u32>, response: MockResponse) {
        let mut store = self.responses.write().unwrap_or_else(|e| e.into_inner());
        store
            .entry((path.to_string(), page))
            .or_default()
            .push(response);
    }

    fn next_response(&self, path: &str, page: Option<u32>) -> Option<MockResponse> {
        let mut store = self.responses.write().unwrap_or_else(|e| e.into_inner());
        let key = if store.contains_key(&(path.to_string(), page)) {
            (path.to_string(), page)
        } else {
            (path.to_string(), None)
        };
        let queue = store.get_mut(&key)?;
        match queue.len() {
            0 => None,
            1 => queue.first().cloned(),
            _ => Some(queue.remove(0)),
        }
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Gets requests for one path.
    pub fn requests_for(&self, path: &str) -> Vec<MockRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Clears recorded requests.
    pub fn clear_requests(&self) {
        self.requests.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_json(&self, path: &str, params: &PaginationParams) -> ScrapeResult<Value> {
        self.requests
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(MockRequest {
                path: path.to_string(),
                page: params.page,
                per_page: params.per_page,
                timestamp: Utc::now(),
            });

        match self.next_response(path, params.page) {
            Some(response) => {
                if let Some(delay) = response.delay {
                    tokio::time::sleep(delay).await;
                }
                response.into_result(path)
            }
            None => match self.default_behavior {
                DefaultBehavior::NotFound => {
                    Err(ScrapeError::from_status(404, "Not Found").with_endpoint(path))
                }
                DefaultBehavior::EmptyList => Ok(Value::Array(Vec::new())),
                DefaultBehavior::Panic => panic!("No mock response for GET {}", path),
            },
        }
    }
}

//! Concurrent execution of independent fetch requests.
//!
//! A [`FetchBatch`] is submitted as a whole: every request runs as its own
//! task, each task owns its buffer, and [`FanOutScheduler::run`] only returns
//! once every task has finished. Failures stay with the request that caused
//! them.

use crate::errors::{ScrapeError, ScrapeErrorKind};
use crate::observability::ScrapeHooks;
use crate::pagination::PagedFetcher;
use crate::tagging;
use crate::types::{Context, Endpoint, Entity, FetchMode};
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::error;

/// Identifies a request within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(usize);

impl RequestId {
    /// Position of the request in its batch.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// One logical fetch and the context its items are tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    endpoint: Endpoint,
    mode: FetchMode,
    context: Context,
}

impl FetchRequest {
    /// Creates a request using the endpoint's own pagination mode.
    pub fn new(endpoint: Endpoint, context: Context) -> Self {
        let mode = endpoint.mode();
        Self {
            endpoint,
            mode,
            context,
        }
    }

    /// Overrides the pagination mode.
    pub fn with_mode(mut self, mode: FetchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Gets the endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Gets the pagination mode.
    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    /// Gets the context.
    pub fn context(&self) -> &Context {
        &self.context
    }
}

/// Ordered set of requests submitted together.
#[derive(Debug, Clone, Default)]
pub struct FetchBatch {
    requests: Vec<FetchRequest>,
}

impl FetchBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request and returns its id.
    pub fn push(&mut self, request: FetchRequest) -> RequestId {
        self.requests.push(request);
        RequestId(self.requests.len() - 1)
    }

    /// Number of requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Returns true if the batch has no requests.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl FromIterator<FetchRequest> for FetchBatch {
    fn from_iter<I: IntoIterator<Item = FetchRequest>>(iter: I) -> Self {
        Self {
            requests: iter.into_iter().collect(),
        }
    }
}

/// Result of one request: its tagged items, or nothing and the reason.
#[derive(Debug)]
pub struct FetchOutcome {
    request: FetchRequest,
    entities: Vec<Entity>,
    failure: Option<ScrapeError>,
}

impl FetchOutcome {
    /// Gets the request.
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    /// Gets the items. Empty when the request failed.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Consumes the outcome and returns the items.
    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }

    /// Gets the failure, if any.
    pub fn failure(&self) -> Option<&ScrapeError> {
        self.failure.as_ref()
    }

    /// Returns true if the request succeeded.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Human readable record of a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// Endpoint path.
    pub endpoint: String,
    /// Organization / repository / user the request was for.
    pub context: String,
    /// Error kind.
    pub kind: ScrapeErrorKind,
    /// Error message.
    pub message: String,
}

impl FailureReport {
    fn new(request: &FetchRequest, error: &ScrapeError) -> Self {
        Self {
            endpoint: request.endpoint.path(),
            context: request.context.describe(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcomes of a batch, keyed by request id.
#[derive(Debug, Default)]
pub struct BatchResult {
    outcomes: Vec<FetchOutcome>,
}

impl BatchResult {
    /// Gets the outcome for a request.
    pub fn get(&self, id: RequestId) -> Option<&FetchOutcome> {
        self.outcomes.get(id.0)
    }

    /// Iterates over outcomes in submission order.
    pub fn iter(&self) -> impl Iterator<Item = (RequestId, &FetchOutcome)> {
        self.outcomes
            .iter()
            .enumerate()
            .map(|(i, outcome)| (RequestId(i), outcome))
    }

    /// Consumes the result, yielding outcomes in submission order.
    pub fn into_outcomes(self) -> Vec<FetchOutcome> {
        self.outcomes
    }

    /// Reports for every failed request.
    pub fn failures(&self) -> Vec<FailureReport> {
        self.outcomes
            .iter()
            .filter_map(|o| o.failure().map(|e| FailureReport::new(&o.request, e)))
            .collect()
    }

    /// Number of outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Runs fetch batches concurrently and joins them.
#[derive(Clone)]
pub struct FanOutScheduler {
    fetcher: PagedFetcher,
}

impl FanOutScheduler {
    /// Creates a scheduler over a fetcher.
    pub fn new(fetcher: PagedFetcher) -> Self {
        Self { fetcher }
    }

    /// Gets the fetcher.
    pub fn fetcher(&self) -> &PagedFetcher {
        &self.fetcher
    }

    /// Runs every request of the batch concurrently and waits for all of them.
    ///
    /// No request is retried and none is cancelled because a sibling failed.
    /// A request whose task panics is reported as [`ScrapeErrorKind::TaskFailed`].
    pub async fn run(&self, batch: FetchBatch) -> BatchResult {
        let started = Instant::now();
        let requests = batch.requests;
        let mut slots: Vec<Option<Result<Vec<Entity>, ScrapeError>>> =
            requests.iter().map(|_| None).collect();

        let mut join_set = JoinSet::new();
        for (index, request) in requests.iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let request = request.clone();
            join_set.spawn(async move {
                let result = fetcher
                    .fetch_with_mode(&request.endpoint, request.mode)
                    .await
                    .map(|entities| tagging::tag(entities, &request.context));
                (index, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!(error = %e, "fetch task ended abnormally"),
            }
        }

        let outcomes: Vec<FetchOutcome> = requests
            .into_iter()
            .zip(slots)
            .map(|(request, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(ScrapeError::new(
                        ScrapeErrorKind::TaskFailed,
                        "Fetch task ended without a result",
                    )
                    .with_endpoint(request.endpoint.path()))
                });
                self.settle(request, result)
            })
            .collect();

        let failures = outcomes.iter().filter(|o| !o.is_success()).count();
        ScrapeHooks::on_batch_complete(outcomes.len(), failures, started.elapsed());

        BatchResult { outcomes }
    }

    /// Fetches a single request. Equivalent to a batch of one.
    pub async fn run_one(&self, request: FetchRequest) -> FetchOutcome {
        let result = self
            .fetcher
            .fetch_with_mode(&request.endpoint, request.mode)
            .await
            .map(|entities| tagging::tag(entities, &request.context));
        self.settle(request, result)
    }

    fn settle(&self, request: FetchRequest, result: Result<Vec<Entity>, ScrapeError>) -> FetchOutcome {
        match result {
            Ok(entities) => FetchOutcome {
                request,
                entities,
                failure: None,
            },
            Err(error) => {
                let endpoint = request.endpoint.path();
                let context = request.context.describe();
                if error.is_endpoint_empty() {
                    self.fetcher.metrics().record_endpoint_empty();
                    ScrapeHooks::on_endpoint_empty(&endpoint, &context, &error);
                } else {
                    ScrapeHooks::on_fetch_failed(&endpoint, &context, &error);
                }
                FetchOutcome {
                    request,
                    entities: Vec::new(),
                    failure: Some(error),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{DefaultBehavior, MockResponse, MockTransport};
    use crate::observability::Metrics;
    use crate::types::{ORGANIZATION, USER};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn scheduler(transport: &MockTransport) -> FanOutScheduler {
        let fetcher = PagedFetcher::new(Arc::new(transport.clone()), 100, Arc::new(Metrics::new()));
        FanOutScheduler::new(fetcher)
    }

    fn followers_of(user: &str) -> FetchRequest {
        FetchRequest::new(
            Endpoint::UserFollowers { user: user.into() },
            Context::organization("acme").with(USER, user),
        )
    }

    fn logins(outcome: &FetchOutcome) -> Vec<&str> {
        outcome.entities().iter().filter_map(|e| e.get_str("login")).collect()
    }

    #[tokio::test]
    async fn test_failure_is_isolated_from_siblings() {
        let transport = MockTransport::new();
        transport.on_list("/users/alice/followers", vec![json!([{"login": "x"}, {"login": "y"}])]);
        transport.on_page("/users/bob/followers", 1, MockResponse::error(500, "boom"));
        transport.on_list("/users/carol/followers", vec![json!([{"login": "z"}])]);

        let mut batch = FetchBatch::new();
        let alice = batch.push(followers_of("alice"));
        let bob = batch.push(followers_of("bob"));
        let carol = batch.push(followers_of("carol"));

        let result = scheduler(&transport).run(batch).await;

        assert_eq!(result.len(), 3);
        assert_eq!(logins(result.get(alice).unwrap()), vec!["x", "y"]);
        assert_eq!(logins(result.get(carol).unwrap()), vec!["z"]);
        let failed = result.get(bob).unwrap();
        assert!(failed.entities().is_empty());
        assert_eq!(failed.failure().unwrap().kind(), ScrapeErrorKind::ServerError);

        let failures = result.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].endpoint, "/users/bob/followers");
        assert_eq!(failures[0].context, "organization=acme user=bob");
    }

    #[tokio::test]
    async fn test_connection_failure_degrades_to_empty_result() {
        let transport = MockTransport::new();
        transport.on_list("/users/alice/followers", vec![json!([{"login": "x"}])]);
        transport.on_get("/users/bob/followers", MockResponse::connection_failed());
        transport.on_list("/users/carol/followers", vec![json!([{"login": "z"}])]);

        let batch: FetchBatch = ["alice", "bob", "carol"].into_iter().map(followers_of).collect();
        let scheduler = scheduler(&transport);
        let result = scheduler.run(batch).await;

        let outcomes: Vec<_> = result.iter().map(|(_, o)| o).collect();
        assert_eq!(logins(outcomes[0]), vec!["x"]);
        assert_eq!(logins(outcomes[2]), vec!["z"]);
        assert!(outcomes[1].entities().is_empty());
        let error = outcomes[1].failure().unwrap();
        assert_eq!(error.kind(), ScrapeErrorKind::ConnectionFailed);
        assert!(!error.is_endpoint_empty());
        assert!(!error.is_fatal());

        let failures = result.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, ScrapeErrorKind::ConnectionFailed);
        assert_eq!(failures[0].context, "organization=acme user=bob");
        assert_eq!(scheduler.fetcher().metrics().snapshot().endpoints_empty, 0);
    }

    #[tokio::test]
    async fn test_results_are_tagged_with_request_context() {
        let transport = MockTransport::new();
        transport.on_list("/users/alice/followers", vec![json!([{"login": "x"}])]);

        let mut batch = FetchBatch::new();
        let id = batch.push(followers_of("alice"));
        let result = scheduler(&transport).run(batch).await;

        let entity = &result.get(id).unwrap().entities()[0];
        assert_eq!(entity.get_str(ORGANIZATION), Some("acme"));
        assert_eq!(entity.get_str(USER), Some("alice"));
    }

    #[tokio::test]
    async fn test_requests_run_concurrently() {
        let transport = MockTransport::new();
        for user in ["a", "b", "c", "d"] {
            let path = format!("/users/{}/followers", user);
            transport.on_page(
                &path,
                1,
                MockResponse::ok(json!([{"login": "x"}])).with_delay(Duration::from_millis(200)),
            );
            transport.on_page(&path, 2, MockResponse::ok(json!([])));
        }

        let batch: FetchBatch = ["a", "b", "c", "d"].into_iter().map(followers_of).collect();
        let started = Instant::now();
        let result = scheduler(&transport).run(batch).await;

        assert!(result.iter().all(|(_, o)| o.is_success()));
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    #[tokio::test]
    async fn test_panicking_task_is_recorded_as_failure() {
        let transport = MockTransport::new().with_default_behavior(DefaultBehavior::Panic);
        transport.on_list("/users/alice/followers", vec![json!([{"login": "x"}])]);

        let mut batch = FetchBatch::new();
        let alice = batch.push(followers_of("alice"));
        let ghost = batch.push(followers_of("ghost"));
        let result = scheduler(&transport).run(batch).await;

        assert_eq!(logins(result.get(alice).unwrap()), vec!["x"]);
        let failure = result.get(ghost).unwrap().failure().unwrap();
        assert_eq!(failure.kind(), ScrapeErrorKind::TaskFailed);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let result = scheduler(&MockTransport::new()).run(FetchBatch::new()).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_run_one_degrades_to_empty() {
        let transport = MockTransport::new();
        transport.on_page("/users/alice/followers", 1, MockResponse::rate_limited());

        let outcome = scheduler(&transport).run_one(followers_of("alice")).await;
        assert!(outcome.entities().is_empty());
        assert_eq!(
            outcome.failure().map(|e| e.kind()),
            Some(ScrapeErrorKind::RateLimitExceeded)
        );
    }
}

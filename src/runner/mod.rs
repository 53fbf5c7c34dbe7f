//! Run orchestration.
//!
//! A run moves through `Idle -> MemberIndexLoading -> RepoIndexLoading ->
//! OperationsRunning -> Done`. Index loading states are entered only when a
//! selected operation reads that index.

use crate::errors::{ScrapeError, ScrapeErrorKind, ScrapeResult};
use crate::export::ExportSink;
use crate::index::IndexKind;
use crate::observability::MetricsSnapshot;
use crate::operations::{OperationKind, RunContext};
use crate::scheduler::FailureReport;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not started.
    Idle,
    /// Fetching organization members.
    MemberIndexLoading,
    /// Fetching organization repositories.
    RepoIndexLoading,
    /// Running the selected operations.
    OperationsRunning,
    /// Finished.
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::MemberIndexLoading => "member_index_loading",
            RunState::RepoIndexLoading => "repo_index_loading",
            RunState::OperationsRunning => "operations_running",
            RunState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Operations that ran, in run order.
    pub operations: Vec<OperationKind>,
    /// Every request that degraded to an empty result.
    pub failures: Vec<FailureReport>,
    /// Number of tables handed to the sink.
    pub tables_written: usize,
    /// Number of graphs handed to the sink.
    pub graphs_written: usize,
    /// States the run passed through.
    pub states: Vec<RunState>,
    /// Request counters at the end of the run.
    pub metrics: MetricsSnapshot,
}

impl RunReport {
    /// Returns true if every request succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives the selected operations against one context and sink.
pub struct Runner {
    context: RunContext,
    sink: Arc<dyn ExportSink>,
    state: RunState,
    states: Vec<RunState>,
}

impl Runner {
    /// Creates an idle runner.
    pub fn new(context: RunContext, sink: Arc<dyn ExportSink>) -> Self {
        Self {
            context,
            sink,
            state: RunState::Idle,
            states: vec![RunState::Idle],
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Gets the context.
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "run state changed");
        self.state = next;
        self.states.push(next);
    }

    /// Runs the selected operations.
    ///
    /// Each operation runs at most once, in [`OperationKind::ALL`] order.
    /// Failed requests are collected into the report; a failure to write an
    /// artifact aborts the run.
    pub async fn run(&mut self, selection: &[OperationKind]) -> ScrapeResult<RunReport> {
        let operations: BTreeSet<OperationKind> = selection.iter().copied().collect();
        if operations.is_empty() {
            return Err(ScrapeError::new(
                ScrapeErrorKind::NoOperationSelected,
                "No operation selected",
            ));
        }
        if self.state != RunState::Idle {
            return Err(ScrapeError::configuration(format!(
                "Runner cannot start from state {}",
                self.state
            )));
        }

        let started = Instant::now();
        let required: BTreeSet<IndexKind> = operations
            .iter()
            .flat_map(|kind| kind.required_indices().iter().copied())
            .collect();

        let mut failures = Vec::new();
        if required.contains(&IndexKind::Members) {
            self.transition(RunState::MemberIndexLoading);
            self.context.indices().get_or_load(IndexKind::Members).await;
            failures.extend(self.context.indices().take_failures());
        }
        if required.contains(&IndexKind::Repos) {
            self.transition(RunState::RepoIndexLoading);
            self.context.indices().get_or_load(IndexKind::Repos).await;
            failures.extend(self.context.indices().take_failures());
        }

        self.transition(RunState::OperationsRunning);
        let mut tables_written = 0;
        let mut graphs_written = 0;
        for kind in &operations {
            let output = kind.handler().run(&self.context).await;
            failures.extend(self.context.indices().take_failures());
            failures.extend(output.failures);

            for table in &output.tables {
                self.sink.write_table(table)?;
                tables_written += 1;
            }
            for graph in &output.graphs {
                self.sink.write_graph(graph)?;
                graphs_written += 1;
            }
        }
        self.transition(RunState::Done);

        let metrics = self.context.scheduler().fetcher().metrics().snapshot();
        info!(
            operations = operations.len(),
            failures = failures.len(),
            requests = metrics.requests_total,
            duration_ms = started.elapsed().as_millis() as u64,
            "Run complete"
        );

        Ok(RunReport {
            operations: operations.into_iter().collect(),
            failures,
            tables_written,
            graphs_written,
            states: self.states.clone(),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{MemorySink, MockExportSink};
    use crate::mocks::{DefaultBehavior, MockResponse, MockTransport};
    use crate::operations::test_support::{context, context_with_reuse};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn transport() -> MockTransport {
        let transport = MockTransport::new().with_default_behavior(DefaultBehavior::EmptyList);
        transport.on_list("/orgs/acme/members", vec![json!([{"login": "alice"}])]);
        transport.on_list("/orgs/acme/repos", vec![json!([{"name": "widgets", "full_name": "acme/widgets"}])]);
        transport
    }

    #[tokio::test]
    async fn test_no_operation_selected() {
        let mut runner = Runner::new(context(&transport(), &["acme"]), Arc::new(MemorySink::new()));
        let err = runner.run(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ScrapeErrorKind::NoOperationSelected);
        assert_eq!(runner.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn test_member_only_run_skips_repo_index() {
        let transport = transport();
        let mut runner = Runner::new(context(&transport, &["acme"]), Arc::new(MemorySink::new()));
        let report = runner.run(&[OperationKind::Starred]).await.unwrap();

        assert_eq!(
            report.states,
            vec![
                RunState::Idle,
                RunState::MemberIndexLoading,
                RunState::OperationsRunning,
                RunState::Done
            ]
        );
        assert!(transport.requests_for("/orgs/acme/repos").is_empty());
        assert_eq!(runner.state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_all_operations_share_indices() {
        let transport = transport();
        let sink = Arc::new(MemorySink::new());
        let mut runner = Runner::new(context(&transport, &["acme"]), sink.clone());
        let report = runner.run(&OperationKind::ALL).await.unwrap();

        assert_eq!(report.operations, OperationKind::ALL.to_vec());
        assert_eq!(
            report.states,
            vec![
                RunState::Idle,
                RunState::MemberIndexLoading,
                RunState::RepoIndexLoading,
                RunState::OperationsRunning,
                RunState::Done
            ]
        );
        assert_eq!(runner.context().indices().load_count(), 2);
        // one page of members plus the terminating empty page
        assert_eq!(transport.requests_for("/orgs/acme/members").len(), 2);
        assert_eq!(report.tables_written, 5);
        assert_eq!(report.graphs_written, 4);
        assert_eq!(
            sink.graph_names(),
            vec![
                "contributor_network",
                "full-follower-network",
                "narrow-follower-network",
                "membership_network"
            ]
        );
        // /users/alice is a single object; the empty list default is a decode error
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].endpoint, "/users/alice");
    }

    #[tokio::test]
    async fn test_index_fetched_once_without_reuse() {
        let transport = transport();
        transport.on_get("/orgs/ghost/members", MockResponse::not_found());
        let ctx = context_with_reuse(&transport, &["acme", "ghost"], false);
        let mut runner = Runner::new(ctx, Arc::new(MemorySink::new()));
        let report = runner.run(&[OperationKind::Starred]).await.unwrap();

        assert_eq!(runner.context().indices().load_count(), 1);
        assert_eq!(transport.requests_for("/orgs/acme/members").len(), 2);
        assert_eq!(transport.requests_for("/orgs/ghost/members").len(), 1);
        let endpoints: Vec<_> = report.failures.iter().map(|f| f.endpoint.as_str()).collect();
        assert_eq!(endpoints, vec!["/orgs/ghost/members"]);
    }

    #[tokio::test]
    async fn test_selection_is_deduplicated_and_ordered() {
        let mut runner = Runner::new(context(&transport(), &["acme"]), Arc::new(MemorySink::new()));
        let report = runner
            .run(&[OperationKind::Memberships, OperationKind::Repos, OperationKind::Memberships])
            .await
            .unwrap();
        assert_eq!(report.operations, vec![OperationKind::Repos, OperationKind::Memberships]);
    }

    #[tokio::test]
    async fn test_export_failure_aborts_run() {
        let mut sink = MockExportSink::new();
        sink.expect_write_table()
            .times(1)
            .returning(|table| Err(ScrapeError::io(
                std::path::Path::new(&format!("{}.csv", table.name())),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            )));
        sink.expect_write_graph().never();

        let mut runner = Runner::new(context(&transport(), &["acme"]), Arc::new(sink));
        let err = runner
            .run(&[OperationKind::Repos, OperationKind::Contributors])
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(err.message().contains("org_repositories.csv"));
        assert_eq!(runner.state(), RunState::OperationsRunning);
    }

    #[tokio::test]
    async fn test_runner_cannot_be_reused() {
        let mut runner = Runner::new(context(&transport(), &["acme"]), Arc::new(MemorySink::new()));
        runner.run(&[OperationKind::Repos]).await.unwrap();
        let err = runner.run(&[OperationKind::Repos]).await.unwrap_err();
        assert_eq!(err.kind(), ScrapeErrorKind::InvalidConfiguration);
    }
}

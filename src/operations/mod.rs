//! Scrape operations.
//!
//! Each [`OperationKind`] maps to one handler implementing [`Operation`].
//! Handlers declare the indices they read, build their fetch batches from
//! those indices and return the tables and graphs they assembled. Writing
//! the results out is left to the runner.

mod contributors;
mod members;
mod network;
mod repos;

pub use contributors::ContributorsOperation;
pub use members::{MemberInfosOperation, MemberReposOperation, StarredOperation};
pub use network::{FollowersOperation, MembershipsOperation};
pub use repos::ReposOperation;

use crate::auth::Credentials;
use crate::client::HttpTransport;
use crate::config::ScraperConfig;
use crate::errors::{ScrapeError, ScrapeErrorKind, ScrapeResult};
use crate::graph::Graph;
use crate::index::{IndexKind, Indices};
use crate::observability::Metrics;
use crate::pagination::PagedFetcher;
use crate::scheduler::{FailureReport, FanOutScheduler};
use crate::table::Table;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// The operations a run can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    /// Repositories of each organization.
    Repos,
    /// Contributors of each organization repository.
    Contributors,
    /// Repositories owned by each member.
    MemberRepos,
    /// Profile of each member.
    MemberInfos,
    /// Repositories starred by each member.
    Starred,
    /// Follower networks of the members.
    Followers,
    /// Organizations each member belongs to.
    Memberships,
}

impl OperationKind {
    /// Every operation, in run order.
    pub const ALL: [OperationKind; 7] = [
        OperationKind::Repos,
        OperationKind::Contributors,
        OperationKind::MemberRepos,
        OperationKind::MemberInfos,
        OperationKind::Starred,
        OperationKind::Followers,
        OperationKind::Memberships,
    ];

    /// Gets the handler for this operation.
    pub fn handler(&self) -> Box<dyn Operation> {
        match self {
            OperationKind::Repos => Box::new(ReposOperation),
            OperationKind::Contributors => Box::new(ContributorsOperation),
            OperationKind::MemberRepos => Box::new(MemberReposOperation),
            OperationKind::MemberInfos => Box::new(MemberInfosOperation),
            OperationKind::Starred => Box::new(StarredOperation),
            OperationKind::Followers => Box::new(FollowersOperation),
            OperationKind::Memberships => Box::new(MembershipsOperation),
        }
    }

    /// Indices the operation reads.
    pub fn required_indices(&self) -> &'static [IndexKind] {
        match self {
            OperationKind::Repos | OperationKind::Contributors => &[IndexKind::Repos],
            _ => &[IndexKind::Members],
        }
    }

    /// Short name, as used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Repos => "repos",
            OperationKind::Contributors => "contributors",
            OperationKind::MemberRepos => "member-repos",
            OperationKind::MemberInfos => "member-infos",
            OperationKind::Starred => "starred",
            OperationKind::Followers => "followers",
            OperationKind::Memberships => "memberships",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown operation: {}", s))
    }
}

/// Everything an operation may read during a run.
pub struct RunContext {
    scheduler: FanOutScheduler,
    indices: Indices,
}

impl RunContext {
    /// Creates a context for a set of organizations.
    pub fn new(scheduler: FanOutScheduler, organizations: Vec<String>, reuse_indices: bool) -> Self {
        let indices = Indices::new(scheduler.clone(), organizations, reuse_indices);
        Self { scheduler, indices }
    }

    /// Wires an HTTP transport, fetcher and scheduler for a live run.
    pub fn connect(
        config: &ScraperConfig,
        credentials: Credentials,
        organizations: Vec<String>,
        reuse_indices: bool,
    ) -> ScrapeResult<Self> {
        if organizations.is_empty() {
            return Err(ScrapeError::new(
                ScrapeErrorKind::MissingOrganizations,
                "No organizations to scrape",
            ));
        }
        debug!(
            user = credentials.username(),
            token = credentials.token_prefix(),
            organizations = organizations.len(),
            "Connecting to {}",
            config.base_url
        );
        let metrics = Arc::new(Metrics::new());
        let transport = HttpTransport::with_metrics(config.clone(), credentials, metrics.clone())?;
        let fetcher = PagedFetcher::new(Arc::new(transport), config.per_page, metrics);
        Ok(Self::new(FanOutScheduler::new(fetcher), organizations, reuse_indices))
    }

    /// Gets the scheduler.
    pub fn scheduler(&self) -> &FanOutScheduler {
        &self.scheduler
    }

    /// Gets the indices.
    pub fn indices(&self) -> &Indices {
        &self.indices
    }

    /// Gets the scraped organizations.
    pub fn organizations(&self) -> &[String] {
        self.indices.organizations()
    }
}

/// What an operation produced.
#[derive(Debug, Default)]
pub struct OperationOutput {
    /// Tables to export.
    pub tables: Vec<Table>,
    /// Graphs to export.
    pub graphs: Vec<Graph>,
    /// Requests that degraded to empty results.
    pub failures: Vec<FailureReport>,
}

/// A scrape operation.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Which operation this is.
    fn kind(&self) -> OperationKind;

    /// Indices the operation reads.
    fn required_indices(&self) -> &'static [IndexKind] {
        self.kind().required_indices()
    }

    /// Fetches and assembles the operation's output.
    async fn run(&self, ctx: &RunContext) -> OperationOutput;
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(OperationKind::Repos, IndexKind::Repos)]
    #[test_case(OperationKind::Contributors, IndexKind::Repos)]
    #[test_case(OperationKind::MemberRepos, IndexKind::Members)]
    #[test_case(OperationKind::MemberInfos, IndexKind::Members)]
    #[test_case(OperationKind::Starred, IndexKind::Members)]
    #[test_case(OperationKind::Followers, IndexKind::Members)]
    #[test_case(OperationKind::Memberships, IndexKind::Members)]
    fn test_required_indices(kind: OperationKind, index: IndexKind) {
        assert_eq!(kind.required_indices(), &[index]);
        assert_eq!(kind.handler().kind(), kind);
        assert_eq!(kind.handler().required_indices(), &[index]);
    }

    #[test]
    fn test_connect_requires_organizations() {
        let credentials = Credentials::new("octocat", "ghp_test").unwrap();
        let err = RunContext::connect(&ScraperConfig::default(), credentials, Vec::new(), true)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ScrapeErrorKind::MissingOrganizations);
    }

    #[test]
    fn test_connect_wires_organizations() {
        let credentials = Credentials::new("octocat", "github_pat_test").unwrap();
        assert_eq!(credentials.token_prefix(), "github_pat_***");
        let ctx = RunContext::connect(
            &ScraperConfig::default(),
            credentials,
            vec!["acme".to_string()],
            false,
        )
        .unwrap();
        assert_eq!(ctx.organizations(), &["acme".to_string()]);
        assert_eq!(ctx.indices().load_count(), 0);
    }

    #[test]
    fn test_names_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(kind.as_str().parse::<OperationKind>(), Ok(kind));
        }
        assert!("everything".parse::<OperationKind>().is_err());
    }
}

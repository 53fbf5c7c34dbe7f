use clap::Parser;
use org_scraper::observability::{LogFormat, LogLevel};
use org_scraper::OperationKind;
use std::path::PathBuf;

/// Command line of the `org-scraper` binary.
#[derive(Debug, Parser)]
#[command(
    name = "org-scraper",
    version,
    about = "Scrape repositories, contributors and member networks of GitHub organizations"
)]
pub struct Cli {
    /// Run every operation
    #[arg(short, long)]
    pub all: bool,

    /// Repositories of each organization
    #[arg(short, long)]
    pub repos: bool,

    /// Contributors of each organization repository, with contributor network
    #[arg(short, long)]
    pub contributors: bool,

    /// Repositories owned by each member
    #[arg(long)]
    pub member_repos: bool,

    /// Public profile of each member
    #[arg(long)]
    pub member_infos: bool,

    /// Repositories starred by each member
    #[arg(short, long)]
    pub starred: bool,

    /// Full and narrow follower networks of the members
    #[arg(short, long)]
    pub followers: bool,

    /// Network of the organizations each member belongs to
    #[arg(short, long)]
    pub memberships: bool,

    /// JSON file with `user_name` and `api_token`; falls back to GITHUB_USER / GITHUB_TOKEN
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// CSV file listing organizations in a `github_org_name` column
    #[arg(long, default_value = "organizations.csv")]
    pub organizations: PathBuf,

    /// Root directory for run output
    #[arg(long, default_value = "data")]
    pub output: PathBuf,

    /// API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Upper bound on requests in flight
    #[arg(long)]
    pub max_concurrent_requests: Option<usize>,

    /// Fetch member and repository lists anew for every operation
    #[arg(long)]
    pub no_index_reuse: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log format: pretty, json, compact
    #[arg(long, default_value = "compact")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Operations selected by the flags, in run order.
    pub fn operations(&self) -> Vec<OperationKind> {
        if self.all {
            return OperationKind::ALL.to_vec();
        }
        let flags = [
            (self.repos, OperationKind::Repos),
            (self.contributors, OperationKind::Contributors),
            (self.member_repos, OperationKind::MemberRepos),
            (self.member_infos, OperationKind::MemberInfos),
            (self.starred, OperationKind::Starred),
            (self.followers, OperationKind::Followers),
            (self.memberships, OperationKind::Memberships),
        ];
        flags
            .into_iter()
            .filter_map(|(selected, kind)| selected.then_some(kind))
            .collect()
    }

    /// Log level implied by `--verbose`.
    pub fn log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

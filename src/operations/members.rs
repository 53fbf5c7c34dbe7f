use super::{Operation, OperationKind, OperationOutput, RunContext};
use crate::index::MemberIndex;
use crate::scheduler::{FetchBatch, FetchRequest};
use crate::table::Table;
use crate::types::{Context, Endpoint, ORGANIZATION, USER};
use async_trait::async_trait;
use tracing::info;

/// Table name of the member repository list.
pub const MEMBER_REPOS_TABLE: &str = "members_repositories";
/// Table name of the member profiles.
pub const MEMBER_INFOS_TABLE: &str = "members_info";
/// Table name of the starred repository list.
pub const STARRED_TABLE: &str = "starred_repositories";

const MEMBER_REPOS_COLUMNS: &[&str] = &[
    ORGANIZATION,
    USER,
    "full_name",
    "fork",
    "stargazers_count",
    "forks_count",
    "language",
    "description",
];

const MEMBER_INFOS_COLUMNS: &[&str] = &[
    ORGANIZATION,
    "login",
    "name",
    "url",
    "type",
    "company",
    "blog",
    "location",
];

const STARRED_COLUMNS: &[&str] = &[
    ORGANIZATION,
    USER,
    "full_name",
    "html_url",
    "language",
    "description",
];

/// One request per `(organization, member)` pair.
fn per_member_batch<F>(index: &MemberIndex, tag_user: bool, endpoint: F) -> FetchBatch
where
    F: Fn(&str) -> Endpoint,
{
    let mut batch = FetchBatch::new();
    for (org, members) in index.iter() {
        for member in members {
            let mut context = Context::organization(org);
            if tag_user {
                context = context.with(USER, member.as_str());
            }
            batch.push(FetchRequest::new(endpoint(member), context));
        }
    }
    batch
}

async fn member_table<F>(
    ctx: &RunContext,
    name: &str,
    columns: &[&str],
    tag_user: bool,
    endpoint: F,
) -> OperationOutput
where
    F: Fn(&str) -> Endpoint + Send,
{
    let index = ctx.indices().members().await;
    let batch = per_member_batch(&index, tag_user, endpoint);
    let result = ctx.scheduler().run(batch).await;

    let mut table = Table::new(name, columns);
    for (_, outcome) in result.iter() {
        table.extend(outcome.entities());
    }

    OperationOutput {
        tables: vec![table],
        failures: result.failures(),
        ..Default::default()
    }
}

/// Lists the repositories owned by every member.
pub struct MemberReposOperation;

#[async_trait]
impl Operation for MemberReposOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::MemberRepos
    }

    async fn run(&self, ctx: &RunContext) -> OperationOutput {
        info!("Getting repositories of all members");
        member_table(ctx, MEMBER_REPOS_TABLE, MEMBER_REPOS_COLUMNS, true, |user| {
            Endpoint::UserRepos { user: user.to_string() }
        })
        .await
    }
}

/// Reads the public profile of every member.
pub struct MemberInfosOperation;

#[async_trait]
impl Operation for MemberInfosOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::MemberInfos
    }

    async fn run(&self, ctx: &RunContext) -> OperationOutput {
        info!("Getting user information of all members");
        member_table(ctx, MEMBER_INFOS_TABLE, MEMBER_INFOS_COLUMNS, false, |user| {
            Endpoint::User { user: user.to_string() }
        })
        .await
    }
}

/// Lists the repositories starred by every member.
pub struct StarredOperation;

#[async_trait]
impl Operation for StarredOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Starred
    }

    async fn run(&self, ctx: &RunContext) -> OperationOutput {
        info!("Getting repositories starred by members");
        member_table(ctx, STARRED_TABLE, STARRED_COLUMNS, true, |user| {
            Endpoint::UserStarred { user: user.to_string() }
        })
        .await
    }
}

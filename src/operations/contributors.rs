use super::{Operation, OperationKind, OperationOutput, RunContext};
use crate::graph::{attributes, Graph, NODE_TYPE_ATTR, ORGANIZATION_ATTR};
use crate::scheduler::{FetchBatch, FetchRequest};
use crate::table::Table;
use crate::types::{Context, Endpoint, Repository, ORGANIZATION, REPOSITORY};
use async_trait::async_trait;
use tracing::info;

/// Table name of the contributor list.
pub const CONTRIBUTORS_TABLE: &str = "contributor_list";
/// Graph name of the contributor network.
pub const CONTRIBUTORS_GRAPH: &str = "contributor_network";

const COLUMNS: &[&str] = &[
    ORGANIZATION,
    REPOSITORY,
    "login",
    "contributions",
    "html_url",
    "url",
];

/// Lists the contributors of every organization repository and links
/// each contributor to the repositories they contributed to.
pub struct ContributorsOperation;

#[async_trait]
impl Operation for ContributorsOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Contributors
    }

    async fn run(&self, ctx: &RunContext) -> OperationOutput {
        info!("Scraping contributors");
        let index = ctx.indices().repos().await;

        let mut graph = Graph::new(CONTRIBUTORS_GRAPH);
        let mut batch = FetchBatch::new();
        // repository node per request, in submission order
        let mut targets: Vec<(String, String)> = Vec::new();

        for (org, repos) in index.iter() {
            for repo in repos.iter().filter_map(|e| e.decode::<Repository>().ok()) {
                graph.add_node(
                    repo.key(),
                    attributes([(ORGANIZATION_ATTR, org), (NODE_TYPE_ATTR, "repository")]),
                );
                batch.push(FetchRequest::new(
                    Endpoint::RepoContributors {
                        owner: org.to_string(),
                        repo: repo.name.clone(),
                    },
                    Context::organization(org).with(REPOSITORY, repo.name.as_str()),
                ));
                targets.push((org.to_string(), repo.key().to_string()));
            }
        }

        let result = ctx.scheduler().run(batch).await;
        let failures = result.failures();

        let mut table = Table::new(CONTRIBUTORS_TABLE, COLUMNS);
        for ((org, repo_key), outcome) in targets.iter().zip(result.into_outcomes()) {
            for contributor in outcome.entities() {
                if let Some(login) = contributor.get_str("login") {
                    graph.add_edge(login, repo_key, attributes([(ORGANIZATION_ATTR, org.as_str())]));
                }
            }
            table.extend(outcome.entities());
        }

        OperationOutput {
            tables: vec![table],
            graphs: vec![graph],
            failures,
        }
    }
}

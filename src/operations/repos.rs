use super::{Operation, OperationKind, OperationOutput, RunContext};
use crate::table::Table;
use async_trait::async_trait;
use tracing::info;

/// Table name of the organization repository list.
pub const REPOS_TABLE: &str = "org_repositories";

const COLUMNS: &[&str] = &[
    "organization",
    "name",
    "full_name",
    "stargazers_count",
    "language",
    "created_at",
    "updated_at",
    "homepage",
    "fork",
    "description",
];

/// Lists the repositories of every organization.
pub struct ReposOperation;

#[async_trait]
impl Operation for ReposOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Repos
    }

    async fn run(&self, ctx: &RunContext) -> OperationOutput {
        info!("Scraping repositories");
        let index = ctx.indices().repos().await;

        let mut table = Table::new(REPOS_TABLE, COLUMNS);
        for (_, repos) in index.iter() {
            table.extend(repos);
        }

        OperationOutput {
            tables: vec![table],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTransport;
    use crate::operations::test_support::context;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_repos_table() {
        let transport = MockTransport::new();
        transport.on_list(
            "/orgs/acme/repos",
            vec![json!([
                {"name": "widgets", "full_name": "acme/widgets", "fork": false, "stargazers_count": 5, "owner": {"login": "acme"}},
                {"name": "gadgets", "full_name": "acme/gadgets", "fork": true, "language": "Rust"}
            ])],
        );
        transport.on_list("/orgs/globex/repos", vec![json!([{"name": "tools"}])]);

        let ctx = context(&transport, &["acme", "globex"]);
        let output = ReposOperation.run(&ctx).await;

        let table = &output.tables[0];
        assert_eq!(table.name(), REPOS_TABLE);
        assert_eq!(table.columns().len(), COLUMNS.len());
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, "organization"), Some("acme"));
        assert_eq!(table.cell(0, "stargazers_count"), Some("5"));
        assert_eq!(table.cell(1, "fork"), Some("true"));
        assert_eq!(table.cell(1, "language"), Some("Rust"));
        assert_eq!(table.cell(2, "organization"), Some("globex"));
        assert_eq!(table.cell(2, "homepage"), Some(""));
        assert!(output.graphs.is_empty());
    }
}

use super::{Operation, OperationKind, OperationOutput, RunContext};
use crate::graph::{attributes, Gate, Graph, NetworkGraphs, NODE_TYPE_ATTR, ORGANIZATION_ATTR};
use crate::index::MemberIndex;
use crate::scheduler::{FetchBatch, FetchRequest};
use crate::types::{Context, Endpoint, USER};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

/// Graph name of the full follower network.
pub const FULL_FOLLOWER_GRAPH: &str = "full-follower-network";
/// Graph name of the follower network restricted to members.
pub const NARROW_FOLLOWER_GRAPH: &str = "narrow-follower-network";
/// Graph name of the membership network.
pub const MEMBERSHIP_GRAPH: &str = "membership_network";

#[derive(Debug, Clone, Copy)]
enum Direction {
    Followers,
    Following,
}

/// Builds the follower networks of the members.
///
/// The full graph holds every follower and following relation of every
/// member. The narrow graph keeps only the relations whose other endpoint
/// is itself a member of one of the scraped organizations.
pub struct FollowersOperation;

#[async_trait]
impl Operation for FollowersOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Followers
    }

    async fn run(&self, ctx: &RunContext) -> OperationOutput {
        info!("Generating follower networks");
        let index = ctx.indices().members().await;
        let mut graphs = NetworkGraphs::new(FULL_FOLLOWER_GRAPH, NARROW_FOLLOWER_GRAPH, index.all_logins());

        for (org, members) in index.iter() {
            for member in members {
                graphs.add_node(member, attributes([(ORGANIZATION_ATTR, org)]));
            }
        }

        let mut batch = FetchBatch::new();
        let mut targets = Vec::new();
        for (member, org) in subjects(&index) {
            let context = Context::organization(org).with(USER, member);
            batch.push(FetchRequest::new(
                Endpoint::UserFollowers { user: member.to_string() },
                context.clone(),
            ));
            targets.push((org, member, Direction::Followers));
            batch.push(FetchRequest::new(
                Endpoint::UserFollowing { user: member.to_string() },
                context,
            ));
            targets.push((org, member, Direction::Following));
        }

        let result = ctx.scheduler().run(batch).await;
        let failures = result.failures();

        for ((org, member, direction), outcome) in targets.into_iter().zip(result.into_outcomes()) {
            for other in outcome.entities().iter().filter_map(|e| e.get_str("login")) {
                let attrs = attributes([(ORGANIZATION_ATTR, org)]);
                match direction {
                    Direction::Followers => graphs.add_edge_gated(other, member, attrs, Gate::From),
                    Direction::Following => graphs.add_edge_gated(member, other, attrs, Gate::To),
                };
            }
        }

        let (full, narrow) = graphs.into_graphs();
        OperationOutput {
            graphs: vec![full, narrow],
            failures,
            ..Default::default()
        }
    }
}

/// Links every member to the organizations they belong to.
pub struct MembershipsOperation;

#[async_trait]
impl Operation for MembershipsOperation {
    fn kind(&self) -> OperationKind {
        OperationKind::Memberships
    }

    async fn run(&self, ctx: &RunContext) -> OperationOutput {
        info!("Generating network of memberships");
        let index = ctx.indices().members().await;
        let mut graph = Graph::new(MEMBERSHIP_GRAPH);

        let mut batch = FetchBatch::new();
        let mut targets = Vec::new();
        for (member, org) in subjects(&index) {
            graph.add_node(member, attributes([(NODE_TYPE_ATTR, "user")]));
            batch.push(FetchRequest::new(
                Endpoint::UserOrgs { user: member.to_string() },
                Context::organization(org).with(USER, member),
            ));
            targets.push((org, member));
        }

        let result = ctx.scheduler().run(batch).await;
        let failures = result.failures();

        for ((org, member), outcome) in targets.into_iter().zip(result.into_outcomes()) {
            for membership in outcome.entities().iter().filter_map(|e| e.get_str("login")) {
                graph.add_node(membership, attributes([(NODE_TYPE_ATTR, "organization")]));
                graph.add_edge(member, membership, attributes([(ORGANIZATION_ATTR, org)]));
            }
        }

        OperationOutput {
            graphs: vec![graph],
            failures,
            ..Default::default()
        }
    }
}

/// Each member once, paired with the last scraped organization listing them.
fn subjects(index: &MemberIndex) -> Vec<(&str, &str)> {
    let mut subjects: Vec<(&str, &str)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (org, members) in index.iter() {
        for member in members {
            match positions.get(member.as_str()) {
                Some(&position) => subjects[position].1 = org,
                None => {
                    positions.insert(member, subjects.len());
                    subjects.push((member, org));
                }
            }
        }
    }
    subjects
}

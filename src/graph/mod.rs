//! Directed graphs assembled from scraped relations.
//!
//! Graphs are simple digraphs keyed by node id: a repeated `(from, to)` edge
//! collapses into one edge carrying the latest attributes, and self-loops
//! are kept. Adding an edge creates missing endpoints with no attributes;
//! attributes set through [`Graph::add_node`] are never replaced by such
//! implicit creation.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Node or edge attributes.
pub type Attributes = BTreeMap<String, String>;

/// Attribute key for the scraped organization.
pub const ORGANIZATION_ATTR: &str = "organization";
/// Attribute key for the kind of node.
pub const NODE_TYPE_ATTR: &str = "node_type";

/// Builds an attribute map from pairs.
pub fn attributes<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// Node id (login, repository full name or organization).
    pub id: String,
    /// Attributes.
    pub attributes: Attributes,
    explicit: bool,
}

impl GraphNode {
    /// Returns true if the node was added through [`Graph::add_node`].
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }
}

/// A borrowed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeView<'a> {
    /// Source node id.
    pub from: &'a str,
    /// Target node id.
    pub to: &'a str,
    /// Edge attributes.
    pub attributes: &'a Attributes,
}

/// Simple directed graph with string node ids.
#[derive(Debug, Clone)]
pub struct Graph {
    name: String,
    inner: DiGraph<GraphNode, Attributes>,
    id_to_index: HashMap<String, NodeIndex>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: DiGraph::new(),
            id_to_index: HashMap::new(),
        }
    }

    /// Gets the graph name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a node or updates its attributes.
    ///
    /// Each given attribute replaces the stored value for its key; other
    /// keys are left alone.
    pub fn add_node(&mut self, id: &str, attrs: Attributes) {
        let index = self.ensure_node(id);
        let node = &mut self.inner[index];
        node.explicit = true;
        node.attributes.extend(attrs);
    }

    /// Adds an edge, creating missing endpoints.
    ///
    /// An existing `(from, to)` edge keeps its position and takes the new
    /// attributes.
    pub fn add_edge(&mut self, from: &str, to: &str, attrs: Attributes) {
        let a = self.ensure_node(from);
        let b = self.ensure_node(to);
        self.inner.update_edge(a, b, attrs);
    }

    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(index) = self.id_to_index.get(id) {
            return *index;
        }
        let index = self.inner.add_node(GraphNode {
            id: id.to_string(),
            attributes: Attributes::new(),
            explicit: false,
        });
        self.id_to_index.insert(id.to_string(), index);
        index
    }

    /// Gets a node.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.id_to_index.get(id).map(|index| &self.inner[*index])
    }

    /// Returns true if the node exists.
    pub fn has_node(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    /// Gets the attributes of an edge.
    pub fn edge(&self, from: &str, to: &str) -> Option<&Attributes> {
        let a = *self.id_to_index.get(from)?;
        let b = *self.id_to_index.get(to)?;
        self.inner.find_edge(a, b).map(|e| &self.inner[e])
    }

    /// Returns true if the edge exists.
    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edge(from, to).is_some()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterates over nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.inner.raw_nodes().iter().map(|n| &n.weight)
    }

    /// Iterates over edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> {
        self.inner.raw_edges().iter().map(move |e| EdgeView {
            from: &self.inner[e.source()].id,
            to: &self.inner[e.target()].id,
            attributes: &e.weight,
        })
    }

    /// All node attribute keys in use.
    pub fn node_attribute_keys(&self) -> BTreeSet<&str> {
        self.nodes()
            .flat_map(|n| n.attributes.keys().map(String::as_str))
            .collect()
    }

    /// All edge attribute keys in use.
    pub fn edge_attribute_keys(&self) -> BTreeSet<&str> {
        self.inner
            .raw_edges()
            .iter()
            .flat_map(|e| e.weight.keys().map(String::as_str))
            .collect()
    }
}

/// Which endpoint of an edge the narrow graph checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// The source node must be allowed.
    From,
    /// The target node must be allowed.
    To,
}

/// A full graph and its narrow counterpart.
///
/// Both graphs receive every explicitly added node. The narrow graph takes
/// only the edges whose gated endpoint is in the allowed set, so endpoints
/// created implicitly by rejected edges exist in the full graph alone.
#[derive(Debug, Clone)]
pub struct NetworkGraphs {
    full: Graph,
    narrow: Graph,
    allowed: HashSet<String>,
}

impl NetworkGraphs {
    /// Creates an empty pair.
    pub fn new(
        full_name: impl Into<String>,
        narrow_name: impl Into<String>,
        allowed: HashSet<String>,
    ) -> Self {
        Self {
            full: Graph::new(full_name),
            narrow: Graph::new(narrow_name),
            allowed,
        }
    }

    /// Adds a node to both graphs.
    pub fn add_node(&mut self, id: &str, attrs: Attributes) {
        self.narrow.add_node(id, attrs.clone());
        self.full.add_node(id, attrs);
    }

    /// Adds an edge to the full graph, and to the narrow graph if the gated
    /// endpoint is allowed. Returns true if the narrow graph took the edge.
    pub fn add_edge_gated(&mut self, from: &str, to: &str, attrs: Attributes, gate: Gate) -> bool {
        let gated = match gate {
            Gate::From => from,
            Gate::To => to,
        };
        let admitted = self.allowed.contains(gated);
        if admitted {
            self.narrow.add_edge(from, to, attrs.clone());
        }
        self.full.add_edge(from, to, attrs);
        admitted
    }

    /// Gets the full graph.
    pub fn full(&self) -> &Graph {
        &self.full
    }

    /// Gets the narrow graph.
    pub fn narrow(&self) -> &Graph {
        &self.narrow
    }

    /// Splits into `(full, narrow)`.
    pub fn into_graphs(self) -> (Graph, Graph) {
        (self.full, self.narrow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn org(name: &str) -> Attributes {
        attributes([(ORGANIZATION_ATTR, name)])
    }

    #[test]
    fn test_add_edge_creates_implicit_nodes() {
        let mut graph = Graph::new("g");
        graph.add_edge("alice", "bob", org("acme"));

        assert_eq!(graph.node_count(), 2);
        let bob = graph.node("bob").unwrap();
        assert!(!bob.is_explicit());
        assert!(bob.attributes.is_empty());
        assert_eq!(graph.edge("alice", "bob"), Some(&org("acme")));
        assert!(!graph.has_edge("bob", "alice"));
    }

    #[test]
    fn test_explicit_attributes_survive_implicit_creation() {
        let mut graph = Graph::new("g");
        graph.add_node("alice", org("acme"));
        graph.add_edge("bob", "alice", org("other"));

        assert_eq!(graph.node("alice").unwrap().attributes, org("acme"));
        assert!(graph.node("alice").unwrap().is_explicit());
    }

    #[test]
    fn test_node_attributes_last_write_wins() {
        let mut graph = Graph::new("g");
        graph.add_node("alice", org("acme"));
        graph.add_node("alice", org("acme"));
        assert_eq!(graph.node_count(), 1);

        graph.add_node("alice", attributes([(ORGANIZATION_ATTR, "globex"), (NODE_TYPE_ATTR, "user")]));
        let alice = graph.node("alice").unwrap();
        assert_eq!(alice.attributes.get(ORGANIZATION_ATTR).map(String::as_str), Some("globex"));
        assert_eq!(alice.attributes.get(NODE_TYPE_ATTR).map(String::as_str), Some("user"));
    }

    #[test]
    fn test_repeated_edge_collapses_with_latest_attributes() {
        let mut graph = Graph::new("g");
        graph.add_edge("alice", "bob", org("acme"));
        graph.add_edge("carol", "bob", org("acme"));
        graph.add_edge("alice", "bob", org("globex"));

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge("alice", "bob"), Some(&org("globex")));
        let order: Vec<_> = graph.edges().map(|e| (e.from, e.to)).collect();
        assert_eq!(order, vec![("alice", "bob"), ("carol", "bob")]);
    }

    #[test]
    fn test_self_loops_are_kept() {
        let mut graph = Graph::new("g");
        graph.add_edge("alice", "alice", org("acme"));
        assert_eq!(graph.node_count(), 1);
        assert!(graph.has_edge("alice", "alice"));
    }

    #[test]
    fn test_attribute_keys() {
        let mut graph = Graph::new("g");
        graph.add_node("acme", attributes([(NODE_TYPE_ATTR, "organization")]));
        graph.add_node("alice", org("acme"));
        graph.add_edge("alice", "acme", org("acme"));

        let node_keys: Vec<_> = graph.node_attribute_keys().into_iter().collect();
        assert_eq!(node_keys, vec![NODE_TYPE_ATTR, ORGANIZATION_ATTR]);
        let edge_keys: Vec<_> = graph.edge_attribute_keys().into_iter().collect();
        assert_eq!(edge_keys, vec![ORGANIZATION_ATTR]);
    }

    #[test]
    fn test_narrow_graph_holds_only_allowed_edges() {
        let allowed: HashSet<String> = ["alice", "bob"].iter().map(|s| s.to_string()).collect();
        let mut graphs = NetworkGraphs::new("full", "narrow", allowed.clone());
        graphs.add_node("alice", org("acme"));

        // alice is the subject; the other endpoint is gated
        assert!(graphs.add_edge_gated("bob", "alice", org("acme"), Gate::From));
        assert!(!graphs.add_edge_gated("mallory", "alice", org("acme"), Gate::From));
        assert!(graphs.add_edge_gated("alice", "bob", org("acme"), Gate::To));
        assert!(!graphs.add_edge_gated("alice", "eve", org("acme"), Gate::To));

        let (full, narrow) = graphs.into_graphs();
        assert_eq!(full.edge_count(), 4);
        for edge in full.edges() {
            let expected = allowed.contains(edge.from) && allowed.contains(edge.to);
            assert_eq!(narrow.has_edge(edge.from, edge.to), expected);
        }
        for edge in narrow.edges() {
            assert!(full.has_edge(edge.from, edge.to));
        }
        assert!(narrow.node("alice").unwrap().is_explicit());
        assert!(full.has_node("mallory"));
        assert!(!narrow.has_node("mallory"));
        assert!(!narrow.has_node("eve"));
    }
}

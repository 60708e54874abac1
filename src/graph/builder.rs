use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use super::types::{Edge, TokenKey};

/// Directed graph of swap/bridge edges between (token, chain) vertices.
///
/// Vertices are interned to compact `NodeIndex` ids on first mention so the
/// solvers can use dense per-call arrays; the external contract stays keyed
/// by [`TokenKey`] strings.
pub struct RouteGraph {
    graph: DiGraph<TokenKey, Edge>,
    key_to_node: HashMap<TokenKey, NodeIndex>,
}

impl Default for RouteGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteGraph {
    /// Create a new empty route graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            key_to_node: HashMap::new(),
        }
    }

    /// Get or create a node for a token key
    fn get_or_create_node(&mut self, key: &TokenKey) -> NodeIndex {
        if let Some(&node) = self.key_to_node.get(key) {
            node
        } else {
            let node = self.graph.add_node(key.clone());
            self.key_to_node.insert(key.clone(), node);
            node
        }
    }

    /// Add a directed edge from `from` to `edge.target`.
    ///
    /// Degenerate rates (zero, negative, non-finite) are kept; their weight
    /// clamps to `f64::MAX / 2` so the edge is effectively unusable without
    /// poisoning arithmetic. Negative gas is clamped to zero.
    pub fn add_edge(&mut self, from: TokenKey, mut edge: Edge) {
        if !(edge.rate > 0.0 && edge.rate.is_finite()) {
            tracing::warn!(
                "Edge {} -> {} has unusable rate {}; keeping it with clamped weight",
                from,
                edge.target,
                edge.rate
            );
        }
        if edge.gas < 0.0 || !edge.gas.is_finite() {
            tracing::warn!(
                "Edge {} -> {} has invalid gas {}; clamping to 0",
                from,
                edge.target,
                edge.gas
            );
            edge.gas = 0.0;
        }

        let from_node = self.get_or_create_node(&from);
        let to_node = self.get_or_create_node(&edge.target.clone());
        self.graph.add_edge(from_node, to_node, edge);
    }

    /// Register a vertex without any edges. Tokens mentioned by edges are
    /// interned automatically; this is only needed for isolated vertices.
    pub fn add_token(&mut self, key: TokenKey) {
        self.get_or_create_node(&key);
    }

    /// Convenience: add an intra-chain swap edge
    pub fn add_swap(&mut self, from: TokenKey, to: TokenKey, rate: f64, gas: f64, dex: &str) {
        self.add_edge(from, Edge::swap(to, rate, gas, dex));
    }

    /// Convenience: add a cross-chain bridge edge
    pub fn add_bridge(&mut self, from: TokenKey, to: TokenKey, rate: f64, gas: f64, fee: f64) {
        self.add_edge(from, Edge::bridge(to, rate, gas, fee));
    }

    /// Get the node index for a token key
    pub fn node(&self, key: &TokenKey) -> Option<NodeIndex> {
        self.key_to_node.get(key).copied()
    }

    /// Get the token key for a node index
    pub fn key(&self, node: NodeIndex) -> Option<&TokenKey> {
        self.graph.node_weight(node)
    }

    /// Number of vertices in the graph
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate outgoing edges of a node as `(target, edge)` pairs
    pub fn out_edges(&self, node: NodeIndex) -> impl Iterator<Item = (NodeIndex, &Edge)> {
        self.graph.edges(node).map(|e| (e.target(), e.weight()))
    }

    /// Whether any edge in the graph has a negative weight (rate above 1
    /// outweighing its gas). Solvers use this to decide if early-exit
    /// shortcuts are sound.
    pub fn has_negative_weight(&self) -> bool {
        self.graph.edge_weights().any(|e| e.weight() < 0.0)
    }

    /// The earliest-inserted edge from `a` to `b`, if any.
    ///
    /// Route reconstruction reports the first matching adjacency entry for
    /// each hop, even when a later parallel edge carried the better rate.
    /// petgraph iterates parallel edges newest-first, so the earliest
    /// inserted one is the last yielded.
    pub fn first_edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<&Edge> {
        self.graph.edges_connecting(a, b).map(|e| e.weight()).last()
    }
}

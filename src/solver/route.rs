use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::graph::{EdgeKind, RouteGraph, TokenKey};

/// Provenance for one hop, taken from the first matching adjacency entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDetails {
    pub rate: f64,
    pub gas: f64,
    pub bridge_fee: Option<f64>,
    pub dex: Option<String>,
    pub pool_address: Option<String>,
}

/// One hop of a computed route.
///
/// `weight` is the edge weight the solver actually relaxed (the distance
/// delta along the path). `details` comes from the first adjacency entry
/// matching the hop's endpoints, which can be a different parallel edge
/// than the one that won the relaxation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStep {
    pub from: TokenKey,
    pub to: TokenKey,
    pub weight: f64,
    pub kind: EdgeKind,
    pub details: StepDetails,
}

/// A complete route from source to target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResult {
    pub path: Vec<TokenKey>,
    pub total_weight: f64,
    pub estimated_output: f64,
    pub steps: Vec<RouteStep>,
}

impl RouteResult {
    /// The zero-hop route for `source == target`
    pub fn trivial(key: TokenKey) -> Self {
        Self {
            path: vec![key],
            total_weight: 0.0,
            estimated_output: 1.0,
            steps: Vec::new(),
        }
    }

    /// Number of hops in the route
    pub fn hop_count(&self) -> usize {
        self.steps.len()
    }

    /// Total gas penalty across all hops
    pub fn total_gas(&self) -> f64 {
        self.steps.iter().map(|s| s.details.gas).sum()
    }

    /// Get a formatted string of the token path
    pub fn token_path(&self) -> String {
        self.path
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Walk the predecessor chain from `target` back to `source` and build the
/// route. `dist` and `prev` are the solver's final per-node arrays.
///
/// Returns `None` when the chain does not reach the source within
/// `node_count` hops, which only happens on graphs containing a negative
/// cycle (an arbitrage loop) that corrupted the predecessor relation.
pub(crate) fn assemble_route(
    graph: &RouteGraph,
    dist: &[f64],
    prev: &[Option<NodeIndex>],
    source: NodeIndex,
    target: NodeIndex,
) -> Option<RouteResult> {
    let mut nodes = vec![target];
    let mut current = target;
    while current != source {
        if nodes.len() > graph.node_count() {
            return None;
        }
        let predecessor = prev[current.index()]?;
        nodes.push(predecessor);
        current = predecessor;
    }
    nodes.reverse();

    let mut steps = Vec::with_capacity(nodes.len().saturating_sub(1));
    for pair in nodes.windows(2) {
        let (u, v) = (pair[0], pair[1]);
        let edge = graph
            .first_edge_between(u, v)
            .expect("path hop has a matching edge");
        let from = graph.key(u).expect("node has a key").clone();
        let to = graph.key(v).expect("node has a key").clone();
        steps.push(RouteStep {
            from,
            to,
            weight: dist[v.index()] - dist[u.index()],
            kind: edge.kind,
            details: StepDetails {
                rate: edge.rate,
                gas: edge.gas,
                bridge_fee: edge.bridge_fee,
                dex: edge.dex.clone(),
                pool_address: edge.pool_address.clone(),
            },
        });
    }

    let total_weight = dist[target.index()];
    Some(RouteResult {
        path: nodes
            .iter()
            .map(|&n| graph.key(n).expect("node has a key").clone())
            .collect(),
        total_weight,
        estimated_output: (-total_weight).exp(),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WEIGHT_TOLERANCE;

    fn chain_graph() -> RouteGraph {
        let mut g = RouteGraph::new();
        g.add_swap(
            TokenKey::new("A", "c"),
            TokenKey::new("B", "c"),
            2.0,
            0.0,
            "dex",
        );
        g.add_swap(
            TokenKey::new("B", "c"),
            TokenKey::new("C", "c"),
            3.0,
            0.0,
            "dex",
        );
        g
    }

    #[test]
    fn test_assemble_walks_predecessors() {
        let g = chain_graph();
        let a = g.node(&TokenKey::new("A", "c")).expect("node");
        let b = g.node(&TokenKey::new("B", "c")).expect("node");
        let c = g.node(&TokenKey::new("C", "c")).expect("node");

        let w_ab = -(2.0f64).ln();
        let w_bc = -(3.0f64).ln();
        let mut dist = vec![f64::INFINITY; 3];
        let mut prev = vec![None; 3];
        dist[a.index()] = 0.0;
        dist[b.index()] = w_ab;
        dist[c.index()] = w_ab + w_bc;
        prev[b.index()] = Some(a);
        prev[c.index()] = Some(b);

        let route = assemble_route(&g, &dist, &prev, a, c).expect("chain is consistent");
        assert_eq!(route.path.len(), 3);
        assert_eq!(route.steps.len(), route.path.len() - 1);
        assert_eq!(route.path[0], TokenKey::new("A", "c"));
        assert_eq!(route.path[2], TokenKey::new("C", "c"));

        // Step weights must sum to the total weight
        let sum: f64 = route.steps.iter().map(|s| s.weight).sum();
        let tolerance = WEIGHT_TOLERANCE * route.total_weight.abs().max(1.0);
        assert!((sum - route.total_weight).abs() <= tolerance);

        // Output-weight duality
        let expected_output = (-route.total_weight).exp();
        assert!((route.estimated_output - expected_output).abs() <= 1e-12);
        assert!((route.estimated_output - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_trivial_route() {
        let route = RouteResult::trivial(TokenKey::new("A", "c"));
        assert_eq!(route.path.len(), 1);
        assert_eq!(route.total_weight, 0.0);
        assert_eq!(route.estimated_output, 1.0);
        assert!(route.steps.is_empty());
        assert_eq!(route.hop_count(), 0);
    }
}

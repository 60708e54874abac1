use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::heap::MinHeap;
use super::route::{assemble_route, RouteResult};
use super::RouteError;
use crate::graph::{RouteGraph, TokenKey};

/// Counters reported by the classic solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassicMetrics {
    pub execution_time_ms: f64,
    pub gas_estimate: f64,
    pub visited_nodes: usize,
    pub path_length: usize,
    pub heap_operations: u64,
}

/// Route plus metrics from one classic solve
#[derive(Debug, Clone)]
pub struct ClassicOutcome {
    pub route: RouteResult,
    pub metrics: ClassicMetrics,
}

/// Single-source shortest path with a hop cap, over `-ln(rate) + gas`
/// edge weights.
///
/// Standard Dijkstra over an indexed min-heap with decrease-key, except that
/// a vertex whose distance improves after it was expanded is re-inserted and
/// expanded again, so corrections through negative-weight edges (any rate
/// above 1) reach its successors. Every improvement must stay within the
/// hop cap, which bounds the re-expansion to hop-limited walks and keeps
/// the loop finite even around profitable cycles. A vertex at the hop cap
/// is settled but not relaxed, so no returned route exceeds the cap. The
/// early exit on reaching the target is taken only when every edge weight
/// is nonnegative: with rates above 1 a later, longer prefix can still
/// improve the target's distance.
pub fn classic_dijkstra(
    graph: &RouteGraph,
    source: &TokenKey,
    target: &TokenKey,
    max_hops: usize,
) -> Result<ClassicOutcome, RouteError> {
    let started = Instant::now();

    let source_node = graph.node(source).ok_or_else(|| RouteError::InvalidInput {
        key: source.clone(),
    })?;
    let target_node = graph.node(target).ok_or_else(|| RouteError::InvalidInput {
        key: target.clone(),
    })?;

    if source_node == target_node {
        return Ok(ClassicOutcome {
            route: RouteResult::trivial(source.clone()),
            metrics: ClassicMetrics {
                execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                gas_estimate: 0.0,
                visited_nodes: 0,
                path_length: 0,
                heap_operations: 0,
            },
        });
    }

    info!(
        "Classic solve {} -> {} (max {} hops, {} nodes, {} edges)",
        source,
        target,
        max_hops,
        graph.node_count(),
        graph.edge_count()
    );

    let n = graph.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut prev = vec![None; n];
    let mut hops = vec![usize::MAX; n];
    let mut visited = vec![false; n];
    let mut visited_count = 0usize;

    dist[source_node.index()] = 0.0;
    hops[source_node.index()] = 0;

    let mut heap = MinHeap::with_capacity(n);
    heap.insert(source_node, 0.0);

    let stop_at_target = !graph.has_negative_weight();

    while let Some((u, du)) = heap.extract_min() {
        if du > dist[u.index()] {
            continue; // stale entry
        }
        if u == target_node && stop_at_target {
            break;
        }
        if !visited[u.index()] {
            visited[u.index()] = true;
            visited_count += 1;
        }

        if hops[u.index()] >= max_hops {
            continue;
        }

        for (v, edge) in graph.out_edges(u) {
            if v == u {
                continue; // self-loops never belong on a route
            }
            let candidate = du + edge.weight();
            let hop_candidate = hops[u.index()] + 1;
            if candidate < dist[v.index()] && hop_candidate <= max_hops {
                dist[v.index()] = candidate;
                prev[v.index()] = Some(u);
                hops[v.index()] = hop_candidate;
                heap.decrease_key(v, candidate);
            }
        }
    }

    if dist[target_node.index()].is_infinite() {
        debug!("No route {} -> {} within {} hops", source, target, max_hops);
        return Err(RouteError::NoRouteFound {
            source: source.clone(),
            target: target.clone(),
        });
    }

    let Some(route) = assemble_route(graph, &dist, &prev, source_node, target_node) else {
        warn!(
            "Predecessor chain {} -> {} is inconsistent; graph contains an arbitrage cycle",
            source, target
        );
        return Err(RouteError::NoRouteFound {
            source: source.clone(),
            target: target.clone(),
        });
    };
    let metrics = ClassicMetrics {
        execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        gas_estimate: route.total_gas(),
        visited_nodes: visited_count,
        path_length: route.hop_count(),
        heap_operations: heap.operations(),
    };

    info!(
        "Classic route found: {} | weight {:.4} | output {:.4} | {} visited",
        route.token_path(),
        route.total_weight,
        route.estimated_output,
        metrics.visited_nodes
    );

    Ok(ClassicOutcome { route, metrics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_HOPS;

    fn key(symbol: &str) -> TokenKey {
        TokenKey::new(symbol, "test")
    }

    /// A -> B -> C -> D with rates 2, 3, 5
    fn linear_chain() -> RouteGraph {
        let mut g = RouteGraph::new();
        g.add_swap(key("A"), key("B"), 2.0, 0.0, "dex");
        g.add_swap(key("B"), key("C"), 3.0, 0.0, "dex");
        g.add_swap(key("C"), key("D"), 5.0, 0.0, "dex");
        g
    }

    #[test]
    fn test_linear_three_hop_chain() {
        let g = linear_chain();
        let outcome =
            classic_dijkstra(&g, &key("A"), &key("D"), DEFAULT_MAX_HOPS).expect("route exists");

        assert_eq!(
            outcome.route.path,
            vec![key("A"), key("B"), key("C"), key("D")]
        );
        assert!((outcome.route.total_weight - (-(30.0f64).ln())).abs() < 1e-9);
        assert!((outcome.route.estimated_output - 30.0).abs() < 1e-6);
        assert_eq!(outcome.route.steps.len(), 3);
        assert!(outcome.route.steps.len() <= DEFAULT_MAX_HOPS);
    }

    #[test]
    fn test_two_path_tie_broken_by_gas() {
        let mut g = RouteGraph::new();
        g.add_swap(key("A"), key("B"), 2.0, 0.1, "dex");
        g.add_swap(key("A"), key("C"), 2.0, 0.2, "dex");
        g.add_swap(key("B"), key("D"), 1.0, 0.0, "dex");
        g.add_swap(key("C"), key("D"), 1.0, 0.0, "dex");

        let outcome =
            classic_dijkstra(&g, &key("A"), &key("D"), DEFAULT_MAX_HOPS).expect("route exists");
        assert_eq!(outcome.route.path, vec![key("A"), key("B"), key("D")]);
        let expected = -(2.0f64).ln() + 0.1;
        assert!((outcome.route.total_weight - expected).abs() < 1e-9);
    }

    /// Chain of rate-10 hops plus a direct rate-100 edge
    fn hop_cap_graph() -> RouteGraph {
        let mut g = RouteGraph::new();
        g.add_swap(key("A"), key("B"), 10.0, 0.0, "dex");
        g.add_swap(key("B"), key("C"), 10.0, 0.0, "dex");
        g.add_swap(key("C"), key("D"), 10.0, 0.0, "dex");
        g.add_swap(key("D"), key("E"), 10.0, 0.0, "dex");
        g.add_swap(key("A"), key("E"), 100.0, 0.0, "dex");
        g
    }

    #[test]
    fn test_hop_cap_prunes_longer_route() {
        let g = hop_cap_graph();
        let capped = classic_dijkstra(&g, &key("A"), &key("E"), 2).expect("route exists");
        assert_eq!(capped.route.path, vec![key("A"), key("E")]);
        assert!((capped.route.total_weight - (-(100.0f64).ln())).abs() < 1e-9);
    }

    #[test]
    fn test_hop_cap_allows_longer_route_when_loose() {
        let g = hop_cap_graph();
        let loose = classic_dijkstra(&g, &key("A"), &key("E"), 4).expect("route exists");
        assert_eq!(
            loose.route.path,
            vec![key("A"), key("B"), key("C"), key("D"), key("E")]
        );
        assert!((loose.route.total_weight - (-(10000.0f64).ln())).abs() < 1e-9);
    }

    #[test]
    fn test_unreachable_target() {
        let mut g = RouteGraph::new();
        g.add_swap(key("A"), key("B"), 1.0, 0.0, "dex");
        g.add_swap(key("C"), key("D"), 1.0, 0.0, "dex");

        let err = classic_dijkstra(&g, &key("A"), &key("D"), DEFAULT_MAX_HOPS)
            .expect_err("no route exists");
        assert_eq!(
            err,
            RouteError::NoRouteFound {
                source: key("A"),
                target: key("D"),
            }
        );
    }

    #[test]
    fn test_parallel_edges_first_match_in_details() {
        let mut g = RouteGraph::new();
        g.add_swap(key("A"), key("B"), 2.0, 0.0, "dex-one");
        g.add_swap(key("A"), key("B"), 3.0, 0.0, "dex-two");

        let outcome =
            classic_dijkstra(&g, &key("A"), &key("B"), DEFAULT_MAX_HOPS).expect("route exists");
        // Relaxation used the better parallel edge...
        assert!((outcome.route.total_weight - (-(3.0f64).ln())).abs() < 1e-9);
        assert!((outcome.route.steps[0].weight - (-(3.0f64).ln())).abs() < 1e-9);
        // ...but the reported provenance is the first adjacency match.
        assert_eq!(outcome.route.steps[0].details.rate, 2.0);
        assert_eq!(outcome.route.steps[0].details.dex.as_deref(), Some("dex-one"));

        // Weight sum still matches the total
        let sum: f64 = outcome.route.steps.iter().map(|s| s.weight).sum();
        assert!((sum - outcome.route.total_weight).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_rate_edge_is_dominated() {
        let mut g = RouteGraph::new();
        g.add_swap(key("A"), key("B"), 0.0, 0.0, "dex");
        g.add_swap(key("A"), key("C"), 1.5, 0.0, "dex");
        g.add_swap(key("B"), key("D"), 1000.0, 0.0, "dex");
        g.add_swap(key("C"), key("D"), 1.0, 0.0, "dex");

        let outcome =
            classic_dijkstra(&g, &key("A"), &key("D"), DEFAULT_MAX_HOPS).expect("route exists");
        assert_eq!(outcome.route.path, vec![key("A"), key("C"), key("D")]);
    }

    #[test]
    fn test_trivial_route_when_source_equals_target() {
        let g = linear_chain();
        let outcome =
            classic_dijkstra(&g, &key("A"), &key("A"), DEFAULT_MAX_HOPS).expect("trivial route");
        assert_eq!(outcome.route.path, vec![key("A")]);
        assert_eq!(outcome.route.total_weight, 0.0);
        assert_eq!(outcome.route.estimated_output, 1.0);
        assert!(outcome.route.steps.is_empty());
    }

    #[test]
    fn test_single_isolated_vertex_routes_to_itself() {
        let mut g = RouteGraph::new();
        g.add_token(key("A"));
        let outcome =
            classic_dijkstra(&g, &key("A"), &key("A"), DEFAULT_MAX_HOPS).expect("trivial route");
        assert_eq!(outcome.route.path, vec![key("A")]);
        assert_eq!(outcome.route.total_weight, 0.0);
    }

    #[test]
    fn test_invalid_input_distinct_from_no_route() {
        let g = linear_chain();
        let err = classic_dijkstra(&g, &key("Z"), &key("D"), DEFAULT_MAX_HOPS)
            .expect_err("unknown source");
        assert_eq!(err, RouteError::InvalidInput { key: key("Z") });

        let err = classic_dijkstra(&g, &key("A"), &key("Z"), DEFAULT_MAX_HOPS)
            .expect_err("unknown target");
        assert_eq!(err, RouteError::InvalidInput { key: key("Z") });
    }

    #[test]
    fn test_source_without_outgoing_edges() {
        let mut g = RouteGraph::new();
        g.add_swap(key("B"), key("A"), 1.0, 0.0, "dex");
        let err = classic_dijkstra(&g, &key("A"), &key("B"), DEFAULT_MAX_HOPS)
            .expect_err("source is a sink");
        assert!(matches!(err, RouteError::NoRouteFound { .. }));
    }

    #[test]
    fn test_self_loop_is_ignored() {
        let mut g = RouteGraph::new();
        g.add_swap(key("A"), key("A"), 2.0, 0.0, "dex");
        g.add_swap(key("A"), key("B"), 2.0, 0.0, "dex");

        let outcome =
            classic_dijkstra(&g, &key("A"), &key("B"), DEFAULT_MAX_HOPS).expect("route exists");
        assert_eq!(outcome.route.path, vec![key("A"), key("B")]);
    }

    #[test]
    fn test_correction_through_negative_edge_propagates() {
        // Rates chosen so the edge weights are A->B 1, A->C 2, C->B -5,
        // B->D 1. B is expanded first at distance 1; C then corrects it to
        // -3, and the correction must flow on to D (true optimum -2).
        let mut g = RouteGraph::new();
        g.add_swap(key("A"), key("B"), (-1.0f64).exp(), 0.0, "dex");
        g.add_swap(key("A"), key("C"), (-2.0f64).exp(), 0.0, "dex");
        g.add_swap(key("C"), key("B"), (5.0f64).exp(), 0.0, "dex");
        g.add_swap(key("B"), key("D"), (-1.0f64).exp(), 0.0, "dex");

        let outcome =
            classic_dijkstra(&g, &key("A"), &key("D"), DEFAULT_MAX_HOPS).expect("route exists");
        assert_eq!(
            outcome.route.path,
            vec![key("A"), key("C"), key("B"), key("D")]
        );
        assert!((outcome.route.total_weight - (-2.0)).abs() < 1e-9);

        let sum: f64 = outcome.route.steps.iter().map(|s| s.weight).sum();
        assert!((sum - outcome.route.total_weight).abs() < 1e-9);
    }

    #[test]
    fn test_arbitrage_cycle_surfaces_as_no_route() {
        // B <-> C is a negative cycle (rate product 100); the corrupted
        // predecessor chain is detected instead of looping forever.
        let mut g = RouteGraph::new();
        g.add_swap(key("A"), key("B"), 1.0, 0.0, "dex");
        g.add_swap(key("B"), key("C"), 10.0, 0.0, "dex");
        g.add_swap(key("C"), key("B"), 10.0, 0.0, "dex");
        g.add_swap(key("C"), key("D"), 1.0, 0.0, "dex");

        let err = classic_dijkstra(&g, &key("A"), &key("D"), DEFAULT_MAX_HOPS)
            .expect_err("cycle corrupts the chain");
        assert!(matches!(err, RouteError::NoRouteFound { .. }));
    }

    #[test]
    fn test_metrics_are_populated() {
        let g = linear_chain();
        let outcome =
            classic_dijkstra(&g, &key("A"), &key("D"), DEFAULT_MAX_HOPS).expect("route exists");
        assert!(outcome.metrics.visited_nodes >= 1);
        assert!(outcome.metrics.heap_operations > 0);
        assert_eq!(outcome.metrics.path_length, 3);
        assert_eq!(outcome.metrics.gas_estimate, 0.0);
    }

    #[test]
    fn test_repeat_calls_are_idempotent() {
        let g = hop_cap_graph();
        let first = classic_dijkstra(&g, &key("A"), &key("E"), 4).expect("route exists");
        let second = classic_dijkstra(&g, &key("A"), &key("E"), 4).expect("route exists");
        assert_eq!(first.route.total_weight, second.route.total_weight);
        assert_eq!(first.route.path.len(), second.route.path.len());
    }
}

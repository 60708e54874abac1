use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::route::{assemble_route, RouteResult};
use super::RouteError;
use crate::config::FOREST_TOLERANCE;
use crate::graph::{RouteGraph, TokenKey};

/// Counters reported by the PSB solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsbMetrics {
    pub execution_time_ms: f64,
    pub gas_estimate: f64,
    pub visited_nodes: usize,
    pub path_length: usize,
    pub barrier_count: usize,
    pub pivots_found: usize,
    pub frontier_reductions: usize,
    pub level_count: usize,
}

/// Route plus metrics from one PSB solve
#[derive(Debug, Clone)]
pub struct PsbOutcome {
    pub route: RouteResult,
    pub metrics: PsbMetrics,
}

/// Recursion parameters derived from the vertex count:
/// `k` bounds the Bellman-Ford depth in pivot finding, `t` is the branching
/// exponent, and `max_level` the recursion entry level.
fn psb_params(n: usize) -> (usize, usize, usize) {
    let log_n = (n.max(2) as f64).log2();
    let k = (log_n.powf(1.0 / 3.0).floor() as usize).max(2);
    let t = (log_n.powf(2.0 / 3.0).floor() as usize).max(2);
    let max_level = (log_n / t as f64).ceil() as usize;
    (k, t, max_level)
}

/// Frontier entry ordered so BinaryHeap pops the smallest distance first
#[derive(Debug, Clone, Copy, PartialEq)]
struct FrontierKey {
    dist: f64,
    node: NodeIndex,
}

impl Eq for FrontierKey {}

impl Ord for FrontierKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .partial_cmp(&self.dist)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.index().cmp(&self.node.index()))
    }
}

impl PartialOrd for FrontierKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-call solver state shared by the BMSSP recursion levels
struct PsbState<'a> {
    graph: &'a RouteGraph,
    k: usize,
    t: usize,
    target: NodeIndex,
    dist: Vec<f64>,
    prev: Vec<Option<NodeIndex>>,
    completed: Vec<bool>,
    /// Completed vertices whose distance improved after settlement and whose
    /// out-edges have not been re-relaxed since. Only negative edge weights
    /// (rates above 1) can produce these.
    dirty: Vec<bool>,
    /// Per-vertex expansion counts; an expansion count above `n` means a
    /// negative cycle is being chased and the vertex stops re-expanding.
    expansions: Vec<u32>,
    visited_count: usize,
    barrier_count: usize,
    pivots_found: usize,
    frontier_reductions: usize,
    level_count: usize,
}

// Shift clamp keeping 2^x arithmetic inside usize
const MAX_SHIFT: usize = 60;

impl<'a> PsbState<'a> {
    fn new(graph: &'a RouteGraph, k: usize, t: usize, target: NodeIndex) -> Self {
        let n = graph.node_count();
        Self {
            graph,
            k,
            t,
            target,
            dist: vec![f64::INFINITY; n],
            prev: vec![None; n],
            completed: vec![false; n],
            dirty: vec![false; n],
            expansions: vec![0; n],
            visited_count: 0,
            barrier_count: 0,
            pivots_found: 0,
            frontier_reductions: 0,
            level_count: 0,
        }
    }

    /// Bounded multi-source Dijkstra: settle vertices reachable from
    /// `sources` with distance below `bound`, stopping after `pop_cap`
    /// first-time settles when a cap is given. Returns the refined bound
    /// (the first pending distance left unsettled) and the settled vertices.
    ///
    /// An already-completed vertex whose distance improves (possible only
    /// with negative edge weights) is re-queued and re-expanded so the
    /// correction reaches its successors; it is not settled or counted
    /// again. Re-expansion per vertex is capped at `n` to avoid chasing a
    /// negative cycle forever.
    fn base_case(
        &mut self,
        bound: f64,
        sources: &[NodeIndex],
        pop_cap: Option<usize>,
    ) -> (f64, Vec<NodeIndex>) {
        let mut heap: BinaryHeap<FrontierKey> = BinaryHeap::new();
        for &s in sources {
            if self.dist[s.index()] < bound {
                heap.push(FrontierKey {
                    dist: self.dist[s.index()],
                    node: s,
                });
            }
        }

        let cap = pop_cap.unwrap_or(usize::MAX);
        let expansion_limit = self.graph.node_count() as u32;
        let mut settled = Vec::new();

        while let Some(FrontierKey { dist: d, node: u }) = heap.pop() {
            if d > self.dist[u.index()] {
                continue; // stale entry
            }
            if self.expansions[u.index()] > expansion_limit {
                continue; // negative cycle; stop chasing it
            }
            self.expansions[u.index()] += 1;
            self.dirty[u.index()] = false;

            let first_settle = !self.completed[u.index()];
            if first_settle {
                self.completed[u.index()] = true;
                self.visited_count += 1;
                settled.push(u);
            }

            for (v, edge) in self.graph.out_edges(u) {
                if v == u {
                    continue; // self-loops never belong on a route
                }
                let candidate = d + edge.weight();
                if candidate < self.dist[v.index()] {
                    self.dist[v.index()] = candidate;
                    self.prev[v.index()] = Some(u);
                    if self.completed[v.index()] {
                        // Stays dirty until something re-expands v.
                        self.dirty[v.index()] = true;
                    }
                    if candidate < bound {
                        heap.push(FrontierKey {
                            dist: candidate,
                            node: v,
                        });
                    }
                } else if candidate < bound
                    && !self.completed[v.index()]
                    && (candidate - self.dist[v.index()]).abs() <= 1e-15
                {
                    // Equal-distance reinsertion: v may have been discovered
                    // by an earlier pivot scan without ever entering a heap.
                    heap.push(FrontierKey {
                        dist: self.dist[v.index()],
                        node: v,
                    });
                }
            }

            if first_settle && settled.len() >= cap {
                let horizon = heap.peek().map(|entry| entry.dist).unwrap_or(bound);
                return (horizon.min(bound), settled);
            }
        }

        (bound, settled)
    }

    /// Up to `k` layers of bounded Bellman-Ford relaxation from `sources`,
    /// returning `(pivots, reached)`.
    ///
    /// A source is a pivot when its tight-predecessor subtree inside the
    /// reached set holds at least `k` vertices. If the reached set outgrows
    /// `k * |sources|` the scan bails out and every source is its own pivot.
    fn find_pivots(&mut self, bound: f64, sources: &[NodeIndex]) -> (Vec<NodeIndex>, Vec<NodeIndex>) {
        let n = self.graph.node_count();
        let mut reached = sources.to_vec();
        let mut in_reached = vec![false; n];
        for &s in sources {
            in_reached[s.index()] = true;
        }

        let mut layer = sources.to_vec();
        for _ in 0..self.k {
            let mut next_layer = Vec::new();
            for &u in &layer {
                let du = self.dist[u.index()];
                if !(du < bound) {
                    continue;
                }
                for (v, edge) in self.graph.out_edges(u) {
                    if v == u {
                        continue;
                    }
                    let candidate = du + edge.weight();
                    if candidate < bound && candidate <= self.dist[v.index()] {
                        if candidate < self.dist[v.index()] {
                            self.dist[v.index()] = candidate;
                            self.prev[v.index()] = Some(u);
                            if self.completed[v.index()] {
                                self.dirty[v.index()] = true;
                            }
                        }
                        if !in_reached[v.index()] {
                            in_reached[v.index()] = true;
                            reached.push(v);
                            next_layer.push(v);
                        }
                    }
                }
            }
            if reached.len() > self.k * sources.len() {
                // Frontier grew too fast to be worth filtering; treat every
                // source as a pivot.
                return (sources.to_vec(), reached);
            }
            if next_layer.is_empty() {
                break;
            }
            layer = next_layer;
        }

        // Forest of tight predecessor edges restricted to the reached set
        let mut position = vec![usize::MAX; n];
        for (i, &v) in reached.iter().enumerate() {
            position[v.index()] = i;
        }
        let mut children: Vec<Vec<NodeIndex>> = vec![Vec::new(); reached.len()];
        for &v in &reached {
            let Some(u) = self.prev[v.index()] else {
                continue;
            };
            if u == v || !in_reached[u.index()] {
                continue;
            }
            let tight = self.graph.out_edges(u).any(|(tv, e)| {
                tv == v
                    && (self.dist[u.index()] + e.weight() - self.dist[v.index()]).abs()
                        <= FOREST_TOLERANCE
            });
            if tight {
                children[position[u.index()]].push(v);
            }
        }

        // Subtree sizes per source; each vertex contributes once per call
        let mut seen = vec![false; n];
        let mut pivots = Vec::new();
        for &s in sources {
            if seen[s.index()] {
                continue;
            }
            let mut size = 0usize;
            let mut stack = vec![s];
            seen[s.index()] = true;
            while let Some(u) = stack.pop() {
                size += 1;
                for &c in &children[position[u.index()]] {
                    if !seen[c.index()] {
                        seen[c.index()] = true;
                        stack.push(c);
                    }
                }
            }
            if size >= self.k {
                pivots.push(s);
            }
        }

        if pivots.is_empty() {
            // Keep at least one recursion root alive: the closest source.
            let best = sources.iter().copied().min_by(|&a, &b| {
                self.dist[a.index()]
                    .partial_cmp(&self.dist[b.index()])
                    .unwrap_or(Ordering::Equal)
            });
            if let Some(best) = best {
                pivots.push(best);
            }
        }

        (pivots, reached)
    }

    /// Bounded multi-source shortest path, level-indexed.
    ///
    /// Reduces `sources` to its pivot set, then settles vertices below
    /// `bound` in batches of pivots pulled in distance order. Returns the
    /// refined bound and U, the pivot scan's reached set merged with every
    /// sub-call's settles; vertices whose distance improved during the call
    /// re-enter the frontier so later batches pick them up.
    fn bmssp(&mut self, level: usize, bound: f64, sources: Vec<NodeIndex>) -> (f64, Vec<NodeIndex>) {
        self.level_count = self.level_count.max(level);
        if sources.is_empty() {
            return (bound, Vec::new());
        }
        if level == 0 {
            return self.base_case(bound, &sources, Some(self.k + 1));
        }

        let (pivots, reached) = self.find_pivots(bound, &sources);
        self.barrier_count += 1;
        self.frontier_reductions += 1;
        self.pivots_found += pivots.len();
        debug!(
            "BMSSP level {}: {} sources -> {} pivots ({} reached)",
            level,
            sources.len(),
            pivots.len(),
            reached.len()
        );

        // Only the pivots seed the pull frontier; that is the frontier
        // reduction. The rest of the reached set joins the returned U and
        // re-enters through reinsertion as its predecessors settle.
        let mut frontier: BinaryHeap<FrontierKey> = pivots
            .iter()
            .filter(|&&p| !self.completed[p.index()] && self.dist[p.index()] < bound)
            .map(|&p| FrontierKey {
                dist: self.dist[p.index()],
                node: p,
            })
            .collect();

        let threshold = self.k.saturating_mul(1usize << (level * self.t).min(MAX_SHIFT));
        let chunk = 1usize << ((level - 1) * self.t).min(MAX_SHIFT);
        let iteration_cap = 1usize << self.t.min(MAX_SHIFT);

        // U starts as the reached set and absorbs every sub-call's settles
        let mut absorbed: Vec<NodeIndex> = reached
            .iter()
            .copied()
            .filter(|&v| self.dist[v.index()] < bound)
            .collect();
        let mut refined_bound = bound;
        let mut iterations = 0usize;

        while absorbed.len() < threshold && !frontier.is_empty() && iterations < iteration_cap {
            iterations += 1;

            let mut batch = Vec::new();
            while batch.len() < chunk {
                match frontier.pop() {
                    Some(key) => {
                        if self.completed[key.node.index()] {
                            continue;
                        }
                        batch.push(key.node);
                    }
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }

            // The next pending frontier key bounds the sub-call, so it only
            // settles vertices that nothing left in the frontier could still
            // improve.
            let next_key = frontier.peek().map(|entry| entry.dist).unwrap_or(bound);
            let sub_bound = next_key.min(bound);
            let (sub_refined, sub_settled) = self.bmssp(level - 1, sub_bound, batch);

            // Relax everything the sub-call settled; improvements flow back
            // into the frontier.
            for &u in &sub_settled {
                let du = self.dist[u.index()];
                for (v, edge) in self.graph.out_edges(u) {
                    if v == u {
                        continue;
                    }
                    let candidate = du + edge.weight();
                    if candidate < self.dist[v.index()] {
                        self.dist[v.index()] = candidate;
                        self.prev[v.index()] = Some(u);
                        if self.completed[v.index()] {
                            // Batches skip completed vertices, so the
                            // correction waits for the completion sweep.
                            self.dirty[v.index()] = true;
                        } else if candidate < bound {
                            frontier.push(FrontierKey {
                                dist: candidate,
                                node: v,
                            });
                        }
                    } else if candidate < bound
                        && !self.completed[v.index()]
                        && (candidate - self.dist[v.index()]).abs() <= 1e-15
                    {
                        // Equal-distance reinsertion keeps boundary vertices
                        // flowing into later batches.
                        frontier.push(FrontierKey {
                            dist: self.dist[v.index()],
                            node: v,
                        });
                    }
                }
            }

            absorbed.extend(sub_settled);
            refined_bound = refined_bound.min(sub_refined);

            if self.dist[self.target.index()] < refined_bound {
                break;
            }
        }

        (refined_bound, absorbed)
    }

    /// Settle whatever the recursion left pending. The batched recursion can
    /// exit on its iteration caps with discovered-but-unsettled vertices,
    /// and on negative-weight graphs it can correct a completed vertex's
    /// distance without re-relaxing its out-edges (the dirty set). A plain
    /// Dijkstra pass over both kinds of residue finalizes every distance.
    fn completion_sweep(&mut self) {
        let pending: Vec<NodeIndex> = (0..self.graph.node_count())
            .map(NodeIndex::new)
            .filter(|v| {
                self.dist[v.index()].is_finite()
                    && (!self.completed[v.index()] || self.dirty[v.index()])
            })
            .collect();
        if pending.is_empty() {
            return;
        }
        debug!("Completion sweep over {} residual vertices", pending.len());
        self.base_case(f64::INFINITY, &pending, None);
    }
}

/// Post-Sorting-Barrier shortest path: the BMSSP recursion of Duan et al.
/// with pivot-based frontier reduction.
///
/// Same weighting and output contract as [`super::classic_dijkstra`]. The
/// hop cap is *not* enforced here (BMSSP's pivot-size argument does not
/// admit a per-vertex hop counter), so returned routes can be longer than
/// `max_hops` when a longer path is cheaper.
pub fn psb_dijkstra(
    graph: &RouteGraph,
    source: &TokenKey,
    target: &TokenKey,
    max_hops: usize,
) -> Result<PsbOutcome, RouteError> {
    let started = Instant::now();

    let source_node = graph.node(source).ok_or_else(|| RouteError::InvalidInput {
        key: source.clone(),
    })?;
    let target_node = graph.node(target).ok_or_else(|| RouteError::InvalidInput {
        key: target.clone(),
    })?;

    if source_node == target_node {
        return Ok(PsbOutcome {
            route: RouteResult::trivial(source.clone()),
            metrics: PsbMetrics {
                execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                gas_estimate: 0.0,
                visited_nodes: 0,
                path_length: 0,
                barrier_count: 0,
                pivots_found: 0,
                frontier_reductions: 0,
                level_count: 0,
            },
        });
    }

    let n = graph.node_count();
    let (k, t, max_level) = psb_params(n);
    info!(
        "PSB solve {} -> {} (k={}, t={}, max_level={}, {} nodes)",
        source, target, k, t, max_level, n
    );
    debug!("Hop cap {} is not enforced by the PSB solver", max_hops);

    let mut state = PsbState::new(graph, k, t, target_node);
    state.dist[source_node.index()] = 0.0;

    state.bmssp(max_level, f64::INFINITY, vec![source_node]);
    // With negative weights the recursion's bound certificates do not hold,
    // so the sweep always runs there; for nonnegative graphs it is only
    // needed when the iteration caps left the target unsettled.
    if !state.completed[target_node.index()] || graph.has_negative_weight() {
        state.completion_sweep();
    }

    if state.dist[target_node.index()].is_infinite() {
        debug!("No route {} -> {}", source, target);
        return Err(RouteError::NoRouteFound {
            source: source.clone(),
            target: target.clone(),
        });
    }

    let Some(route) = assemble_route(graph, &state.dist, &state.prev, source_node, target_node)
    else {
        warn!(
            "Predecessor chain {} -> {} is inconsistent; graph contains an arbitrage cycle",
            source, target
        );
        return Err(RouteError::NoRouteFound {
            source: source.clone(),
            target: target.clone(),
        });
    };
    let metrics = PsbMetrics {
        execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        gas_estimate: route.total_gas(),
        visited_nodes: state.visited_count,
        path_length: route.hop_count(),
        barrier_count: state.barrier_count,
        pivots_found: state.pivots_found,
        frontier_reductions: state.frontier_reductions,
        level_count: state.level_count,
    };

    info!(
        "PSB route found: {} | weight {:.4} | output {:.4} | {} settled, {} pivots",
        route.token_path(),
        route.total_weight,
        route.estimated_output,
        metrics.visited_nodes,
        metrics.pivots_found
    );

    Ok(PsbOutcome { route, metrics })
}

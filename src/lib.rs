//! Multi-hop swap/bridge route finding over a cross-chain token graph.
//!
//! Vertices are `(symbol, chain)` pairs, edges are intra-chain swaps or
//! cross-chain bridges weighted by `-ln(rate) + gas`, so the cheapest path
//! maximizes the product of exchange rates net of gas. Two interchangeable
//! solvers share the graph abstraction:
//!
//! - [`solver::classic_dijkstra`]: binary min-heap Dijkstra with decrease-key
//!   and a hard hop cap
//! - [`solver::psb_dijkstra`]: the bounded multi-source shortest-path (BMSSP)
//!   recursion of Duan et al., which shrinks the working frontier through
//!   pivot selection

pub mod config;
pub mod display;
pub mod graph;
pub mod solver;

pub use graph::{Edge, EdgeKind, RouteGraph, TokenKey};
pub use solver::{
    classic_dijkstra, psb_dijkstra, ClassicMetrics, ClassicOutcome, PsbMetrics, PsbOutcome,
    RouteError, RouteResult, RouteStep,
};

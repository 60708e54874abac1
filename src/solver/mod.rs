pub mod classic;
pub mod heap;
pub mod psb;
pub mod route;

// Re-exports for external use
pub use classic::{classic_dijkstra, ClassicMetrics, ClassicOutcome};
pub use heap::MinHeap;
pub use psb::{psb_dijkstra, PsbMetrics, PsbOutcome};
pub use route::{RouteResult, RouteStep, StepDetails};

use thiserror::Error;

use crate::graph::TokenKey;

/// Solver failures surfaced to the caller.
///
/// `InvalidInput` means the request named a vertex the graph has never seen;
/// `NoRouteFound` means the vertices exist but no path connects them within
/// the solver's constraints.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("no route from {source} to {target}")]
    NoRouteFound { source: TokenKey, target: TokenKey },

    #[error("unknown token key {key}")]
    InvalidInput { key: TokenKey },
}

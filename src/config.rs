use std::str::FromStr;

use crate::graph::TokenKey;

// ============== SOLVER CONSTANTS ==============

/// Default maximum number of hops in a returned route
pub const DEFAULT_MAX_HOPS: usize = 4;

/// Weight assigned to edges with a non-positive rate.
/// Half of f64::MAX so a few of them can be summed without overflowing to inf.
pub const UNUSABLE_WEIGHT: f64 = f64::MAX / 2.0;

/// Absolute tolerance when testing whether a predecessor edge is tight
/// during pivot-forest construction
pub const FOREST_TOLERANCE: f64 = 1e-10;

/// Relative tolerance for weight-sum consistency checks
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

// ============== DEMO CONFIGURATION ==============

/// Which solver(s) the demo binary runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverChoice {
    Classic,
    Psb,
    Both,
}

impl FromStr for SolverChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classic" | "dijkstra" => Ok(SolverChoice::Classic),
            "psb" | "bmssp" => Ok(SolverChoice::Psb),
            "both" | "compare" => Ok(SolverChoice::Both),
            other => Err(format!("unknown solver '{}'", other)),
        }
    }
}

/// Runtime settings for the demo binary, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub source: TokenKey,
    pub target: TokenKey,
    pub max_hops: usize,
    pub solver: SolverChoice,
}

impl Config {
    /// Create configuration from environment variables, falling back to a
    /// showcase route (ETH on ethereum -> USDC on polygon).
    pub fn from_env() -> eyre::Result<Self> {
        let source = std::env::var("ROUTE_SOURCE")
            .map(|s| TokenKey::parse(&s))
            .unwrap_or_else(|_| TokenKey::new("ETH", "ethereum"));

        let target = std::env::var("ROUTE_TARGET")
            .map(|s| TokenKey::parse(&s))
            .unwrap_or_else(|_| TokenKey::new("USDC", "polygon"));

        let max_hops = match std::env::var("ROUTE_MAX_HOPS") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|e| eyre::eyre!("ROUTE_MAX_HOPS '{}' is not a number: {}", raw, e))?,
            Err(_) => DEFAULT_MAX_HOPS,
        };

        let solver = match std::env::var("ROUTE_SOLVER") {
            Ok(raw) => SolverChoice::from_str(&raw).map_err(|e| eyre::eyre!(e))?,
            Err(_) => SolverChoice::Both,
        };

        Ok(Self {
            source,
            target,
            max_hops,
            solver,
        })
    }
}

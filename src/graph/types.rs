use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::UNUSABLE_WEIGHT;

/// Identifier for a routing vertex: a token on a specific chain.
///
/// The canonical form is `"<symbol>.<chain>"`, e.g. `"USDC.arbitrum"`.
/// Equality is plain string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenKey(String);

impl TokenKey {
    /// Build a key from a symbol and a chain name
    pub fn new(symbol: &str, chain: &str) -> Self {
        Self(format!("{}.{}", symbol, chain))
    }

    /// Parse a key already in `"<symbol>.<chain>"` form
    pub fn parse(raw: &str) -> Self {
        Self(raw.to_string())
    }

    /// Token symbol (everything before the first dot)
    pub fn symbol(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// Chain name (everything after the first dot)
    pub fn chain(&self) -> &str {
        match self.0.split_once('.') {
            Some((_, chain)) => chain,
            None => "",
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TokenKey {}

impl From<&str> for TokenKey {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// What kind of hop an edge represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Intra-chain swap through a DEX pool
    Swap,
    /// Cross-chain bridge transfer
    Bridge,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Swap => write!(f, "swap"),
            EdgeKind::Bridge => write!(f, "bridge"),
        }
    }
}

/// A directed hop from one token to another.
///
/// `rate` is the multiplicative exchange rate; `gas` is an additive cost in
/// the same units as `-ln(rate)`. Provenance fields are carried through to
/// the route output but never consulted by the solvers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub target: TokenKey,
    pub kind: EdgeKind,
    pub rate: f64,
    pub gas: f64,
    pub bridge_fee: Option<f64>,
    pub dex: Option<String>,
    pub pool_address: Option<String>,
}

impl Edge {
    /// Create a swap edge through a named DEX
    pub fn swap(target: TokenKey, rate: f64, gas: f64, dex: &str) -> Self {
        Self {
            target,
            kind: EdgeKind::Swap,
            rate,
            gas,
            bridge_fee: None,
            dex: Some(dex.to_string()),
            pool_address: None,
        }
    }

    /// Create a bridge edge with an explicit bridge fee
    pub fn bridge(target: TokenKey, rate: f64, gas: f64, bridge_fee: f64) -> Self {
        Self {
            target,
            kind: EdgeKind::Bridge,
            rate,
            gas,
            bridge_fee: Some(bridge_fee),
            dex: None,
            pool_address: None,
        }
    }

    pub fn with_pool(mut self, pool_address: &str) -> Self {
        self.pool_address = Some(pool_address.to_string());
        self
    }

    /// Scalar weight minimized by the solvers: `-ln(rate) + gas`.
    ///
    /// A non-positive (or non-finite) rate makes the edge effectively
    /// unusable: it contributes `f64::MAX / 2` instead of `-ln(0) = inf`,
    /// which keeps downstream sums finite.
    pub fn weight(&self) -> f64 {
        if self.rate > 0.0 && self.rate.is_finite() {
            -self.rate.ln() + self.gas
        } else {
            UNUSABLE_WEIGHT
        }
    }
}

pub mod builder;
pub mod types;

// Re-exports for external use
pub use builder::RouteGraph;
pub use types::{Edge, EdgeKind, TokenKey};

//! Content repository aggregates

pub mod node_aggregate;
pub mod workspace;

pub use node_aggregate::*;
pub use workspace::*;

//! Content graph queries
//!
//! Queries provide read-only access to the content graph. They operate on the content
//! graph projection, scoped to one content stream, one dimension space point and a set of
//! visibility constraints.

mod content_subgraph;
mod node;
mod visibility;

pub use content_subgraph::{ContentSubgraph, NodeFilter};
pub use node::{Node, PaginationParams, Reference, Subtree};
pub use visibility::VisibilityConstraints;

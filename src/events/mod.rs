//! Content repository events

mod content_stream_events;
mod node_aggregate_events;
mod workspace_events;

pub use content_stream_events::*;
pub use node_aggregate_events::*;
pub use workspace_events::*;

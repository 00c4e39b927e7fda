//! Content repository projections
//!
//! Projections are disposable, read-optimized materializations of the event log. They are
//! brought up to date by [`ProjectionCatchUp`] and can always be rebuilt from sequence zero.

pub mod catch_up;
pub mod content_graph;
pub mod content_stream;
pub mod workspace;

pub use catch_up::ProjectionCatchUp;
pub use content_graph::{ContentGraphProjection, HierarchyRelation, NodeRecord, NodeRelationAnchorPoint};
pub use content_stream::{ContentStreamProjection, ContentStreamRecord, ContentStreamState};
pub use workspace::WorkspaceProjection;

use crate::infrastructure::{EventStoreError, RecordedEvent};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while projecting events
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Projection {projection} failed at sequence number {sequence_number} (checkpoint {checkpoint}): {reason}")]
    ReplayFailed {
        projection: &'static str,
        sequence_number: u64,
        checkpoint: u64,
        reason: String,
    },

    #[error("Projection state is inconsistent with the event: {0}")]
    Inconsistent(String),

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),
}

/// Result type for projection operations
pub type ProjectionResult<T> = Result<T, ProjectionError>;

/// A read model maintained from committed events
#[async_trait]
pub trait Projection: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// Apply one committed event
    async fn apply(&mut self, event: &RecordedEvent) -> ProjectionResult<()>;

    /// Drop all state including the checkpoint
    async fn reset(&mut self) -> ProjectionResult<()>;

    /// Sequence number of the last applied event; 0 if none
    async fn checkpoint(&self) -> u64;

    async fn save_checkpoint(&mut self, sequence_number: u64) -> ProjectionResult<()>;
}

//! Infrastructure layer implementations
//!
//! The event store seam, its in-memory implementation and the publisher that
//! attaches command metadata to node aggregate events.

mod event_publisher;
mod event_store;
mod in_memory_event_store;

pub use event_publisher::{CommandScope, NodeAggregateEventPublisher, PublisherError, PublisherResult};
pub use event_store::{
    CommitResult, EventEnvelope, EventMetadata, EventRecord, EventStore, EventStoreError, EventStoreResult,
    ExpectedVersion, RecordedEvent, StreamName,
};
pub use in_memory_event_store::InMemoryEventStore;

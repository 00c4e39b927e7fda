//! Content repository for the Composable Information Machine
//!
//! An event-sourced store for hierarchical, multi-dimensional content. Nodes live in a
//! graph that varies across dimension space points (e.g. language or market); content
//! streams hold independent versions of that graph, and workspaces fork, rebase and
//! publish content streams on top of each other.
//!
//! State changes only through commands. Command handlers validate against projections,
//! publish events to the event store, and projections are rebuilt from those events.

pub mod aggregate;
pub mod commands;
pub mod config;
pub mod content_repository;
pub mod dimension_space;
pub mod domain_events;
pub mod events;
pub mod handlers;
pub mod infrastructure;
pub mod node_types;
pub mod projections;
pub mod queries;
pub mod value_objects;

// Re-export main types
pub use aggregate::{NodeAggregate, Workspace, WorkspaceStatus};
pub use content_repository::ContentRepository;
pub use domain_events::ContentRepositoryEvent;

// Re-export commands and their types
pub use commands::{
    CommandError, CommandHandlingResult, ContentRepositoryCommand, NodeVariantSelectionStrategy,
    RelationDistributionStrategy,
};

// Re-export configuration
pub use config::{ConfigurationError, ConfigurationResult, ContentRepositoryConfig, ProjectionMode};

// Re-export dimension space and node types
pub use dimension_space::{ContentDimensionZookeeper, InterDimensionalVariationGraph, VariantType};
pub use node_types::{NodeType, NodeTypeConstraints, NodeTypeManager};

// Re-export command handlers
pub use handlers::{CommandBus, CommandHandler, CommandResult};

// Re-export infrastructure
pub use infrastructure::{EventStore, EventStoreError, ExpectedVersion, InMemoryEventStore, StreamName};

// Re-export projections and queries
pub use projections::{
    ContentGraphProjection, ContentStreamProjection, Projection, ProjectionError, WorkspaceProjection,
};
pub use queries::{ContentSubgraph, Node, NodeFilter, VisibilityConstraints};

// Re-export value objects
pub use value_objects::{
    ContentStreamIdentifier, DimensionSpacePoint, DimensionSpacePointSet, NodeAggregateIdentifier, NodeName,
    NodePath, NodeTypeName, OriginDimensionSpacePoint, PropertyValuesToWrite, UserIdentifier, WorkspaceName,
};

//! Command precondition violations and other command failures

use crate::infrastructure::{EventStoreError, PublisherError};
use crate::projections::ProjectionError;
use crate::value_objects::{
    ContentStreamIdentifier, DimensionSpacePoint, DimensionSpacePointSet, NodeAggregateIdentifier, NodeName,
    NodeTypeName, PropertyName, ReferenceName, WorkspaceName,
};
use thiserror::Error;

/// Result type for command handling
pub type CommandHandlingResult<T> = Result<T, CommandError>;

/// Errors raised while handling a command.
///
/// Precondition violations are detected before any event is published, so a failed
/// command never leaves a partial event batch behind.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Content stream {0} already exists")]
    ContentStreamAlreadyExists(ContentStreamIdentifier),

    #[error("Content stream {0} does not exist yet")]
    ContentStreamDoesNotExistYet(ContentStreamIdentifier),

    #[error("Dimension space point {0} is not part of the allowed dimension subspace")]
    DimensionSpacePointNotFound(DimensionSpacePoint),

    #[error("Node type {0} not found")]
    NodeTypeNotFound(NodeTypeName),

    #[error("Node type {0} is abstract")]
    NodeTypeIsAbstract(NodeTypeName),

    #[error("Node type {0} is not a root node type")]
    NodeTypeIsNotOfTypeRoot(NodeTypeName),

    #[error("Node type {0} is a root node type")]
    NodeTypeIsOfTypeRoot(NodeTypeName),

    #[error("A root node aggregate of type {0} already exists")]
    RootNodeAggregateTypeIsAlreadyOccupied(NodeTypeName),

    #[error("Node constraints violated: {0}")]
    NodeConstraintException(String),

    #[error("Node aggregate {0} currently exists")]
    NodeAggregateCurrentlyExists(NodeAggregateIdentifier),

    #[error("Node aggregate {0} currently does not exist")]
    NodeAggregateCurrentlyDoesNotExist(NodeAggregateIdentifier),

    #[error("Node aggregate {0} is a root node aggregate")]
    NodeAggregateIsRoot(NodeAggregateIdentifier),

    #[error("Node aggregate {0} is tethered")]
    NodeAggregateIsTethered(NodeAggregateIdentifier),

    #[error("Node aggregate {node_aggregate_identifier} currently does not cover dimension space point {dimension_space_point}")]
    NodeAggregateCurrentlyDoesNotCoverDimensionSpacePoint {
        node_aggregate_identifier: NodeAggregateIdentifier,
        dimension_space_point: DimensionSpacePoint,
    },

    #[error("Node aggregate {node_aggregate_identifier} does currently not cover dimension space points {uncovered}")]
    NodeAggregateDoesCurrentlyNotCoverDimensionSpacePointSet {
        node_aggregate_identifier: NodeAggregateIdentifier,
        uncovered: DimensionSpacePointSet,
    },

    #[error("Node aggregate {node_aggregate_identifier} currently does not occupy dimension space point {origin}")]
    NodeAggregateCurrentlyDoesNotOccupyDimensionSpacePoint {
        node_aggregate_identifier: NodeAggregateIdentifier,
        origin: DimensionSpacePoint,
    },

    #[error("Node aggregate {node_aggregate_identifier} already occupies dimension space point {origin}")]
    DimensionSpacePointIsAlreadyOccupied {
        node_aggregate_identifier: NodeAggregateIdentifier,
        origin: DimensionSpacePoint,
    },

    #[error("Node name \"{node_name}\" is already occupied below {parent_node_aggregate_identifier} in {occupied}")]
    NodeNameIsAlreadyOccupied {
        node_name: NodeName,
        parent_node_aggregate_identifier: NodeAggregateIdentifier,
        occupied: DimensionSpacePointSet,
    },

    #[error("Node name \"{node_name}\" is already covered by a sibling of {node_aggregate_identifier} in {covered}")]
    NodeNameIsAlreadyCovered {
        node_name: NodeName,
        node_aggregate_identifier: NodeAggregateIdentifier,
        covered: DimensionSpacePointSet,
    },

    #[error("Node aggregate {new_parent} is a descendant of {node_aggregate_identifier} in {dimension_space_point}")]
    NodeAggregateIsDescendant {
        node_aggregate_identifier: NodeAggregateIdentifier,
        new_parent: NodeAggregateIdentifier,
        dimension_space_point: DimensionSpacePoint,
    },

    #[error("Node aggregate {succeeding_sibling} is no child of {parent_node_aggregate_identifier}")]
    NodeAggregateIsNoSibling {
        succeeding_sibling: NodeAggregateIdentifier,
        parent_node_aggregate_identifier: NodeAggregateIdentifier,
    },

    #[error("Property \"{property_name}\" cannot be set on nodes of type {node_type_name}")]
    PropertyCannotBeSet {
        property_name: PropertyName,
        node_type_name: NodeTypeName,
    },

    #[error("Property \"{property_name}\" of node type {node_type_name}: {reason}")]
    PropertyTypeMismatch {
        property_name: PropertyName,
        node_type_name: NodeTypeName,
        reason: String,
    },

    #[error("Reference \"{reference_name}\" cannot be set on nodes of type {node_type_name}")]
    ReferenceCannotBeSet {
        reference_name: ReferenceName,
        node_type_name: NodeTypeName,
    },

    #[error("Reference \"{reference_name}\" does not allow destinations of type {destination_node_type_name}")]
    ReferenceTargetNotAllowed {
        reference_name: ReferenceName,
        destination_node_type_name: NodeTypeName,
    },

    #[error("Reference \"{reference_name}\" allows at most {max_items} destinations, {given} given")]
    TooManyReferences {
        reference_name: ReferenceName,
        max_items: usize,
        given: usize,
    },

    #[error("Node aggregate {node_aggregate_identifier} already disables dimension space point {dimension_space_point}")]
    NodeAggregateCurrentlyDisablesDimensionSpacePoint {
        node_aggregate_identifier: NodeAggregateIdentifier,
        dimension_space_point: DimensionSpacePoint,
    },

    #[error("Node aggregate {node_aggregate_identifier} does not disable dimension space point {dimension_space_point}")]
    NodeAggregateCurrentlyDoesNotDisableDimensionSpacePoint {
        node_aggregate_identifier: NodeAggregateIdentifier,
        dimension_space_point: DimensionSpacePoint,
    },

    #[error("Workspace {0} already exists")]
    WorkspaceAlreadyExists(WorkspaceName),

    #[error("Workspace {0} does not exist")]
    WorkspaceDoesNotExist(WorkspaceName),

    #[error("Base workspace {0} does not exist")]
    BaseWorkspaceDoesNotExist(WorkspaceName),

    #[error("Workspace {0} has no base workspace")]
    WorkspaceHasNoBaseWorkspace(WorkspaceName),

    #[error("A root workspace already exists: {0}")]
    RootWorkspaceAlreadyExists(WorkspaceName),

    #[error("Base workspace {base_workspace_name} of {workspace_name} has been modified in the meantime; rebase first")]
    BaseWorkspaceHasBeenModifiedInTheMeantime {
        workspace_name: WorkspaceName,
        base_workspace_name: WorkspaceName,
    },

    #[error("Rebasing workspace {workspace_name} failed with {} error(s): {}", errors.len(), errors.join("; "))]
    WorkspaceRebaseFailed {
        workspace_name: WorkspaceName,
        errors: Vec<String>,
    },

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Event publisher error: {0}")]
    Publisher(#[from] PublisherError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

impl CommandError {
    /// Whether retrying the command (after catching up or rebasing) may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::BaseWorkspaceHasBeenModifiedInTheMeantime { .. } => true,
            Self::EventStore(error) => error.is_concurrency_conflict(),
            Self::Publisher(PublisherError::EventStore(error)) => error.is_concurrency_conflict(),
            _ => false,
        }
    }
}

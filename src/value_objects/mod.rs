//! Content repository value objects
//!
//! Value objects are immutable types that represent concepts in the content repository.
//! They are compared by value rather than identity and encapsulate domain validation.

mod dimension_space_point;
mod identifiers;
mod node_path;
mod property_values;

pub use dimension_space_point::{
    DimensionSpacePoint, DimensionSpacePointSet, OriginDimensionSpacePoint,
};
pub use identifiers::{
    ContentStreamIdentifier, CorrelationId, EventId, NodeAggregateIdentifier, NodeTypeName,
    PropertyName, ReferenceName, UserIdentifier, WorkspaceName, WorkspaceTitle,
};
pub use node_path::{NodeName, NodePath};
pub use property_values::{
    NodeAggregateClassification, PropertyScope, PropertyValuesToWrite, SerializedPropertyValue,
    SerializedPropertyValues,
};

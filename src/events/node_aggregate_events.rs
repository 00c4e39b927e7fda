//! Node aggregate events
//!
//! Every event here affects the nodes of exactly one content stream and can be rewritten
//! to target another content stream, which is what publishing and rebasing rely on.

use crate::value_objects::{
    ContentStreamIdentifier, DimensionSpacePoint, DimensionSpacePointSet, NodeAggregateClassification,
    NodeAggregateIdentifier, NodeName, NodeTypeName, OriginDimensionSpacePoint, ReferenceName,
    SerializedPropertyValues,
};
use serde::{Deserialize, Serialize};

/// Capability of events (and commands) to be re-targeted at another content stream
pub trait PublishableToOtherContentStreams {
    /// A copy of `self` addressing `content_stream_identifier`
    fn create_copy_for_content_stream(&self, content_stream_identifier: ContentStreamIdentifier) -> Self;
}

macro_rules! publishable {
    ($($event:ident),* $(,)?) => {
        $(
            impl PublishableToOtherContentStreams for $event {
                fn create_copy_for_content_stream(
                    &self,
                    content_stream_identifier: ContentStreamIdentifier,
                ) -> Self {
                    Self {
                        content_stream_identifier,
                        ..self.clone()
                    }
                }
            }
        )*
    };
}

/// A root node aggregate was created, covering the whole allowed dimension subspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootNodeAggregateWithNodeWasCreated {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub node_type_name: NodeTypeName,
    pub covered_dimension_space_points: DimensionSpacePointSet,
    pub node_aggregate_classification: NodeAggregateClassification,
}

/// A node aggregate was created together with its first node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAggregateWithNodeWasCreated {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub node_type_name: NodeTypeName,
    /// Where the first node originates
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    /// Points the first node is initially visible in
    pub covered_dimension_space_points: DimensionSpacePointSet,
    pub parent_node_aggregate_identifier: NodeAggregateIdentifier,
    pub node_name: Option<NodeName>,
    pub initial_property_values: SerializedPropertyValues,
    pub node_aggregate_classification: NodeAggregateClassification,
    /// The sibling the new node is inserted before; appended if absent
    pub succeeding_node_aggregate_identifier: Option<NodeAggregateIdentifier>,
}

/// A node variant was created at a more specific origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpecializationVariantWasCreated {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub source_origin: OriginDimensionSpacePoint,
    pub specialization_origin: OriginDimensionSpacePoint,
    pub specialization_coverage: DimensionSpacePointSet,
}

/// A node variant was created at a more general origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGeneralizationVariantWasCreated {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub source_origin: OriginDimensionSpacePoint,
    pub generalization_origin: OriginDimensionSpacePoint,
    pub generalization_coverage: DimensionSpacePointSet,
}

/// A node variant was created at an unrelated origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePeerVariantWasCreated {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub source_origin: OriginDimensionSpacePoint,
    pub peer_origin: OriginDimensionSpacePoint,
    pub peer_coverage: DimensionSpacePointSet,
}

/// New position of a moved node aggregate in one covered dimension space point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMoveMapping {
    pub dimension_space_point: DimensionSpacePoint,
    /// The new parent; the parent is kept if absent
    pub new_parent_node_aggregate_identifier: Option<NodeAggregateIdentifier>,
    /// The sibling to insert before; appended if absent
    pub new_succeeding_sibling_node_aggregate_identifier: Option<NodeAggregateIdentifier>,
}

/// A node aggregate got a new parent or position in some covered points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAggregateWasMoved {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub node_move_mappings: Vec<NodeMoveMapping>,
}

/// A node aggregate was removed from some covered points, including its descendants there
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAggregateWasRemoved {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub affected_occupied_dimension_space_points: DimensionSpacePointSet,
    pub affected_covered_dimension_space_points: DimensionSpacePointSet,
}

/// A node aggregate and its descendants were hidden in some covered points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAggregateWasDisabled {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub affected_dimension_space_points: DimensionSpacePointSet,
}

/// A previously disabled node aggregate became visible again in some covered points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAggregateWasEnabled {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub affected_dimension_space_points: DimensionSpacePointSet,
}

/// Property values were written to the nodes at the affected origins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePropertiesWereSet {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    /// The origin named by the command
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    /// Origins of all nodes receiving the values
    pub affected_origin_dimension_space_points: DimensionSpacePointSet,
    pub property_values: SerializedPropertyValues,
}

/// A named reference of the nodes at the affected origins was replaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReferencesWereSet {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub source_node_aggregate_identifier: NodeAggregateIdentifier,
    pub source_origin_dimension_space_point: OriginDimensionSpacePoint,
    pub affected_source_origin_dimension_space_points: DimensionSpacePointSet,
    pub reference_name: ReferenceName,
    pub destination_node_aggregate_identifiers: Vec<NodeAggregateIdentifier>,
}

/// The node aggregate's name changed in all covered points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAggregateNameWasChanged {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub new_node_name: NodeName,
}

publishable!(
    RootNodeAggregateWithNodeWasCreated,
    NodeAggregateWithNodeWasCreated,
    NodeSpecializationVariantWasCreated,
    NodeGeneralizationVariantWasCreated,
    NodePeerVariantWasCreated,
    NodeAggregateWasMoved,
    NodeAggregateWasRemoved,
    NodeAggregateWasDisabled,
    NodeAggregateWasEnabled,
    NodePropertiesWereSet,
    NodeReferencesWereSet,
    NodeAggregateNameWasChanged,
);

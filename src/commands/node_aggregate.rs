//! Node aggregate commands and the strategies they carry

use crate::dimension_space::InterDimensionalVariationGraph;
use crate::value_objects::{
    ContentStreamIdentifier, DimensionSpacePoint, DimensionSpacePointSet, NodeAggregateIdentifier, NodeName,
    NodePath, NodeTypeName, OriginDimensionSpacePoint, PropertyValuesToWrite, ReferenceName, UserIdentifier,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Commands that can be replayed against another content stream
pub trait RebasableToOtherContentStreams {
    /// A copy of `self` addressing `content_stream_identifier`
    fn create_copy_for_content_stream(&self, content_stream_identifier: ContentStreamIdentifier) -> Self;
}

macro_rules! rebasable {
    ($($command:ident),* $(,)?) => {
        $(
            impl RebasableToOtherContentStreams for $command {
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

/// Which covered points a move applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationDistributionStrategy {
    /// Only the given point
    Scatter,
    /// The given point and all its covered specializations
    GatherSpecializations,
    /// Every point the aggregate covers
    #[default]
    GatherAll,
}

impl RelationDistributionStrategy {
    /// Resolve the covered points a move starting at `point` affects
    pub fn affected_dimension_space_points(
        &self,
        point: &DimensionSpacePoint,
        covered: &DimensionSpacePointSet,
        variation_graph: &InterDimensionalVariationGraph,
    ) -> DimensionSpacePointSet {
        match self {
            Self::Scatter => DimensionSpacePointSet::new([point.clone()]),
            Self::GatherSpecializations => variation_graph
                .specialization_set(point, true, &DimensionSpacePointSet::empty())
                .intersection(covered),
            Self::GatherAll => covered.clone(),
        }
    }
}

/// Which variants of an aggregate a removal, disabling or enabling applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeVariantSelectionStrategy {
    /// Only the given covered point
    OnlyGivenVariant,
    /// The given point and all its covered specializations
    #[default]
    AllSpecializations,
    /// Every covered point
    AllVariants,
}

impl NodeVariantSelectionStrategy {
    /// Covered points affected when starting at `point`
    pub fn resolve_affected_covered(
        &self,
        point: &DimensionSpacePoint,
        covered: &DimensionSpacePointSet,
        variation_graph: &InterDimensionalVariationGraph,
    ) -> DimensionSpacePointSet {
        match self {
            Self::OnlyGivenVariant => DimensionSpacePointSet::new([point.clone()]).intersection(covered),
            Self::AllSpecializations => variation_graph
                .specialization_set(point, true, &DimensionSpacePointSet::empty())
                .intersection(covered),
            Self::AllVariants => covered.clone(),
        }
    }

    /// Occupied points affected when starting at `point`
    pub fn resolve_affected_occupied(
        &self,
        point: &DimensionSpacePoint,
        occupied: &DimensionSpacePointSet,
        variation_graph: &InterDimensionalVariationGraph,
    ) -> DimensionSpacePointSet {
        self.resolve_affected_covered(point, occupied, variation_graph)
    }
}

/// Create a root node aggregate covering the whole allowed dimension subspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRootNodeAggregateWithNode {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub node_type_name: NodeTypeName,
    pub initiating_user_identifier: UserIdentifier,
}

/// Create a node aggregate with its first node below a parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeAggregateWithNode {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub node_type_name: NodeTypeName,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub parent_node_aggregate_identifier: NodeAggregateIdentifier,
    #[serde(default)]
    pub succeeding_sibling_node_aggregate_identifier: Option<NodeAggregateIdentifier>,
    #[serde(default)]
    pub node_name: Option<NodeName>,
    #[serde(default)]
    pub initial_property_values: PropertyValuesToWrite,
    /// Identifiers of tethered descendants keyed by their path below the new node
    #[serde(default)]
    pub tethered_descendant_node_aggregate_identifiers: IndexMap<String, NodeAggregateIdentifier>,
    pub initiating_user_identifier: UserIdentifier,
}

impl CreateNodeAggregateWithNode {
    pub fn new(
        content_stream_identifier: ContentStreamIdentifier,
        node_aggregate_identifier: NodeAggregateIdentifier,
        node_type_name: impl Into<NodeTypeName>,
        origin_dimension_space_point: impl Into<OriginDimensionSpacePoint>,
        parent_node_aggregate_identifier: NodeAggregateIdentifier,
        initiating_user_identifier: UserIdentifier,
    ) -> Self {
        Self {
            content_stream_identifier,
            node_aggregate_identifier,
            node_type_name: node_type_name.into(),
            origin_dimension_space_point: origin_dimension_space_point.into(),
            parent_node_aggregate_identifier,
            succeeding_sibling_node_aggregate_identifier: None,
            node_name: None,
            initial_property_values: PropertyValuesToWrite::empty(),
            tethered_descendant_node_aggregate_identifiers: IndexMap::new(),
            initiating_user_identifier,
        }
    }

    pub fn with_node_name(mut self, node_name: NodeName) -> Self {
        self.node_name = Some(node_name);
        self
    }

    pub fn with_succeeding_sibling(mut self, sibling: NodeAggregateIdentifier) -> Self {
        self.succeeding_sibling_node_aggregate_identifier = Some(sibling);
        self
    }

    pub fn with_initial_property_values(mut self, values: PropertyValuesToWrite) -> Self {
        self.initial_property_values = values;
        self
    }

    pub fn with_tethered_descendant(mut self, path: &NodePath, identifier: NodeAggregateIdentifier) -> Self {
        self.tethered_descendant_node_aggregate_identifiers
            .insert(path_key(path), identifier);
        self
    }
}

/// Key of a tethered descendant path, e.g. `main/teaser`
pub(crate) fn path_key(path: &NodePath) -> String {
    path.names().iter().map(NodeName::as_str).collect::<Vec<_>>().join("/")
}

/// Create a node of an existing aggregate at another origin.
///
/// Whether this becomes a specialization, generalization or peer variant depends on how
/// the target origin relates to the source origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeVariant {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub source_origin: OriginDimensionSpacePoint,
    pub target_origin: OriginDimensionSpacePoint,
    pub initiating_user_identifier: UserIdentifier,
}

/// Move a node aggregate to a new parent and/or position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveNodeAggregate {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub dimension_space_point: DimensionSpacePoint,
    #[serde(default)]
    pub new_parent_node_aggregate_identifier: Option<NodeAggregateIdentifier>,
    #[serde(default)]
    pub new_succeeding_sibling_node_aggregate_identifier: Option<NodeAggregateIdentifier>,
    #[serde(default)]
    pub relation_distribution_strategy: RelationDistributionStrategy,
    pub initiating_user_identifier: UserIdentifier,
}

/// Remove a node aggregate, with its descendants, from some covered points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveNodeAggregate {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub covered_dimension_space_point: DimensionSpacePoint,
    #[serde(default)]
    pub node_variant_selection_strategy: NodeVariantSelectionStrategy,
    pub initiating_user_identifier: UserIdentifier,
}

/// Hide a node aggregate and its descendants in some covered points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisableNodeAggregate {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub covered_dimension_space_point: DimensionSpacePoint,
    #[serde(default)]
    pub node_variant_selection_strategy: NodeVariantSelectionStrategy,
    pub initiating_user_identifier: UserIdentifier,
}

/// Show a disabled node aggregate again
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnableNodeAggregate {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub covered_dimension_space_point: DimensionSpacePoint,
    #[serde(default)]
    pub node_variant_selection_strategy: NodeVariantSelectionStrategy,
    pub initiating_user_identifier: UserIdentifier,
}

/// Write property values; declared property scopes decide which nodes receive them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetNodeProperties {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub property_values: PropertyValuesToWrite,
    pub initiating_user_identifier: UserIdentifier,
}

/// Replace the destinations of a named reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetNodeReferences {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub source_node_aggregate_identifier: NodeAggregateIdentifier,
    pub source_origin_dimension_space_point: OriginDimensionSpacePoint,
    pub reference_name: ReferenceName,
    pub destination_node_aggregate_identifiers: Vec<NodeAggregateIdentifier>,
    pub initiating_user_identifier: UserIdentifier,
}

/// Rename a node aggregate in all covered points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeNodeAggregateName {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub new_node_name: NodeName,
    pub initiating_user_identifier: UserIdentifier,
}

rebasable!(
    CreateRootNodeAggregateWithNode,
    CreateNodeAggregateWithNode,
    CreateNodeVariant,
    MoveNodeAggregate,
    RemoveNodeAggregate,
    DisableNodeAggregate,
    EnableNodeAggregate,
    SetNodeProperties,
    SetNodeReferences,
    ChangeNodeAggregateName,
);

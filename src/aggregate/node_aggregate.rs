//! Node aggregate read model
//!
//! A node aggregate is the set of all nodes sharing one identifier within a content stream.
//! It is assembled from the content graph projection and is the state command handlers
//! validate against.

use crate::queries::Node;
use crate::value_objects::{
    ContentStreamIdentifier, DimensionSpacePoint, DimensionSpacePointSet, NodeAggregateClassification,
    NodeAggregateIdentifier, NodeName, NodeTypeName, OriginDimensionSpacePoint,
};
use std::collections::BTreeMap;

/// All nodes of one aggregate in one content stream
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAggregate {
    pub(crate) content_stream_identifier: ContentStreamIdentifier,
    pub(crate) node_aggregate_identifier: NodeAggregateIdentifier,
    pub(crate) classification: NodeAggregateClassification,
    pub(crate) node_type_name: NodeTypeName,
    pub(crate) node_name: Option<NodeName>,
    /// Origin hash -> node
    pub(crate) nodes_by_origin: BTreeMap<String, Node>,
    /// Origin hash -> points that origin's node is visible in
    pub(crate) coverage_by_occupant: BTreeMap<String, DimensionSpacePointSet>,
    /// Covered point hash -> origin of the node visible there
    pub(crate) occupation_by_covered: BTreeMap<String, OriginDimensionSpacePoint>,
    pub(crate) disabled_dimension_space_points: DimensionSpacePointSet,
}

impl NodeAggregate {
    pub fn content_stream_identifier(&self) -> ContentStreamIdentifier {
        self.content_stream_identifier
    }

    pub fn identifier(&self) -> NodeAggregateIdentifier {
        self.node_aggregate_identifier
    }

    pub fn classification(&self) -> NodeAggregateClassification {
        self.classification
    }

    pub fn is_root(&self) -> bool {
        self.classification.is_root()
    }

    pub fn is_tethered(&self) -> bool {
        self.classification.is_tethered()
    }

    pub fn node_type_name(&self) -> &NodeTypeName {
        &self.node_type_name
    }

    pub fn node_name(&self) -> Option<&NodeName> {
        self.node_name.as_ref()
    }

    /// Points the aggregate has its own node in
    pub fn occupied_dimension_space_points(&self) -> DimensionSpacePointSet {
        self.nodes_by_origin
            .values()
            .map(|node| node.origin_dimension_space_point.to_dimension_space_point())
            .collect()
    }

    /// Points the aggregate is visible in
    pub fn covered_dimension_space_points(&self) -> DimensionSpacePointSet {
        self.coverage_by_occupant
            .values()
            .fold(DimensionSpacePointSet::empty(), |covered, coverage| covered.union(coverage))
    }

    pub fn occupies(&self, point: &DimensionSpacePoint) -> bool {
        self.nodes_by_origin.contains_key(point.hash())
    }

    pub fn covers(&self, point: &DimensionSpacePoint) -> bool {
        self.occupation_by_covered.contains_key(point.hash())
    }

    /// The node originating in `origin`
    pub fn node_by_origin(&self, origin: &DimensionSpacePoint) -> Option<&Node> {
        self.nodes_by_origin.get(origin.hash())
    }

    /// The node visible in `point`
    pub fn node_by_covered_point(&self, point: &DimensionSpacePoint) -> Option<&Node> {
        let origin = self.occupation_by_covered.get(point.hash())?;
        self.nodes_by_origin.get(origin.hash())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes_by_origin.values()
    }

    /// Points the node originating in `origin` is visible in
    pub fn coverage_by_occupant(&self, origin: &DimensionSpacePoint) -> DimensionSpacePointSet {
        self.coverage_by_occupant
            .get(origin.hash())
            .cloned()
            .unwrap_or_default()
    }

    /// Origin of the node visible in `point`
    pub fn occupation_by_covered(&self, point: &DimensionSpacePoint) -> Option<&OriginDimensionSpacePoint> {
        self.occupation_by_covered.get(point.hash())
    }

    /// Points the aggregate was explicitly disabled in
    pub fn disabled_dimension_space_points(&self) -> &DimensionSpacePointSet {
        &self.disabled_dimension_space_points
    }

    pub fn disables(&self, point: &DimensionSpacePoint) -> bool {
        self.disabled_dimension_space_points.contains(point)
    }
}

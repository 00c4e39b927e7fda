//! Content graph projection
//!
//! Materializes nodes, hierarchy edges, references and disabled flags for every content
//! stream. Node records live in one arena shared by all content streams; forking a stream
//! only copies its edges and anchors. A stream modifying a shared node gets its own copy.

mod projector;
mod records;

pub use records::{HierarchyRelation, NodeRecord, NodeRelationAnchorPoint};
pub(crate) use records::ContentStreamGraph;

use super::{Projection, ProjectionError, ProjectionResult};
use crate::aggregate::NodeAggregate;
use crate::infrastructure::RecordedEvent;
use crate::queries::{ContentSubgraph, Node, VisibilityConstraints};
use crate::value_objects::{
    ContentStreamIdentifier, DimensionSpacePoint, DimensionSpacePointSet, NodeAggregateIdentifier, NodeName,
    NodeTypeName,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Read model of the node graph of all content streams
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentGraphProjection {
    nodes: HashMap<NodeRelationAnchorPoint, NodeRecord>,
    /// Number of content streams referencing each anchor
    usage: HashMap<NodeRelationAnchorPoint, usize>,
    streams: HashMap<ContentStreamIdentifier, ContentStreamGraph>,
    last_anchor: u64,
    checkpoint: u64,
}

impl ContentGraphProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_content_stream(&self, content_stream_identifier: &ContentStreamIdentifier) -> bool {
        self.streams.contains_key(content_stream_identifier)
    }

    /// Number of node records across all content streams
    pub fn count_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_record(&self, anchor: NodeRelationAnchorPoint) -> Option<&NodeRecord> {
        self.nodes.get(&anchor)
    }

    /// All hierarchy edges of a content stream, ordered by point, parent and position
    pub fn hierarchy_relations(&self, content_stream_identifier: &ContentStreamIdentifier) -> Vec<HierarchyRelation> {
        let Some(graph) = self.streams.get(content_stream_identifier) else {
            return Vec::new();
        };
        let mut relations: Vec<HierarchyRelation> = graph
            .children
            .iter()
            .flat_map(|((parent, hash), children)| {
                children.iter().enumerate().filter_map(move |(position, child)| {
                    let edge = graph.parent_edge(*child, hash)?;
                    Some(HierarchyRelation {
                        parent: *parent,
                        child: *child,
                        dimension_space_point: edge.dimension_space_point.clone(),
                        name: edge.name.clone(),
                        position,
                    })
                })
            })
            .collect();
        relations.sort_by(|a, b| {
            (a.dimension_space_point.hash(), a.parent, a.position)
                .cmp(&(b.dimension_space_point.hash(), b.parent, b.position))
        });
        relations
    }

    /// Read access to one content stream as seen from one point
    pub fn subgraph(
        &self,
        content_stream_identifier: ContentStreamIdentifier,
        dimension_space_point: DimensionSpacePoint,
        visibility_constraints: VisibilityConstraints,
    ) -> ContentSubgraph<'_> {
        ContentSubgraph::new(self, content_stream_identifier, dimension_space_point, visibility_constraints)
    }

    pub fn find_node_aggregate_by_id(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
        node_aggregate_identifier: &NodeAggregateIdentifier,
    ) -> Option<NodeAggregate> {
        let graph = self.streams.get(content_stream_identifier)?;
        self.build_node_aggregate(*content_stream_identifier, graph, node_aggregate_identifier)
    }

    /// Aggregates any node of `child` is attached to, in any point
    pub fn find_parent_node_aggregates(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
        child: &NodeAggregateIdentifier,
    ) -> Vec<NodeAggregate> {
        let Some(graph) = self.streams.get(content_stream_identifier) else {
            return Vec::new();
        };
        let mut parents = BTreeSet::new();
        for anchor in graph.node_index.get(child).into_iter().flat_map(|origins| origins.values()) {
            for edge in graph.parents.get(anchor).into_iter().flat_map(|edges| edges.values()) {
                if let Some(record) = self.nodes.get(&edge.parent) {
                    parents.insert(record.node_aggregate_identifier);
                }
            }
        }
        parents
            .iter()
            .filter_map(|parent| self.build_node_aggregate(*content_stream_identifier, graph, parent))
            .collect()
    }

    /// Aggregates attached below any node of `parent`, in any point
    pub fn find_child_node_aggregates(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
        parent: &NodeAggregateIdentifier,
    ) -> Vec<NodeAggregate> {
        let Some(graph) = self.streams.get(content_stream_identifier) else {
            return Vec::new();
        };
        let parent_anchors: BTreeSet<NodeRelationAnchorPoint> = graph
            .node_index
            .get(parent)
            .into_iter()
            .flat_map(|origins| origins.values().copied())
            .collect();
        let mut ordered: Vec<NodeAggregateIdentifier> = Vec::new();
        let mut keys: Vec<_> = graph
            .children
            .keys()
            .filter(|(anchor, _)| parent_anchors.contains(anchor))
            .collect();
        keys.sort();
        for key in keys {
            for child in &graph.children[key] {
                if let Some(record) = self.nodes.get(child) {
                    if !ordered.contains(&record.node_aggregate_identifier) {
                        ordered.push(record.node_aggregate_identifier);
                    }
                }
            }
        }
        ordered
            .iter()
            .filter_map(|child| self.build_node_aggregate(*content_stream_identifier, graph, child))
            .collect()
    }

    pub fn find_tethered_child_node_aggregates(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
        parent: &NodeAggregateIdentifier,
    ) -> Vec<NodeAggregate> {
        self.find_child_node_aggregates(content_stream_identifier, parent)
            .into_iter()
            .filter(NodeAggregate::is_tethered)
            .collect()
    }

    pub fn find_root_node_aggregate_by_type(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
        node_type_name: &NodeTypeName,
    ) -> Option<NodeAggregate> {
        self.find_node_aggregates_by_type(content_stream_identifier, node_type_name)
            .into_iter()
            .find(NodeAggregate::is_root)
    }

    /// Aggregates of exactly the given type, ordered by identifier
    pub fn find_node_aggregates_by_type(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
        node_type_name: &NodeTypeName,
    ) -> Vec<NodeAggregate> {
        let Some(graph) = self.streams.get(content_stream_identifier) else {
            return Vec::new();
        };
        let mut identifiers: Vec<&NodeAggregateIdentifier> = graph
            .node_index
            .iter()
            .filter(|(_, origins)| {
                origins
                    .values()
                    .filter_map(|anchor| self.nodes.get(anchor))
                    .any(|record| &record.node_type_name == node_type_name)
            })
            .map(|(identifier, _)| identifier)
            .collect();
        identifiers.sort();
        identifiers
            .into_iter()
            .filter_map(|identifier| self.build_node_aggregate(*content_stream_identifier, graph, identifier))
            .collect()
    }

    /// Origins of the children of `parent` named `node_name` that are visible in any of
    /// `dimension_space_points_to_check`
    pub fn dimension_space_points_occupied_by_child_node_name(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
        node_name: &NodeName,
        parent: &NodeAggregateIdentifier,
        dimension_space_points_to_check: &DimensionSpacePointSet,
    ) -> DimensionSpacePointSet {
        self.children_named(content_stream_identifier, node_name, parent, dimension_space_points_to_check)
            .into_iter()
            .map(|(_, origin)| origin)
            .collect()
    }

    /// (child aggregate, origin) of children of `parent` named `node_name` in the given points
    pub(crate) fn children_named(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
        node_name: &NodeName,
        parent: &NodeAggregateIdentifier,
        dimension_space_points: &DimensionSpacePointSet,
    ) -> Vec<(NodeAggregateIdentifier, DimensionSpacePoint)> {
        let Some(graph) = self.streams.get(content_stream_identifier) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        for hash in dimension_space_points.hashes() {
            let Some(parent_anchor) = graph.covering_anchor(parent, hash) else {
                continue;
            };
            for child in graph.child_anchors(parent_anchor, hash) {
                let named = graph
                    .parent_edge(*child, hash)
                    .is_some_and(|edge| edge.name.as_ref() == Some(node_name));
                if let (true, Some(record)) = (named, self.nodes.get(child)) {
                    found.push((
                        record.node_aggregate_identifier,
                        record.origin_dimension_space_point.to_dimension_space_point(),
                    ));
                }
            }
        }
        found
    }

    pub(crate) fn stream(&self, content_stream_identifier: &ContentStreamIdentifier) -> Option<&ContentStreamGraph> {
        self.streams.get(content_stream_identifier)
    }

    /// The node behind `anchor` as seen from `point_hash`
    pub(crate) fn node_at(
        &self,
        content_stream_identifier: ContentStreamIdentifier,
        graph: &ContentStreamGraph,
        anchor: NodeRelationAnchorPoint,
        dimension_space_point: &DimensionSpacePoint,
    ) -> Option<Node> {
        let record = self.nodes.get(&anchor)?;
        let node_name = graph
            .parent_edge(anchor, dimension_space_point.hash())
            .and_then(|edge| edge.name.clone());
        Some(Node {
            content_stream_identifier,
            node_aggregate_identifier: record.node_aggregate_identifier,
            origin_dimension_space_point: record.origin_dimension_space_point.clone(),
            dimension_space_point: dimension_space_point.clone(),
            node_type_name: record.node_type_name.clone(),
            node_name,
            classification: record.classification,
            properties: record.properties.clone(),
        })
    }

    fn build_node_aggregate(
        &self,
        content_stream_identifier: ContentStreamIdentifier,
        graph: &ContentStreamGraph,
        node_aggregate_identifier: &NodeAggregateIdentifier,
    ) -> Option<NodeAggregate> {
        let origins = graph.node_index.get(node_aggregate_identifier)?;
        let mut first: Option<&NodeRecord> = None;
        let mut node_name = None;
        let mut nodes_by_origin = BTreeMap::new();
        let mut coverage_by_occupant = BTreeMap::new();
        let mut occupation_by_covered = BTreeMap::new();

        for (origin_hash, anchor) in origins {
            let record = self.nodes.get(anchor)?;
            first.get_or_insert(record);
            let edges = graph.parents.get(anchor);
            let coverage: DimensionSpacePointSet = edges
                .into_iter()
                .flat_map(|edges| edges.values())
                .map(|edge| edge.dimension_space_point.clone())
                .collect();
            if node_name.is_none() {
                node_name = edges
                    .into_iter()
                    .flat_map(|edges| edges.values())
                    .find_map(|edge| edge.name.clone());
            }
            for point in &coverage {
                occupation_by_covered.insert(point.hash().to_string(), record.origin_dimension_space_point.clone());
            }
            coverage_by_occupant.insert(origin_hash.clone(), coverage);
            nodes_by_origin.insert(
                origin_hash.clone(),
                Node {
                    content_stream_identifier,
                    node_aggregate_identifier: record.node_aggregate_identifier,
                    origin_dimension_space_point: record.origin_dimension_space_point.clone(),
                    dimension_space_point: record.origin_dimension_space_point.to_dimension_space_point(),
                    node_type_name: record.node_type_name.clone(),
                    node_name: None,
                    classification: record.classification,
                    properties: record.properties.clone(),
                },
            );
        }
        for node in nodes_by_origin.values_mut() {
            node.node_name = node_name.clone();
        }

        let first = first?;
        Some(NodeAggregate {
            content_stream_identifier,
            node_aggregate_identifier: *node_aggregate_identifier,
            classification: first.classification,
            node_type_name: first.node_type_name.clone(),
            node_name,
            nodes_by_origin,
            coverage_by_occupant,
            occupation_by_covered,
            disabled_dimension_space_points: graph
                .disabled
                .get(node_aggregate_identifier)
                .map(|points| points.values().cloned().collect())
                .unwrap_or_default(),
        })
    }

    fn missing_stream(content_stream_identifier: &ContentStreamIdentifier) -> ProjectionError {
        ProjectionError::Inconsistent(format!("content stream {content_stream_identifier} is not projected"))
    }
}

#[async_trait]
impl Projection for ContentGraphProjection {
    fn name(&self) -> &'static str {
        "content_graph"
    }

    async fn apply(&mut self, event: &RecordedEvent) -> ProjectionResult<()> {
        debug!(
            sequence_number = event.sequence_number,
            event_type = event.event.event_type(),
            "Projecting content graph event"
        );
        self.project(&event.event)
    }

    async fn reset(&mut self) -> ProjectionResult<()> {
        *self = Self::default();
        info!("Content graph projection reset");
        Ok(())
    }

    async fn checkpoint(&self) -> u64 {
        self.checkpoint
    }

    async fn save_checkpoint(&mut self, sequence_number: u64) -> ProjectionResult<()> {
        self.checkpoint = sequence_number;
        Ok(())
    }
}

//! Content subgraph
//!
//! The node tree of one content stream as seen from one dimension space point, filtered by
//! visibility constraints. A subgraph borrows the projection, so the state it reads cannot
//! change while it is alive; lookups are cached for that lifetime.

use super::node::{Node, PaginationParams, Reference, Subtree};
use super::visibility::VisibilityConstraints;
use crate::node_types::NodeTypeConstraints;
use crate::projections::content_graph::{ContentStreamGraph, NodeRelationAnchorPoint};
use crate::projections::ContentGraphProjection;
use crate::value_objects::{
    ContentStreamIdentifier, DimensionSpacePoint, NodeAggregateIdentifier, NodeName, NodePath, ReferenceName,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Filter for child and sibling queries
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub node_type_constraints: Option<NodeTypeConstraints>,
    pub pagination: Option<PaginationParams>,
}

impl NodeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_node_type_constraints(mut self, constraints: NodeTypeConstraints) -> Self {
        self.node_type_constraints = Some(constraints);
        self
    }

    pub fn paginated(mut self, offset: usize, limit: usize) -> Self {
        self.pagination = Some(PaginationParams { offset, limit });
        self
    }

    fn matches(&self, node: &Node) -> bool {
        self.node_type_constraints
            .as_ref()
            .map_or(true, |constraints| constraints.matches(&node.node_type_name))
    }

    fn apply(&self, nodes: Vec<Node>) -> Vec<Node> {
        let matching = nodes.into_iter().filter(|node| self.matches(node));
        match self.pagination {
            Some(PaginationParams { offset, limit }) => matching.skip(offset).take(limit).collect(),
            None => matching.collect(),
        }
    }
}

#[derive(Debug, Default)]
struct SubgraphCache {
    anchor_by_aggregate: HashMap<NodeAggregateIdentifier, Option<NodeRelationAnchorPoint>>,
    visibility: HashMap<NodeRelationAnchorPoint, bool>,
    children_by_parent: HashMap<NodeRelationAnchorPoint, Vec<NodeRelationAnchorPoint>>,
}

/// Read access to one content stream in one dimension space point
pub struct ContentSubgraph<'a> {
    projection: &'a ContentGraphProjection,
    graph: Option<&'a ContentStreamGraph>,
    content_stream_identifier: ContentStreamIdentifier,
    dimension_space_point: DimensionSpacePoint,
    visibility_constraints: VisibilityConstraints,
    cache: Mutex<SubgraphCache>,
}

impl<'a> ContentSubgraph<'a> {
    pub(crate) fn new(
        projection: &'a ContentGraphProjection,
        content_stream_identifier: ContentStreamIdentifier,
        dimension_space_point: DimensionSpacePoint,
        visibility_constraints: VisibilityConstraints,
    ) -> Self {
        Self {
            projection,
            graph: projection.stream(&content_stream_identifier),
            content_stream_identifier,
            dimension_space_point,
            visibility_constraints,
            cache: Mutex::new(SubgraphCache::default()),
        }
    }

    pub fn content_stream_identifier(&self) -> ContentStreamIdentifier {
        self.content_stream_identifier
    }

    pub fn dimension_space_point(&self) -> &DimensionSpacePoint {
        &self.dimension_space_point
    }

    pub fn visibility_constraints(&self) -> VisibilityConstraints {
        self.visibility_constraints
    }

    fn hash(&self) -> &str {
        self.dimension_space_point.hash()
    }

    /// The visible node of an aggregate
    fn anchor_of(&self, node_aggregate_identifier: &NodeAggregateIdentifier) -> Option<NodeRelationAnchorPoint> {
        if let Some(cached) = self.cache.lock().anchor_by_aggregate.get(node_aggregate_identifier) {
            return *cached;
        }
        let anchor = self
            .graph
            .and_then(|graph| graph.covering_anchor(node_aggregate_identifier, self.hash()))
            .filter(|anchor| self.is_visible(*anchor));
        self.cache
            .lock()
            .anchor_by_aggregate
            .insert(*node_aggregate_identifier, anchor);
        anchor
    }

    /// Whether neither the node nor any of its ancestors is disabled, unless disabled content is shown
    fn is_visible(&self, anchor: NodeRelationAnchorPoint) -> bool {
        if self.visibility_constraints.is_disabled_content_shown() {
            return true;
        }
        let Some(graph) = self.graph else {
            return false;
        };
        if let Some(visible) = self.cache.lock().visibility.get(&anchor) {
            return *visible;
        }
        let mut path = Vec::new();
        let mut current = anchor;
        let mut visible = true;
        while !current.is_root() {
            if let Some(known) = self.cache.lock().visibility.get(&current) {
                visible = *known;
                break;
            }
            path.push(current);
            let Some(record) = self.projection.node_record(current) else {
                visible = false;
                break;
            };
            if graph.is_disabled(&record.node_aggregate_identifier, self.hash()) {
                visible = false;
                break;
            }
            match graph.parent_edge(current, self.hash()) {
                Some(edge) => current = edge.parent,
                None => {
                    visible = false;
                    break;
                }
            }
        }
        let mut cache = self.cache.lock();
        for anchor in path {
            cache.visibility.insert(anchor, visible);
        }
        visible
    }

    fn node(&self, anchor: NodeRelationAnchorPoint) -> Option<Node> {
        let graph = self.graph?;
        self.projection
            .node_at(self.content_stream_identifier, graph, anchor, &self.dimension_space_point)
    }

    fn visible_children(&self, parent: NodeRelationAnchorPoint) -> Vec<NodeRelationAnchorPoint> {
        if let Some(children) = self.cache.lock().children_by_parent.get(&parent) {
            return children.clone();
        }
        debug!(parent = %parent, "Subgraph cache miss for child nodes");
        let children: Vec<NodeRelationAnchorPoint> = self
            .graph
            .map(|graph| graph.child_anchors(parent, self.hash()).to_vec())
            .unwrap_or_default()
            .into_iter()
            .filter(|child| self.is_visible(*child))
            .collect();
        self.cache.lock().children_by_parent.insert(parent, children.clone());
        children
    }

    fn parent_anchor(&self, child: NodeRelationAnchorPoint) -> Option<NodeRelationAnchorPoint> {
        let parent = self.graph?.parent_edge(child, self.hash())?.parent;
        (!parent.is_root()).then_some(parent)
    }

    pub fn find_node_by_node_aggregate_identifier(
        &self,
        node_aggregate_identifier: &NodeAggregateIdentifier,
    ) -> Option<Node> {
        self.node(self.anchor_of(node_aggregate_identifier)?)
    }

    /// Children in their configured order
    pub fn find_child_nodes(&self, parent: &NodeAggregateIdentifier, filter: &NodeFilter) -> Vec<Node> {
        let Some(parent) = self.anchor_of(parent) else {
            return Vec::new();
        };
        let children = self
            .visible_children(parent)
            .into_iter()
            .filter_map(|child| self.node(child))
            .collect();
        filter.apply(children)
    }

    pub fn count_child_nodes(&self, parent: &NodeAggregateIdentifier, filter: &NodeFilter) -> usize {
        let unpaginated = NodeFilter {
            node_type_constraints: filter.node_type_constraints.clone(),
            pagination: None,
        };
        self.find_child_nodes(parent, &unpaginated).len()
    }

    pub fn find_parent_node(&self, child: &NodeAggregateIdentifier) -> Option<Node> {
        let parent = self.parent_anchor(self.anchor_of(child)?)?;
        if !self.is_visible(parent) {
            return None;
        }
        self.node(parent)
    }

    pub fn find_child_node_connected_through_edge_name(
        &self,
        parent: &NodeAggregateIdentifier,
        edge_name: &NodeName,
    ) -> Option<Node> {
        let parent = self.anchor_of(parent)?;
        self.visible_children(parent)
            .into_iter()
            .filter_map(|child| self.node(child))
            .find(|node| node.node_name.as_ref() == Some(edge_name))
    }

    /// Follow `path` by node names, starting at `starting_node`
    pub fn find_node_by_path(&self, path: &NodePath, starting_node: &NodeAggregateIdentifier) -> Option<Node> {
        let mut current = self.find_node_by_node_aggregate_identifier(starting_node)?;
        for name in path.names() {
            current = self.find_child_node_connected_through_edge_name(&current.node_aggregate_identifier, name)?;
        }
        Some(current)
    }

    /// Names from below the root node down to the node; `None` if any ancestor is unnamed
    pub fn find_node_path(&self, node_aggregate_identifier: &NodeAggregateIdentifier) -> Option<NodePath> {
        let mut names = Vec::new();
        let mut current = self.anchor_of(node_aggregate_identifier)?;
        while let Some(parent) = self.parent_anchor(current) {
            names.push(self.node(current)?.node_name?);
            current = parent;
        }
        names.reverse();
        Some(NodePath::from_names(names))
    }

    fn sibling_anchors(&self, sibling: &NodeAggregateIdentifier) -> Option<(Vec<NodeRelationAnchorPoint>, usize)> {
        let anchor = self.anchor_of(sibling)?;
        let parent = self.graph?.parent_edge(anchor, self.hash())?.parent;
        let siblings = self.visible_children(parent);
        let position = siblings.iter().position(|candidate| *candidate == anchor)?;
        Some((siblings, position))
    }

    /// All other children of the node's parent
    pub fn find_siblings(&self, sibling: &NodeAggregateIdentifier, filter: &NodeFilter) -> Vec<Node> {
        let Some((siblings, position)) = self.sibling_anchors(sibling) else {
            return Vec::new();
        };
        let nodes = siblings
            .into_iter()
            .enumerate()
            .filter(|(index, _)| *index != position)
            .filter_map(|(_, anchor)| self.node(anchor))
            .collect();
        filter.apply(nodes)
    }

    /// Siblings before the node, nearest first
    pub fn find_preceding_siblings(&self, sibling: &NodeAggregateIdentifier, filter: &NodeFilter) -> Vec<Node> {
        let Some((siblings, position)) = self.sibling_anchors(sibling) else {
            return Vec::new();
        };
        let nodes = siblings[..position]
            .iter()
            .rev()
            .filter_map(|anchor| self.node(*anchor))
            .collect();
        filter.apply(nodes)
    }

    /// Siblings after the node, nearest first
    pub fn find_succeeding_siblings(&self, sibling: &NodeAggregateIdentifier, filter: &NodeFilter) -> Vec<Node> {
        let Some((siblings, position)) = self.sibling_anchors(sibling) else {
            return Vec::new();
        };
        let nodes = siblings[position + 1..]
            .iter()
            .filter_map(|anchor| self.node(*anchor))
            .collect();
        filter.apply(nodes)
    }

    /// Outgoing references of a node, optionally restricted to one name
    pub fn find_references(
        &self,
        source: &NodeAggregateIdentifier,
        reference_name: Option<&ReferenceName>,
    ) -> Vec<Reference> {
        let Some(record) = self.anchor_of(source).and_then(|anchor| self.projection.node_record(anchor)) else {
            return Vec::new();
        };
        record
            .references
            .iter()
            .filter(|(name, _)| reference_name.map_or(true, |wanted| wanted == *name))
            .flat_map(|(name, destinations)| {
                destinations.iter().enumerate().filter_map(move |(position, destination)| {
                    Some(Reference {
                        name: name.clone(),
                        position,
                        node: self.find_node_by_node_aggregate_identifier(destination)?,
                    })
                })
            })
            .collect()
    }

    pub fn find_referenced_nodes(
        &self,
        source: &NodeAggregateIdentifier,
        reference_name: Option<&ReferenceName>,
    ) -> Vec<Node> {
        self.find_references(source, reference_name)
            .into_iter()
            .map(|reference| reference.node)
            .collect()
    }

    /// Nodes referencing `destination`, ordered by aggregate identifier
    pub fn find_referencing_nodes(
        &self,
        destination: &NodeAggregateIdentifier,
        reference_name: Option<&ReferenceName>,
    ) -> Vec<Node> {
        if self.anchor_of(destination).is_none() {
            return Vec::new();
        }
        let mut referencing: Vec<Node> = self
            .visible_anchors()
            .into_iter()
            .filter(|anchor| {
                self.projection.node_record(*anchor).is_some_and(|record| {
                    record.references.iter().any(|(name, destinations)| {
                        reference_name.map_or(true, |wanted| wanted == name) && destinations.contains(destination)
                    })
                })
            })
            .filter_map(|anchor| self.node(anchor))
            .collect();
        referencing.sort_by_key(|node| node.node_aggregate_identifier);
        referencing
    }

    fn visible_anchors(&self) -> Vec<NodeRelationAnchorPoint> {
        let Some(graph) = self.graph else {
            return Vec::new();
        };
        graph
            .parents
            .iter()
            .filter(|(_, edges)| edges.contains_key(self.hash()))
            .map(|(anchor, _)| *anchor)
            .filter(|anchor| self.is_visible(*anchor))
            .collect()
    }

    /// Trees below the entry nodes, `max_levels` deep, descending only through matching nodes
    pub fn find_subtrees(
        &self,
        entry_node_aggregate_identifiers: &[NodeAggregateIdentifier],
        max_levels: usize,
        node_type_constraints: &NodeTypeConstraints,
    ) -> Vec<Subtree> {
        entry_node_aggregate_identifiers
            .iter()
            .filter_map(|entry| {
                let anchor = self.anchor_of(entry)?;
                self.subtree(anchor, 0, max_levels, node_type_constraints)
            })
            .collect()
    }

    fn subtree(
        &self,
        anchor: NodeRelationAnchorPoint,
        level: usize,
        max_levels: usize,
        node_type_constraints: &NodeTypeConstraints,
    ) -> Option<Subtree> {
        let node = self.node(anchor)?;
        let children = if level < max_levels {
            self.visible_children(anchor)
                .into_iter()
                .filter(|child| {
                    self.projection
                        .node_record(*child)
                        .is_some_and(|record| node_type_constraints.matches(&record.node_type_name))
                })
                .filter_map(|child| self.subtree(child, level + 1, max_levels, node_type_constraints))
                .collect()
        } else {
            Vec::new()
        };
        Some(Subtree { level, node, children })
    }

    /// Matching descendants of the entry nodes in depth-first order.
    ///
    /// The search term is matched case-insensitively against string property values.
    pub fn find_descendants(
        &self,
        entry_node_aggregate_identifiers: &[NodeAggregateIdentifier],
        node_type_constraints: &NodeTypeConstraints,
        search_term: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<Node> {
        let search_term = search_term.map(str::to_lowercase);
        let limit = limit.unwrap_or(usize::MAX);
        let mut found = Vec::new();
        let mut stack: Vec<NodeRelationAnchorPoint> = entry_node_aggregate_identifiers
            .iter()
            .rev()
            .filter_map(|entry| self.anchor_of(entry))
            .flat_map(|anchor| self.visible_children(anchor).into_iter().rev())
            .collect();
        while let Some(anchor) = stack.pop() {
            if found.len() >= limit {
                break;
            }
            let Some(node) = self.node(anchor) else {
                continue;
            };
            stack.extend(self.visible_children(anchor).into_iter().rev());
            let type_matches = node_type_constraints.matches(&node.node_type_name);
            let term_matches = search_term.as_ref().map_or(true, |term| {
                node.properties
                    .iter()
                    .any(|(_, value)| value.value.as_str().is_some_and(|text| text.to_lowercase().contains(term)))
            });
            if type_matches && term_matches {
                found.push(node);
            }
        }
        found
    }

    /// Number of visible nodes in this subgraph
    pub fn count_nodes(&self) -> usize {
        self.visible_anchors().len()
    }
}

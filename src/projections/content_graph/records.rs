//! Rows of the content graph projection

use crate::value_objects::{
    DimensionSpacePoint, NodeAggregateClassification, NodeAggregateIdentifier, NodeName, NodeTypeName,
    OriginDimensionSpacePoint, ReferenceName, SerializedPropertyValues,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Arena key of a node record.
///
/// Records are shared between content streams until one of them modifies the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRelationAnchorPoint(u64);

impl NodeRelationAnchorPoint {
    /// Virtual parent of all root nodes
    pub const ROOT: Self = Self(0);

    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl fmt::Display for NodeRelationAnchorPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One materialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub anchor: NodeRelationAnchorPoint,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub node_type_name: NodeTypeName,
    pub properties: SerializedPropertyValues,
    /// Named, ordered references to other node aggregates
    pub references: BTreeMap<ReferenceName, Vec<NodeAggregateIdentifier>>,
    pub classification: NodeAggregateClassification,
}

/// A parent-child edge in one dimension space point, as exposed to readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyRelation {
    pub parent: NodeRelationAnchorPoint,
    pub child: NodeRelationAnchorPoint,
    pub dimension_space_point: DimensionSpacePoint,
    pub name: Option<NodeName>,
    pub position: usize,
}

/// The incoming edge of a node in one dimension space point
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParentEdge {
    pub(crate) parent: NodeRelationAnchorPoint,
    pub(crate) dimension_space_point: DimensionSpacePoint,
    pub(crate) name: Option<NodeName>,
}

/// Structure of one content stream.
///
/// Node records live in the shared arena; a stream only holds anchors.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ContentStreamGraph {
    /// Node aggregate -> origin hash -> anchor
    pub(crate) node_index: HashMap<NodeAggregateIdentifier, BTreeMap<String, NodeRelationAnchorPoint>>,
    /// Child -> point hash -> incoming edge
    pub(crate) parents: HashMap<NodeRelationAnchorPoint, BTreeMap<String, ParentEdge>>,
    /// (Parent, point hash) -> children in order
    pub(crate) children: HashMap<(NodeRelationAnchorPoint, String), Vec<NodeRelationAnchorPoint>>,
    /// Explicitly disabled points per aggregate
    pub(crate) disabled: HashMap<NodeAggregateIdentifier, BTreeMap<String, DimensionSpacePoint>>,
}

impl ContentStreamGraph {
    pub(crate) fn anchors(&self) -> impl Iterator<Item = NodeRelationAnchorPoint> + '_ {
        self.node_index.values().flat_map(|origins| origins.values().copied())
    }

    /// The aggregate's node visible in `point_hash`
    pub(crate) fn covering_anchor(
        &self,
        node_aggregate_identifier: &NodeAggregateIdentifier,
        point_hash: &str,
    ) -> Option<NodeRelationAnchorPoint> {
        self.node_index.get(node_aggregate_identifier)?.values().copied().find(|anchor| {
            self.parents
                .get(anchor)
                .is_some_and(|edges| edges.contains_key(point_hash))
        })
    }

    pub(crate) fn parent_edge(&self, child: NodeRelationAnchorPoint, point_hash: &str) -> Option<&ParentEdge> {
        self.parents.get(&child)?.get(point_hash)
    }

    pub(crate) fn child_anchors(&self, parent: NodeRelationAnchorPoint, point_hash: &str) -> &[NodeRelationAnchorPoint] {
        self.children
            .get(&(parent, point_hash.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Attach `child` below `parent` in one point, before `succeeding` if that is a sibling
    pub(crate) fn connect(
        &mut self,
        parent: NodeRelationAnchorPoint,
        child: NodeRelationAnchorPoint,
        dimension_space_point: &DimensionSpacePoint,
        name: Option<NodeName>,
        succeeding: Option<NodeRelationAnchorPoint>,
    ) {
        let hash = dimension_space_point.hash().to_string();
        let siblings = self.children.entry((parent, hash.clone())).or_default();
        siblings.retain(|anchor| *anchor != child);
        match succeeding.and_then(|s| siblings.iter().position(|anchor| *anchor == s)) {
            Some(index) => siblings.insert(index, child),
            None => siblings.push(child),
        }
        self.parents.entry(child).or_default().insert(
            hash,
            ParentEdge {
                parent,
                dimension_space_point: dimension_space_point.clone(),
                name,
            },
        );
    }

    /// Detach `child` from its parent in one point, returning the removed edge
    pub(crate) fn disconnect(&mut self, child: NodeRelationAnchorPoint, point_hash: &str) -> Option<ParentEdge> {
        let edges = self.parents.get_mut(&child)?;
        let edge = edges.remove(point_hash)?;
        if edges.is_empty() {
            self.parents.remove(&child);
        }
        let key = (edge.parent, point_hash.to_string());
        if let Some(siblings) = self.children.get_mut(&key) {
            siblings.retain(|anchor| *anchor != child);
            if siblings.is_empty() {
                self.children.remove(&key);
            }
        }
        Some(edge)
    }

    /// Replace `old` by `new` in every edge of the stream, in both directions
    pub(crate) fn replace_anchor(&mut self, old: NodeRelationAnchorPoint, new: NodeRelationAnchorPoint) {
        if let Some(edges) = self.parents.remove(&old) {
            for (hash, edge) in &edges {
                if let Some(siblings) = self.children.get_mut(&(edge.parent, hash.clone())) {
                    for anchor in siblings.iter_mut().filter(|anchor| **anchor == old) {
                        *anchor = new;
                    }
                }
            }
            self.parents.insert(new, edges);
        }
        let outgoing: Vec<String> = self
            .children
            .keys()
            .filter(|(parent, _)| *parent == old)
            .map(|(_, hash)| hash.clone())
            .collect();
        for hash in outgoing {
            if let Some(children) = self.children.remove(&(old, hash.clone())) {
                for child in &children {
                    if let Some(edge) = self.parents.get_mut(child).and_then(|edges| edges.get_mut(&hash)) {
                        edge.parent = new;
                    }
                }
                self.children.insert((new, hash), children);
            }
        }
        for origins in self.node_index.values_mut() {
            for anchor in origins.values_mut().filter(|anchor| **anchor == old) {
                *anchor = new;
            }
        }
    }

    /// Move the edges of `from` in one point over to `to`, keeping position and children
    pub(crate) fn transfer_point(
        &mut self,
        from: NodeRelationAnchorPoint,
        to: NodeRelationAnchorPoint,
        point_hash: &str,
    ) {
        if let Some(edge) = self.parents.get_mut(&from).and_then(|edges| edges.remove(point_hash)) {
            if let Some(siblings) = self.children.get_mut(&(edge.parent, point_hash.to_string())) {
                for anchor in siblings.iter_mut().filter(|anchor| **anchor == from) {
                    *anchor = to;
                }
            }
            self.parents.entry(to).or_default().insert(point_hash.to_string(), edge);
        }
        if self.parents.get(&from).is_some_and(BTreeMap::is_empty) {
            self.parents.remove(&from);
        }
        if let Some(children) = self.children.remove(&(from, point_hash.to_string())) {
            for child in &children {
                if let Some(edge) = self.parents.get_mut(child).and_then(|edges| edges.get_mut(point_hash)) {
                    edge.parent = to;
                }
            }
            self.children.insert((to, point_hash.to_string()), children);
        }
    }

    pub(crate) fn is_disabled(&self, node_aggregate_identifier: &NodeAggregateIdentifier, point_hash: &str) -> bool {
        self.disabled
            .get(node_aggregate_identifier)
            .is_some_and(|points| points.contains_key(point_hash))
    }
}

//! Node read models returned by queries

use crate::value_objects::{
    ContentStreamIdentifier, DimensionSpacePoint, NodeAggregateClassification, NodeAggregateIdentifier, NodeName,
    NodeTypeName, OriginDimensionSpacePoint, ReferenceName, SerializedPropertyValues,
};
use serde::{Deserialize, Serialize};

/// One node as seen from a dimension space point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub node_aggregate_identifier: NodeAggregateIdentifier,
    /// Where the node's data originates
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    /// The point the node was read in; the origin when read through its aggregate
    pub dimension_space_point: DimensionSpacePoint,
    pub node_type_name: NodeTypeName,
    pub node_name: Option<NodeName>,
    pub classification: NodeAggregateClassification,
    pub properties: SerializedPropertyValues,
}

impl Node {
    /// Plain value of a property
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.value(name)
    }

    pub fn is_root(&self) -> bool {
        self.classification.is_root()
    }

    pub fn is_tethered(&self) -> bool {
        self.classification.is_tethered()
    }
}

/// A resolved reference edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub name: ReferenceName,
    /// Position within the named reference list
    pub position: usize,
    /// The referencing node for incoming references, the referenced node otherwise
    pub node: Node,
}

/// A node together with its descendants, up to some depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtree {
    pub level: usize,
    pub node: Node,
    pub children: Vec<Subtree>,
}

impl Subtree {
    /// Number of nodes in the subtree including its root
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Subtree::node_count).sum::<usize>()
    }
}

/// Offset and limit of a result list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    pub offset: usize,
    pub limit: usize,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

//! Resolved node type declarations

use crate::config::{PropertyConfig, ReferenceConfig};
use crate::value_objects::{NodeName, NodeTypeName, PropertyScope};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeMap;

/// A tethered child node declared by a node type
#[derive(Debug, Clone, PartialEq)]
pub struct TetheredNodeDefinition {
    /// Name of the tethered child below its parent
    pub name: NodeName,
    /// Node type of the tethered child
    pub node_type_name: NodeTypeName,
    /// Constraints on regular children of the tethered child
    pub constraints: BTreeMap<String, bool>,
}

/// A node type with its super types already merged in
#[derive(Debug, Clone, PartialEq)]
pub struct NodeType {
    pub(super) name: NodeTypeName,
    pub(super) is_abstract: bool,
    pub(super) is_root: bool,
    pub(super) declared_super_types: Vec<NodeTypeName>,
    /// All super types, nearest first
    pub(super) super_types: Vec<NodeTypeName>,
    pub(super) properties: BTreeMap<String, PropertyConfig>,
    pub(super) references: BTreeMap<String, ReferenceConfig>,
    pub(super) tethered_nodes: IndexMap<NodeName, TetheredNodeDefinition>,
    pub(super) constraints: BTreeMap<String, bool>,
}

impl NodeType {
    pub fn name(&self) -> &NodeTypeName {
        &self.name
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether the type may only be used for root node aggregates
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn declared_super_types(&self) -> &[NodeTypeName] {
        &self.declared_super_types
    }

    /// Whether this type is `name` or inherits from it
    pub fn is_of_type(&self, name: &str) -> bool {
        self.name.as_str() == name || self.super_types.iter().any(|t| t.as_str() == name)
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyConfig> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyConfig> {
        self.properties.get(name)
    }

    pub fn property_scope(&self, name: &str) -> PropertyScope {
        self.properties
            .get(name)
            .map(|property| property.scope)
            .unwrap_or_default()
    }

    /// Declared default values of all properties having one
    pub fn default_values(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.properties
            .iter()
            .filter_map(|(name, property)| property.default_value.as_ref().map(|value| (name, value)))
    }

    pub fn references(&self) -> &BTreeMap<String, ReferenceConfig> {
        &self.references
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceConfig> {
        self.references.get(name)
    }

    /// Tethered child nodes in declaration order
    pub fn tethered_nodes(&self) -> impl Iterator<Item = &TetheredNodeDefinition> {
        self.tethered_nodes.values()
    }

    pub fn tethered_node(&self, name: &NodeName) -> Option<&TetheredNodeDefinition> {
        self.tethered_nodes.get(name)
    }

    /// Whether regular children of type `child` are allowed below nodes of this type
    pub fn allows_child_node_type(&self, child: &NodeType) -> bool {
        child.is_allowed_by(&self.constraints)
    }

    /// Evaluate a constraint map against this type.
    ///
    /// The type's own name wins over the nearest super type, which wins over `*`.
    /// An empty map allows every type; otherwise unmatched types are rejected.
    pub fn is_allowed_by(&self, constraints: &BTreeMap<String, bool>) -> bool {
        if constraints.is_empty() {
            return true;
        }
        std::iter::once(&self.name)
            .chain(self.super_types.iter())
            .find_map(|name| constraints.get(name.as_str()))
            .or_else(|| constraints.get("*"))
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_type(name: &str, super_types: &[&str]) -> NodeType {
        NodeType {
            name: NodeTypeName::new(name),
            is_abstract: false,
            is_root: false,
            declared_super_types: super_types.iter().map(|t| NodeTypeName::new(*t)).collect(),
            super_types: super_types.iter().map(|t| NodeTypeName::new(*t)).collect(),
            properties: BTreeMap::new(),
            references: BTreeMap::new(),
            tethered_nodes: IndexMap::new(),
            constraints: BTreeMap::new(),
        }
    }

    #[test]
    fn test_constraint_precedence() {
        let text = node_type("Acme:Text", &["Acme:Content"]);
        let image = node_type("Acme:Image", &["Acme:Content"]);
        let page = node_type("Acme:Page", &[]);

        let constraints = BTreeMap::from([
            ("*".to_string(), false),
            ("Acme:Content".to_string(), true),
            ("Acme:Image".to_string(), false),
        ]);

        assert!(text.is_allowed_by(&constraints));
        assert!(!image.is_allowed_by(&constraints));
        assert!(!page.is_allowed_by(&constraints));
        assert!(page.is_allowed_by(&BTreeMap::new()));
    }

    #[test]
    fn test_is_of_type() {
        let text = node_type("Acme:Text", &["Acme:Content", "Acme:Node"]);
        assert!(text.is_of_type("Acme:Text"));
        assert!(text.is_of_type("Acme:Node"));
        assert!(!text.is_of_type("Acme:Page"));
    }
}

//! Loads and resolves the node type schema

use super::constraints::NodeTypeConstraints;
use super::node_type::{NodeType, TetheredNodeDefinition};
use crate::config::{ConfigurationError, ConfigurationResult, NodeTypeConfig};
use crate::value_objects::{NodeName, NodeTypeName};
use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Immutable registry of resolved node types
#[derive(Debug, Clone, Default)]
pub struct NodeTypeManager {
    node_types: BTreeMap<NodeTypeName, NodeType>,
}

impl NodeTypeManager {
    /// Resolve inheritance and validate tethered child declarations
    pub fn from_config(configs: &BTreeMap<String, NodeTypeConfig>) -> ConfigurationResult<Self> {
        // node type -> super type
        let mut inheritance: DiGraph<&str, ()> = DiGraph::new();
        let indices: BTreeMap<&str, NodeIndex> = configs
            .keys()
            .map(|name| (name.as_str(), inheritance.add_node(name.as_str())))
            .collect();
        for (name, config) in configs {
            for super_type in &config.super_types {
                let target = indices.get(super_type.as_str()).ok_or_else(|| {
                    ConfigurationError::UnknownSuperType {
                        node_type: name.clone(),
                        super_type: super_type.clone(),
                    }
                })?;
                inheritance.add_edge(indices[name.as_str()], *target, ());
            }
        }
        let order = toposort(&inheritance, None).map_err(|cycle| {
            ConfigurationError::InheritanceCycle(inheritance[cycle.node_id()].to_string())
        })?;

        let mut node_types: BTreeMap<NodeTypeName, NodeType> = BTreeMap::new();
        for index in order.into_iter().rev() {
            let name = inheritance[index];
            let config = &configs[name];
            let resolved = Self::resolve(name, config, &node_types)?;
            node_types.insert(resolved.name.clone(), resolved);
        }

        let manager = Self { node_types };
        manager.validate_tethered_nodes()?;

        debug!(node_type_count = manager.node_types.len(), "Resolved node types");
        Ok(manager)
    }

    fn resolve(
        name: &str,
        config: &NodeTypeConfig,
        resolved: &BTreeMap<NodeTypeName, NodeType>,
    ) -> ConfigurationResult<NodeType> {
        let mut node_type = NodeType {
            name: NodeTypeName::new(name),
            is_abstract: config.is_abstract,
            is_root: config.root,
            declared_super_types: config.super_types.iter().map(NodeTypeName::new).collect(),
            super_types: Vec::new(),
            properties: BTreeMap::new(),
            references: BTreeMap::new(),
            tethered_nodes: IndexMap::new(),
            constraints: BTreeMap::new(),
        };

        for super_type_name in &config.super_types {
            let Some(super_type) = resolved.get(&NodeTypeName::new(super_type_name)) else {
                continue;
            };
            for ancestor in std::iter::once(&super_type.name).chain(super_type.super_types.iter()) {
                if !node_type.super_types.contains(ancestor) {
                    node_type.super_types.push(ancestor.clone());
                }
            }
            node_type.is_root |= super_type.is_root;
            node_type.properties.extend(super_type.properties.clone());
            node_type.references.extend(super_type.references.clone());
            node_type.tethered_nodes.extend(super_type.tethered_nodes.clone());
            node_type.constraints.extend(super_type.constraints.clone());
        }

        node_type.properties.extend(config.properties.clone());
        node_type.references.extend(config.references.clone());
        node_type.constraints.extend(config.constraints.clone());
        for (child_name, child) in &config.child_nodes {
            let node_name = NodeName::new(child_name.as_str()).map_err(|reason| {
                ConfigurationError::InvalidTetheredNodeName {
                    node_type: name.to_string(),
                    child: child_name.clone(),
                    reason,
                }
            })?;
            node_type.tethered_nodes.insert(
                node_name.clone(),
                TetheredNodeDefinition {
                    name: node_name,
                    node_type_name: NodeTypeName::new(child.node_type.as_str()),
                    constraints: child.constraints.clone(),
                },
            );
        }

        Ok(node_type)
    }

    fn validate_tethered_nodes(&self) -> ConfigurationResult<()> {
        // node type -> tethered child node type
        let mut tethering: DiGraph<&NodeTypeName, ()> = DiGraph::new();
        let indices: BTreeMap<&NodeTypeName, NodeIndex> = self
            .node_types
            .keys()
            .map(|name| (name, tethering.add_node(name)))
            .collect();

        for node_type in self.node_types.values() {
            for tethered in node_type.tethered_nodes() {
                let target = indices.get(&tethered.node_type_name).ok_or_else(|| {
                    ConfigurationError::UnknownTetheredNodeType {
                        node_type: node_type.name.to_string(),
                        child: tethered.name.to_string(),
                        child_type: tethered.node_type_name.to_string(),
                    }
                })?;
                tethering.add_edge(indices[&node_type.name], *target, ());
            }
        }

        toposort(&tethering, None)
            .map(|_| ())
            .map_err(|cycle| ConfigurationError::TetheredNodeCycle(tethering[cycle.node_id()].to_string()))
    }

    /// Look up a node type
    pub fn get_node_type(&self, name: &NodeTypeName) -> Option<&NodeType> {
        self.node_types.get(name)
    }

    pub fn has_node_type(&self, name: &NodeTypeName) -> bool {
        self.node_types.contains_key(name)
    }

    /// All node types ordered by name
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.node_types.values()
    }

    /// Types inheriting from `name`, excluding `name` itself
    pub fn sub_types(&self, name: &NodeTypeName, include_abstract: bool) -> Vec<&NodeType> {
        self.node_types
            .values()
            .filter(|node_type| node_type.name() != name && node_type.is_of_type(name.as_str()))
            .filter(|node_type| include_abstract || !node_type.is_abstract())
            .collect()
    }

    /// Parse a filter and expand every mentioned type with its sub types
    pub fn constraints_with_sub_types(&self, filter: &str) -> NodeTypeConstraints {
        let parsed = NodeTypeConstraints::parse(filter);
        NodeTypeConstraints::from_sets(
            self.expand_with_sub_types(parsed.allowed()),
            self.expand_with_sub_types(parsed.disallowed()),
        )
    }

    fn expand_with_sub_types(&self, names: &BTreeSet<NodeTypeName>) -> BTreeSet<NodeTypeName> {
        let mut expanded = names.clone();
        for name in names {
            expanded.extend(self.sub_types(name, true).into_iter().map(|t| t.name().clone()));
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChildNodeConfig, PropertyConfig};
    use crate::value_objects::PropertyScope;

    fn config(super_types: &[&str]) -> NodeTypeConfig {
        NodeTypeConfig {
            super_types: super_types.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn property(type_name: &str, scope: PropertyScope) -> PropertyConfig {
        PropertyConfig {
            property_type: type_name.to_string(),
            scope,
            default_value: None,
        }
    }

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     NTM[NodeTypeManager] --> INH[Inheritance Merge]
    ///     NTM --> CYC[Cycle Detection]
    ///     NTM --> TETH[Tethered Validation]
    ///     NTM --> SUB[Sub Type Expansion]
    /// ```

    #[test]
    fn test_inheritance_merges_declarations() {
        let mut node = config(&[]);
        node.is_abstract = true;
        node.properties
            .insert("title".to_string(), property("string", PropertyScope::Node));
        let mut document = config(&["Acme:Node"]);
        document
            .properties
            .insert("uriPathSegment".to_string(), property("string", PropertyScope::NodeAggregate));
        let mut page = config(&["Acme:Document"]);
        page.properties
            .insert("title".to_string(), property("integer", PropertyScope::Node));

        let configs = BTreeMap::from([
            ("Acme:Node".to_string(), node),
            ("Acme:Document".to_string(), document),
            ("Acme:Page".to_string(), page),
        ]);
        let manager = NodeTypeManager::from_config(&configs).unwrap();
        let page = manager.get_node_type(&NodeTypeName::new("Acme:Page")).unwrap();

        assert!(page.is_of_type("Acme:Node"));
        assert!(!page.is_abstract());
        assert_eq!(page.property("title").unwrap().property_type, "integer");
        assert_eq!(page.property_scope("uriPathSegment"), PropertyScope::NodeAggregate);
    }

    #[test]
    fn test_inheritance_cycle_is_rejected() {
        let configs = BTreeMap::from([
            ("Acme:A".to_string(), config(&["Acme:B"])),
            ("Acme:B".to_string(), config(&["Acme:A"])),
        ]);
        assert!(matches!(
            NodeTypeManager::from_config(&configs),
            Err(ConfigurationError::InheritanceCycle(_))
        ));
    }

    #[test]
    fn test_unknown_super_type_is_rejected() {
        let configs = BTreeMap::from([("Acme:A".to_string(), config(&["Acme:Missing"]))]);
        assert!(matches!(
            NodeTypeManager::from_config(&configs),
            Err(ConfigurationError::UnknownSuperType { .. })
        ));
    }

    #[test]
    fn test_tethered_cycle_is_rejected() {
        let mut a = config(&[]);
        a.child_nodes.insert(
            "main".to_string(),
            ChildNodeConfig {
                node_type: "Acme:A".to_string(),
                constraints: BTreeMap::new(),
            },
        );
        let configs = BTreeMap::from([("Acme:A".to_string(), a)]);
        assert!(matches!(
            NodeTypeManager::from_config(&configs),
            Err(ConfigurationError::TetheredNodeCycle(_))
        ));
    }

    #[test]
    fn test_constraints_are_expanded_with_sub_types() {
        let configs = BTreeMap::from([
            ("Acme:Content".to_string(), config(&[])),
            ("Acme:Text".to_string(), config(&["Acme:Content"])),
            ("Acme:Image".to_string(), config(&["Acme:Content"])),
        ]);
        let manager = NodeTypeManager::from_config(&configs).unwrap();
        let constraints = manager.constraints_with_sub_types("Acme:Content,!Acme:Image");

        assert!(constraints.matches(&NodeTypeName::new("Acme:Text")));
        assert!(!constraints.matches(&NodeTypeName::new("Acme:Image")));
    }
}

//! Node type filters for subgraph traversal

use crate::value_objects::NodeTypeName;
use std::collections::BTreeSet;

/// Allowed and excluded node types, parsed from filters like `"Acme:Content,!Acme:Image"`.
///
/// Exclusions win over inclusions. Without any inclusion every non-excluded type matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTypeConstraints {
    allowed: BTreeSet<NodeTypeName>,
    disallowed: BTreeSet<NodeTypeName>,
}

impl NodeTypeConstraints {
    /// Constraints matching every node type
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse a comma separated filter; `!` marks an exclusion
    pub fn parse(filter: &str) -> Self {
        let mut constraints = Self::default();
        for part in filter.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            match part.strip_prefix('!') {
                Some(excluded) => {
                    constraints.disallowed.insert(NodeTypeName::new(excluded.trim()));
                }
                None => {
                    constraints.allowed.insert(NodeTypeName::new(part));
                }
            }
        }
        constraints
    }

    pub(crate) fn from_sets(allowed: BTreeSet<NodeTypeName>, disallowed: BTreeSet<NodeTypeName>) -> Self {
        Self { allowed, disallowed }
    }

    pub fn allowed(&self) -> &BTreeSet<NodeTypeName> {
        &self.allowed
    }

    pub fn disallowed(&self) -> &BTreeSet<NodeTypeName> {
        &self.disallowed
    }

    /// Whether a node of the given type passes the filter
    pub fn matches(&self, node_type_name: &NodeTypeName) -> bool {
        if self.disallowed.contains(node_type_name) {
            return false;
        }
        self.allowed.is_empty() || self.allowed.contains(node_type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let constraints = NodeTypeConstraints::parse(" Acme:Page , !Acme:Shortcut,");
        assert!(constraints.matches(&NodeTypeName::new("Acme:Page")));
        assert!(!constraints.matches(&NodeTypeName::new("Acme:Shortcut")));
        assert!(!constraints.matches(&NodeTypeName::new("Acme:Text")));
    }

    #[test]
    fn test_exclusions_only() {
        let constraints = NodeTypeConstraints::parse("!Acme:Shortcut");
        assert!(constraints.matches(&NodeTypeName::new("Acme:Text")));
        assert!(!constraints.matches(&NodeTypeName::new("Acme:Shortcut")));
        assert!(NodeTypeConstraints::allow_all().matches(&NodeTypeName::new("Acme:Text")));
    }
}

//! Node names and paths

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a node below its parent, unique among siblings per dimension space point
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeName(String);

impl NodeName {
    /// Create a node name, rejecting empty names and names containing a path separator
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err("Node name cannot be empty".to_string());
        }
        if value.contains('/') {
            return Err(format!("Node name \"{value}\" must not contain \"/\""));
        }
        Ok(Self(value.to_lowercase()))
    }

    /// Borrow the raw value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NodeName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NodeName> for String {
    fn from(name: NodeName) -> Self {
        name.0
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relative path of node names, e.g. `main/teaser`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodePath(Vec<NodeName>);

impl NodePath {
    /// Parse a slash separated path; leading and trailing slashes are ignored
    pub fn parse(value: &str) -> Result<Self, String> {
        value
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(NodeName::new)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Build a path from its segments
    pub fn from_names(names: Vec<NodeName>) -> Self {
        Self(names)
    }

    /// The path segments
    pub fn names(&self) -> &[NodeName] {
        &self.0
    }

    /// Whether the path has no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a segment
    pub fn appended(&self, name: NodeName) -> Self {
        let mut names = self.0.clone();
        names.push(name);
        Self(names)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(NodeName::as_str).collect();
        write!(f, "/{}", joined.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_name_validation() {
        assert!(NodeName::new("main").is_ok());
        assert!(NodeName::new("").is_err());
        assert!(NodeName::new("a/b").is_err());
        assert_eq!(NodeName::new("Main").unwrap().as_str(), "main");
    }

    #[test]
    fn test_node_path_parsing() {
        let path = NodePath::parse("/main/teaser/").unwrap();
        assert_eq!(path.names().len(), 2);
        assert_eq!(path.to_string(), "/main/teaser");
        assert!(NodePath::parse("").unwrap().is_empty());
    }
}

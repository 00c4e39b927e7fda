//! Content repository configuration
//!
//! The configuration is loaded once (usually from TOML), validated eagerly and then
//! treated as read-only for the lifetime of the process.
//!
//! ```toml
//! identifier = "default"
//! projection_mode = "synchronous"
//!
//! [[dimensions]]
//! identifier = "language"
//! default = "mul"
//! values = [
//!     { value = "mul" },
//!     { value = "en", generalization = "mul" },
//!     { value = "en-US", generalization = "en" },
//! ]
//!
//! [node_types."Acme:Root"]
//! root = true
//!
//! [node_types."Acme:Page"]
//! properties.title = { type = "string" }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::value_objects::PropertyScope;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Could not read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Dimension \"{0}\" has no values")]
    DimensionHasNoValues(String),

    #[error("Dimension \"{0}\" is configured more than once")]
    DuplicateDimension(String),

    #[error("Dimension \"{dimension}\" declares value \"{value}\" more than once")]
    DuplicateDimensionValue { dimension: String, value: String },

    #[error("Default value \"{value}\" of dimension \"{dimension}\" is not configured")]
    UnknownDefaultValue { dimension: String, value: String },

    #[error("Value \"{value}\" of dimension \"{dimension}\" generalizes to unknown value \"{generalization}\"")]
    UnknownGeneralization {
        dimension: String,
        value: String,
        generalization: String,
    },

    #[error("Dimension \"{dimension}\" contains a variation cycle through \"{value}\"")]
    VariationCycle { dimension: String, value: String },

    #[error("Value \"{value}\" of dimension \"{dimension}\" constrains unknown dimension \"{constrained}\"")]
    ConstraintOnUnknownDimension {
        dimension: String,
        value: String,
        constrained: String,
    },

    #[error("Value \"{value}\" of dimension \"{dimension}\" is unreachable: no allowed dimension space point uses it")]
    UnreachableDimensionValue { dimension: String, value: String },

    #[error("Node type \"{node_type}\" has unknown super type \"{super_type}\"")]
    UnknownSuperType {
        node_type: String,
        super_type: String,
    },

    #[error("Node type inheritance cycle through \"{0}\"")]
    InheritanceCycle(String),

    #[error("Node type \"{node_type}\" declares child node \"{child}\" of unknown type \"{child_type}\"")]
    UnknownTetheredNodeType {
        node_type: String,
        child: String,
        child_type: String,
    },

    #[error("Node type \"{node_type}\" declares invalid child node name \"{child}\": {reason}")]
    InvalidTetheredNodeName {
        node_type: String,
        child: String,
        reason: String,
    },

    #[error("Tethered child nodes of \"{0}\" recurse into themselves")]
    TetheredNodeCycle(String),
}

/// Result type for configuration loading
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

/// When projections are brought up to date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    /// Every handled command blocks until all projections caught up
    #[default]
    Synchronous,
    /// Callers catch up explicitly
    Manual,
}

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRepositoryConfig {
    /// Name of this content repository instance
    #[serde(default = "default_identifier")]
    pub identifier: String,
    /// Projection catch-up behaviour
    #[serde(default)]
    pub projection_mode: ProjectionMode,
    /// Content dimensions, most significant first
    #[serde(default)]
    pub dimensions: Vec<ContentDimensionConfig>,
    /// Node type schema keyed by node type name
    #[serde(default)]
    pub node_types: BTreeMap<String, NodeTypeConfig>,
}

fn default_identifier() -> String {
    "default".to_string()
}

impl Default for ContentRepositoryConfig {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            projection_mode: ProjectionMode::default(),
            dimensions: Vec::new(),
            node_types: BTreeMap::new(),
        }
    }
}

impl ContentRepositoryConfig {
    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> ConfigurationResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file
    pub async fn from_path(path: impl AsRef<Path>) -> ConfigurationResult<Self> {
        let source = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&source)
    }
}

/// One content dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDimensionConfig {
    /// Dimension identifier, e.g. `language`
    pub identifier: String,
    /// The value used when none is given
    pub default: String,
    /// All values of the dimension
    pub values: Vec<ContentDimensionValueConfig>,
}

/// One value of a content dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDimensionValueConfig {
    /// The value itself, e.g. `en-US`
    pub value: String,
    /// The more general value this one falls back to
    #[serde(default)]
    pub generalization: Option<String>,
    /// Restrictions on the values of other dimensions combined with this one,
    /// keyed by dimension and then by value or `*`
    #[serde(default)]
    pub constraints: BTreeMap<String, BTreeMap<String, bool>>,
}

/// One node type declaration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeTypeConfig {
    /// Abstract types can only be inherited from
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Root types can only be used for root node aggregates
    #[serde(default)]
    pub root: bool,
    /// Types this type inherits from, in order
    #[serde(default)]
    pub super_types: Vec<String>,
    /// Declared properties
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyConfig>,
    /// Declared references
    #[serde(default)]
    pub references: BTreeMap<String, ReferenceConfig>,
    /// Tethered child nodes created along with nodes of this type
    #[serde(default)]
    pub child_nodes: BTreeMap<String, ChildNodeConfig>,
    /// Constraints on the types of regular child nodes, by type name or `*`
    #[serde(default)]
    pub constraints: BTreeMap<String, bool>,
}

/// Property declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyConfig {
    /// Property type, e.g. `string`, `integer`, `DateTime`
    #[serde(rename = "type", default = "default_property_type")]
    pub property_type: String,
    /// Which nodes of an aggregate a write applies to
    #[serde(default)]
    pub scope: PropertyScope,
    /// Value set on creation when none is given
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
}

fn default_property_type() -> String {
    "string".to_string()
}

/// Reference declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Which nodes of an aggregate a write applies to
    #[serde(default)]
    pub scope: PropertyScope,
    /// Upper bound on the number of destinations
    #[serde(default)]
    pub max_items: Option<usize>,
    /// Allowed destination node types, by type name or `*`
    #[serde(default)]
    pub node_types: BTreeMap<String, bool>,
}

/// Tethered child node declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildNodeConfig {
    /// Node type of the tethered child
    #[serde(rename = "type")]
    pub node_type: String,
    /// Constraints on the types of children of the tethered node
    #[serde(default)]
    pub constraints: BTreeMap<String, bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        identifier = "acme"
        projection_mode = "manual"

        [[dimensions]]
        identifier = "language"
        default = "mul"
        values = [
            { value = "mul" },
            { value = "en", generalization = "mul" },
        ]

        [node_types."Acme:Root"]
        root = true

        [node_types."Acme:Page"]
        properties.title = { type = "string", default_value = "untitled" }
        properties.uriPathSegment = { scope = "nodeAggregate" }
        child_nodes.main = { type = "Acme:ContentCollection" }
        constraints = { "*" = true }

        [node_types."Acme:ContentCollection"]
    "#;

    #[test]
    fn test_parse_toml_configuration() {
        let config = ContentRepositoryConfig::from_toml_str(CONFIG).unwrap();

        assert_eq!(config.identifier, "acme");
        assert_eq!(config.projection_mode, ProjectionMode::Manual);
        assert_eq!(config.dimensions.len(), 1);
        assert_eq!(config.dimensions[0].values[1].generalization.as_deref(), Some("mul"));

        let page = &config.node_types["Acme:Page"];
        assert_eq!(page.properties["title"].property_type, "string");
        assert_eq!(page.properties["uriPathSegment"].scope, PropertyScope::NodeAggregate);
        assert_eq!(page.child_nodes["main"].node_type, "Acme:ContentCollection");
        assert!(config.node_types["Acme:Root"].root);
    }

    #[test]
    fn test_defaults() {
        let config = ContentRepositoryConfig::from_toml_str("").unwrap();
        assert_eq!(config.identifier, "default");
        assert_eq!(config.projection_mode, ProjectionMode::Synchronous);
        assert!(config.dimensions.is_empty());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let result = ContentRepositoryConfig::from_toml_str("dimensions = 3");
        assert!(matches!(result, Err(ConfigurationError::Parse(_))));
    }

    #[test]
    fn test_load_from_path() {
        let path = std::env::temp_dir().join(format!("content-repository-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, CONFIG).unwrap();

        let config = tokio_test::block_on(ContentRepositoryConfig::from_path(&path)).unwrap();
        assert_eq!(config.identifier, "acme");
        std::fs::remove_file(&path).unwrap();

        let missing = tokio_test::block_on(ContentRepositoryConfig::from_path(&path));
        assert!(matches!(missing, Err(ConfigurationError::Io(_))));
    }
}

//! A single configured content dimension and its value variation forest

use crate::config::{ConfigurationError, ConfigurationResult, ContentDimensionConfig};
use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::BTreeMap;

/// One value of a dimension with its fallback and combination constraints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDimensionValue {
    /// The value itself
    pub value: String,
    /// The value this one falls back to
    pub generalization: Option<String>,
    /// Allowed values of other dimensions, keyed by dimension then value or `*`
    pub constraints: BTreeMap<String, BTreeMap<String, bool>>,
}

impl ContentDimensionValue {
    /// Whether this value may be combined with `value` of `dimension`
    pub fn allows(&self, dimension: &str, value: &str) -> bool {
        match self.constraints.get(dimension) {
            None => true,
            Some(constraint) => constraint
                .get(value)
                .or_else(|| constraint.get("*"))
                .copied()
                .unwrap_or(true),
        }
    }
}

/// A validated content dimension
#[derive(Debug, Clone)]
pub struct ContentDimension {
    identifier: String,
    default_value: String,
    values: IndexMap<String, ContentDimensionValue>,
    depths: BTreeMap<String, u32>,
}

impl ContentDimension {
    /// Validate a dimension configuration.
    ///
    /// Unknown generalizations, unknown defaults, duplicate values and variation
    /// cycles are configuration errors.
    pub fn from_config(config: &ContentDimensionConfig) -> ConfigurationResult<Self> {
        if config.values.is_empty() {
            return Err(ConfigurationError::DimensionHasNoValues(config.identifier.clone()));
        }

        let mut values = IndexMap::new();
        for value_config in &config.values {
            let value = ContentDimensionValue {
                value: value_config.value.clone(),
                generalization: value_config.generalization.clone(),
                constraints: value_config.constraints.clone(),
            };
            if values.insert(value_config.value.clone(), value).is_some() {
                return Err(ConfigurationError::DuplicateDimensionValue {
                    dimension: config.identifier.clone(),
                    value: value_config.value.clone(),
                });
            }
        }

        if !values.contains_key(&config.default) {
            return Err(ConfigurationError::UnknownDefaultValue {
                dimension: config.identifier.clone(),
                value: config.default.clone(),
            });
        }

        // specialization -> generalization
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let indices: BTreeMap<&str, NodeIndex> = values
            .keys()
            .map(|value| (value.as_str(), graph.add_node(value.as_str())))
            .collect();
        for value in values.values() {
            if let Some(generalization) = &value.generalization {
                let target = indices.get(generalization.as_str()).ok_or_else(|| {
                    ConfigurationError::UnknownGeneralization {
                        dimension: config.identifier.clone(),
                        value: value.value.clone(),
                        generalization: generalization.clone(),
                    }
                })?;
                graph.add_edge(indices[value.value.as_str()], *target, ());
            }
        }
        toposort(&graph, None).map_err(|cycle| ConfigurationError::VariationCycle {
            dimension: config.identifier.clone(),
            value: graph[cycle.node_id()].to_string(),
        })?;

        let mut dimension = Self {
            identifier: config.identifier.clone(),
            default_value: config.default.clone(),
            values,
            depths: BTreeMap::new(),
        };
        dimension.depths = dimension
            .values
            .keys()
            .map(|value| (value.clone(), dimension.ancestors(value).len() as u32))
            .collect();

        Ok(dimension)
    }

    /// Dimension identifier
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The default value
    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    /// All values in configuration order
    pub fn values(&self) -> impl Iterator<Item = &ContentDimensionValue> {
        self.values.values()
    }

    /// Look up a value
    pub fn value(&self, value: &str) -> Option<&ContentDimensionValue> {
        self.values.get(value)
    }

    /// Whether the value is configured
    pub fn has_value(&self, value: &str) -> bool {
        self.values.contains_key(value)
    }

    /// Values without generalization
    pub fn root_values(&self) -> impl Iterator<Item = &ContentDimensionValue> {
        self.values.values().filter(|v| v.generalization.is_none())
    }

    /// Distance of a value from its root
    pub fn depth(&self, value: &str) -> u32 {
        self.depths.get(value).copied().unwrap_or(0)
    }

    /// Largest depth of any value
    pub fn max_depth(&self) -> u32 {
        self.depths.values().copied().max().unwrap_or(0)
    }

    /// All generalizations of a value, nearest first
    pub fn ancestors(&self, value: &str) -> Vec<&str> {
        let mut ancestors = Vec::new();
        let mut current = self.values.get(value).and_then(|v| v.generalization.as_deref());
        while let Some(generalization) = current {
            ancestors.push(generalization);
            current = self
                .values
                .get(generalization)
                .and_then(|v| v.generalization.as_deref());
        }
        ancestors
    }

    /// How many steps `specialization` lies below `generalization`,
    /// `Some(0)` for equal values and `None` if unrelated
    pub fn specialization_depth(&self, specialization: &str, generalization: &str) -> Option<u32> {
        if specialization == generalization {
            return Some(0);
        }
        self.ancestors(specialization)
            .iter()
            .position(|ancestor| *ancestor == generalization)
            .map(|position| position as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentDimensionValueConfig;

    fn value(value: &str, generalization: Option<&str>) -> ContentDimensionValueConfig {
        ContentDimensionValueConfig {
            value: value.to_string(),
            generalization: generalization.map(str::to_string),
            constraints: BTreeMap::new(),
        }
    }

    fn language_config(values: Vec<ContentDimensionValueConfig>) -> ContentDimensionConfig {
        ContentDimensionConfig {
            identifier: "language".to_string(),
            default: "mul".to_string(),
            values,
        }
    }

    #[test]
    fn test_depths_and_ancestors() {
        let dimension = ContentDimension::from_config(&language_config(vec![
            value("mul", None),
            value("en", Some("mul")),
            value("en-US", Some("en")),
            value("de", Some("mul")),
        ]))
        .unwrap();

        assert_eq!(dimension.depth("mul"), 0);
        assert_eq!(dimension.depth("en-US"), 2);
        assert_eq!(dimension.max_depth(), 2);
        assert_eq!(dimension.ancestors("en-US"), vec!["en", "mul"]);
        assert_eq!(dimension.specialization_depth("en-US", "mul"), Some(2));
        assert_eq!(dimension.specialization_depth("en-US", "de"), None);
        assert_eq!(dimension.specialization_depth("en", "en"), Some(0));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let result = ContentDimension::from_config(&language_config(vec![
            value("mul", Some("en")),
            value("en", Some("mul")),
        ]));
        assert!(matches!(result, Err(ConfigurationError::VariationCycle { .. })));
    }

    #[test]
    fn test_unknown_generalization_is_rejected() {
        let result = ContentDimension::from_config(&language_config(vec![
            value("mul", None),
            value("en", Some("xx")),
        ]));
        assert!(matches!(
            result,
            Err(ConfigurationError::UnknownGeneralization { .. })
        ));
    }

    #[test]
    fn test_unknown_default_is_rejected() {
        let result = ContentDimension::from_config(&language_config(vec![value("en", None)]));
        assert!(matches!(result, Err(ConfigurationError::UnknownDefaultValue { .. })));
    }

    #[test]
    fn test_value_constraints() {
        let mut constraints = BTreeMap::new();
        constraints.insert(
            "market".to_string(),
            BTreeMap::from([("*".to_string(), false), ("US".to_string(), true)]),
        );
        let en_us = ContentDimensionValue {
            value: "en-US".to_string(),
            generalization: None,
            constraints,
        };

        assert!(en_us.allows("market", "US"));
        assert!(!en_us.allows("market", "CH"));
        assert!(en_us.allows("other", "anything"));
    }
}

//! Node property values and property scoping

use crate::value_objects::PropertyName;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A property value together with the declared type it was serialized as
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedPropertyValue {
    /// The JSON representation of the value
    pub value: serde_json::Value,
    /// The declared property type, e.g. `string` or `DateTime`
    #[serde(rename = "type")]
    pub type_name: String,
}

impl SerializedPropertyValue {
    /// Create a serialized value
    pub fn new(value: serde_json::Value, type_name: impl Into<String>) -> Self {
        Self {
            value,
            type_name: type_name.into(),
        }
    }
}

/// Property values as stored on a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedPropertyValues(BTreeMap<PropertyName, SerializedPropertyValue>);

impl SerializedPropertyValues {
    /// No properties
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a property
    pub fn get(&self, name: &PropertyName) -> Option<&SerializedPropertyValue> {
        self.0.get(name)
    }

    /// Look up the plain value of a property by name
    pub fn value(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(&PropertyName::new(name)).map(|p| &p.value)
    }

    /// Set or replace a property
    pub fn insert(&mut self, name: PropertyName, value: SerializedPropertyValue) {
        self.0.insert(name, value);
    }

    /// Values of `other` win over values of `self`; `null` values unset a property
    pub fn merge(&self, other: &SerializedPropertyValues) -> Self {
        let mut merged = self.0.clone();
        for (name, value) in &other.0 {
            if value.value.is_null() {
                merged.remove(name);
            } else {
                merged.insert(name.clone(), value.clone());
            }
        }
        Self(merged)
    }

    /// Iterate over all properties
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyName, &SerializedPropertyValue)> {
        self.0.iter()
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no property is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split into groups keyed by a classifier, keeping each group's values
    pub fn split_by<K: Ord, F: Fn(&PropertyName) -> K>(&self, classify: F) -> BTreeMap<K, Self> {
        let mut groups: BTreeMap<K, Self> = BTreeMap::new();
        for (name, value) in &self.0 {
            groups
                .entry(classify(name))
                .or_default()
                .insert(name.clone(), value.clone());
        }
        groups
    }
}

impl FromIterator<(PropertyName, SerializedPropertyValue)> for SerializedPropertyValues {
    fn from_iter<T: IntoIterator<Item = (PropertyName, SerializedPropertyValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Unserialized property values as supplied by commands, in caller order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyValuesToWrite(IndexMap<String, serde_json::Value>);

impl PropertyValuesToWrite {
    /// No values
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style insertion
    pub fn with(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Whether no value is given
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, serde_json::Value)> for PropertyValuesToWrite {
    fn from_iter<T: IntoIterator<Item = (K, serde_json::Value)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Which nodes of an aggregate a property or reference write applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyScope {
    /// Only the node at the given origin
    #[default]
    Node,
    /// The node at the given origin and all nodes at specializations of it
    Specializations,
    /// Every node of the aggregate
    NodeAggregate,
}

/// How a node aggregate relates to the tree structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeAggregateClassification {
    /// A root node aggregate without parent
    Root,
    /// A regular node aggregate
    Regular,
    /// A node aggregate created along with its parent and bound to it
    Tethered,
}

impl NodeAggregateClassification {
    /// Whether the aggregate is a root
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    /// Whether the aggregate is tethered to its parent
    pub fn is_tethered(&self) -> bool {
        matches!(self, Self::Tethered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_unsets_null_values() {
        let base: SerializedPropertyValues = [
            (PropertyName::new("title"), SerializedPropertyValue::new(json!("Hello"), "string")),
            (PropertyName::new("hidden"), SerializedPropertyValue::new(json!(true), "boolean")),
        ]
        .into_iter()
        .collect();
        let changes: SerializedPropertyValues = [
            (PropertyName::new("title"), SerializedPropertyValue::new(json!("Hi"), "string")),
            (PropertyName::new("hidden"), SerializedPropertyValue::new(json!(null), "boolean")),
        ]
        .into_iter()
        .collect();

        let merged = base.merge(&changes);
        assert_eq!(merged.value("title"), Some(&json!("Hi")));
        assert!(merged.value("hidden").is_none());
    }

    #[test]
    fn test_values_to_write_keep_insertion_order() {
        let values = PropertyValuesToWrite::empty()
            .with("zeta", json!(1))
            .with("alpha", json!(2));
        let names: Vec<&String> = values.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}

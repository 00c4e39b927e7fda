//! Computes the allowed dimension subspace from the configured dimensions

use super::content_dimension::ContentDimension;
use crate::config::{ConfigurationError, ConfigurationResult, ContentDimensionConfig};
use crate::value_objects::{DimensionSpacePoint, DimensionSpacePointSet};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Owns the validated content dimensions and the allowed combinations of their values
#[derive(Debug, Clone)]
pub struct ContentDimensionZookeeper {
    dimensions: Vec<ContentDimension>,
    allowed_combinations: DimensionSpacePointSet,
}

impl ContentDimensionZookeeper {
    /// Validate the dimension configuration and compute the allowed subspace.
    pub fn from_config(configs: &[ContentDimensionConfig]) -> ConfigurationResult<Self> {
        let mut seen = BTreeSet::new();
        let mut dimensions = Vec::with_capacity(configs.len());
        for config in configs {
            if !seen.insert(config.identifier.clone()) {
                return Err(ConfigurationError::DuplicateDimension(config.identifier.clone()));
            }
            dimensions.push(ContentDimension::from_config(config)?);
        }

        for dimension in &dimensions {
            for value in dimension.values() {
                if let Some(constrained) = value
                    .constraints
                    .keys()
                    .find(|constrained| !seen.contains(*constrained))
                {
                    return Err(ConfigurationError::ConstraintOnUnknownDimension {
                        dimension: dimension.identifier().to_string(),
                        value: value.value.clone(),
                        constrained: constrained.clone(),
                    });
                }
            }
        }

        let allowed_combinations = Self::compute_allowed_combinations(&dimensions);

        for dimension in &dimensions {
            for value in dimension.values() {
                let used = allowed_combinations
                    .iter()
                    .any(|point| point.coordinate(dimension.identifier()) == Some(value.value.as_str()));
                if !used {
                    return Err(ConfigurationError::UnreachableDimensionValue {
                        dimension: dimension.identifier().to_string(),
                        value: value.value.clone(),
                    });
                }
            }
        }

        debug!(
            dimension_count = dimensions.len(),
            allowed_points = allowed_combinations.len(),
            "Computed allowed dimension subspace"
        );

        Ok(Self {
            dimensions,
            allowed_combinations,
        })
    }

    fn compute_allowed_combinations(dimensions: &[ContentDimension]) -> DimensionSpacePointSet {
        let mut combinations: Vec<BTreeMap<String, String>> = vec![BTreeMap::new()];
        for dimension in dimensions {
            combinations = combinations
                .into_iter()
                .flat_map(|partial| {
                    dimension.values().map(move |value| {
                        let mut extended = partial.clone();
                        extended.insert(dimension.identifier().to_string(), value.value.clone());
                        extended
                    })
                })
                .collect();
        }

        combinations
            .into_iter()
            .filter(|coordinates| Self::satisfies_constraints(dimensions, coordinates))
            .map(DimensionSpacePoint::new)
            .collect()
    }

    fn satisfies_constraints(
        dimensions: &[ContentDimension],
        coordinates: &BTreeMap<String, String>,
    ) -> bool {
        dimensions.iter().all(|dimension| {
            let Some(value) = coordinates
                .get(dimension.identifier())
                .and_then(|value| dimension.value(value))
            else {
                return false;
            };
            coordinates
                .iter()
                .filter(|(other, _)| other.as_str() != dimension.identifier())
                .all(|(other, other_value)| value.allows(other, other_value))
        })
    }

    /// The configured dimensions, most significant first
    pub fn dimensions(&self) -> &[ContentDimension] {
        &self.dimensions
    }

    /// Look up a dimension
    pub fn dimension(&self, identifier: &str) -> Option<&ContentDimension> {
        self.dimensions.iter().find(|d| d.identifier() == identifier)
    }

    /// All allowed points
    pub fn allowed_dimension_subspace(&self) -> &DimensionSpacePointSet {
        &self.allowed_combinations
    }

    /// Whether the point lies in the allowed subspace
    pub fn is_allowed(&self, point: &DimensionSpacePoint) -> bool {
        self.allowed_combinations.contains(point)
    }

    /// The point made of every dimension's default value
    pub fn default_point(&self) -> DimensionSpacePoint {
        DimensionSpacePoint::from_pairs(
            self.dimensions
                .iter()
                .map(|d| (d.identifier().to_string(), d.default_value().to_string())),
        )
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

    fn dimensions() -> Vec<ContentDimensionConfig> {
        let mut en_us = value("en-US", Some("en"));
        en_us.constraints.insert(
            "market".to_string(),
            BTreeMap::from([("*".to_string(), false), ("US".to_string(), true)]),
        );
        vec![
            ContentDimensionConfig {
                identifier: "language".to_string(),
                default: "en".to_string(),
                values: vec![value("en", None), en_us, value("de", None)],
            },
            ContentDimensionConfig {
                identifier: "market".to_string(),
                default: "US".to_string(),
                values: vec![value("US", None), value("CH", None)],
            },
        ]
    }

    #[test]
    fn test_allowed_subspace_respects_constraints() {
        let zookeeper = ContentDimensionZookeeper::from_config(&dimensions()).unwrap();
        let subspace = zookeeper.allowed_dimension_subspace();

        // 3 x 2 minus {en-US, CH}
        assert_eq!(subspace.len(), 5);
        assert!(zookeeper.is_allowed(&DimensionSpacePoint::from_pairs([
            ("language", "en-US"),
            ("market", "US"),
        ])));
        assert!(!zookeeper.is_allowed(&DimensionSpacePoint::from_pairs([
            ("language", "en-US"),
            ("market", "CH"),
        ])));
        assert!(!zookeeper.is_allowed(&DimensionSpacePoint::from_pairs([("language", "en")])));
    }

    #[test]
    fn test_no_dimensions_yield_the_empty_point() {
        let zookeeper = ContentDimensionZookeeper::from_config(&[]).unwrap();
        assert_eq!(zookeeper.allowed_dimension_subspace().len(), 1);
        assert!(zookeeper.is_allowed(&DimensionSpacePoint::empty()));
    }

    #[test]
    fn test_unreachable_value_is_rejected() {
        let mut configs = dimensions();
        configs[0].values[1]
            .constraints
            .insert("market".to_string(), BTreeMap::from([("*".to_string(), false)]));

        let result = ContentDimensionZookeeper::from_config(&configs);
        assert!(matches!(
            result,
            Err(ConfigurationError::UnreachableDimensionValue { .. })
        ));
    }

    #[test]
    fn test_duplicate_dimension_is_rejected() {
        let mut configs = dimensions();
        configs.push(configs[0].clone());
        assert!(matches!(
            ContentDimensionZookeeper::from_config(&configs),
            Err(ConfigurationError::DuplicateDimension(_))
        ));
    }
}

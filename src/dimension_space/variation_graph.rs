//! Specialization / generalization relations between dimension space points
//!
//! The whole-space graph is the pointwise product of the per-dimension variation
//! forests: `b` specializes `a` iff every coordinate of `b` equals or specializes the
//! corresponding coordinate of `a`. Relations are precomputed once at startup.

use super::zookeeper::ContentDimensionZookeeper;
use crate::value_objects::{DimensionSpacePoint, DimensionSpacePointSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How one point relates to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantType {
    /// Both points are equal
    Same,
    /// The subject is more specific than the reference
    Specialization,
    /// The subject is more general than the reference
    Generalization,
    /// The points are unrelated
    Peer,
}

/// Specialization depth per dimension, in configuration order.
///
/// Compared lexicographically, so earlier dimensions are more significant; lower means closer.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariationWeight(Vec<u32>);

impl VariationWeight {
    pub fn depths(&self) -> &[u32] {
        &self.0
    }
}

/// A related point together with its weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedPoint {
    pub weight: VariationWeight,
    pub point: DimensionSpacePoint,
}

#[derive(Debug, Clone, Default)]
struct Relations {
    /// Strict specializations, closest first
    specializations: Vec<WeightedPoint>,
    /// Strict generalizations, closest first
    generalizations: Vec<WeightedPoint>,
}

/// Precomputed variation relations over the allowed dimension subspace
#[derive(Debug, Clone)]
pub struct InterDimensionalVariationGraph {
    subspace: DimensionSpacePointSet,
    relations: HashMap<String, Relations>,
}

impl InterDimensionalVariationGraph {
    /// Build the graph over the zookeeper's allowed subspace
    pub fn new(zookeeper: &ContentDimensionZookeeper) -> Self {
        let subspace = zookeeper.allowed_dimension_subspace().clone();
        let dimensions = zookeeper.dimensions();

        let mut relations: HashMap<String, Relations> = subspace
            .hashes()
            .map(|hash| (hash.to_string(), Relations::default()))
            .collect();

        for generalization in subspace.iter() {
            for specialization in subspace.iter() {
                if generalization == specialization {
                    continue;
                }
                let mut depths = Vec::with_capacity(dimensions.len());
                let mut related = true;
                for dimension in dimensions {
                    let (Some(special_value), Some(general_value)) = (
                        specialization.coordinate(dimension.identifier()),
                        generalization.coordinate(dimension.identifier()),
                    ) else {
                        related = false;
                        break;
                    };
                    match dimension.specialization_depth(special_value, general_value) {
                        Some(depth) => depths.push(depth),
                        None => {
                            related = false;
                            break;
                        }
                    }
                }
                if !related {
                    continue;
                }
                let weight = VariationWeight(depths);
                if let Some(entry) = relations.get_mut(generalization.hash()) {
                    entry.specializations.push(WeightedPoint {
                        weight: weight.clone(),
                        point: specialization.clone(),
                    });
                }
                if let Some(entry) = relations.get_mut(specialization.hash()) {
                    entry.generalizations.push(WeightedPoint {
                        weight,
                        point: generalization.clone(),
                    });
                }
            }
        }

        for entry in relations.values_mut() {
            entry
                .specializations
                .sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.point.cmp(&b.point)));
            entry
                .generalizations
                .sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.point.cmp(&b.point)));
        }

        Self { subspace, relations }
    }

    /// All allowed points
    pub fn allowed_dimension_subspace(&self) -> &DimensionSpacePointSet {
        &self.subspace
    }

    /// Strict specializations of a point
    pub fn indexed_specializations(&self, point: &DimensionSpacePoint) -> DimensionSpacePointSet {
        self.relations
            .get(point.hash())
            .map(|r| r.specializations.iter().map(|w| w.point.clone()).collect())
            .unwrap_or_default()
    }

    /// Strict generalizations of a point
    pub fn indexed_generalizations(&self, point: &DimensionSpacePoint) -> DimensionSpacePointSet {
        self.relations
            .get(point.hash())
            .map(|r| r.generalizations.iter().map(|w| w.point.clone()).collect())
            .unwrap_or_default()
    }

    /// Strict specializations of a point, closest first
    pub fn weighted_specializations(&self, point: &DimensionSpacePoint) -> &[WeightedPoint] {
        self.relations
            .get(point.hash())
            .map(|r| r.specializations.as_slice())
            .unwrap_or_default()
    }

    /// All specializations of `point`, optionally including itself, minus `excluded`
    pub fn specialization_set(
        &self,
        point: &DimensionSpacePoint,
        include_self: bool,
        excluded: &DimensionSpacePointSet,
    ) -> DimensionSpacePointSet {
        let mut set: Vec<DimensionSpacePoint> = Vec::new();
        if include_self {
            set.push(point.clone());
        }
        if let Some(relations) = self.relations.get(point.hash()) {
            set.extend(
                relations
                    .specializations
                    .iter()
                    .filter(|w| !excluded.contains(&w.point))
                    .map(|w| w.point.clone()),
            );
        }
        DimensionSpacePointSet::new(set)
    }

    /// The preferred fallback of a point, `None` for root points
    pub fn primary_generalization(&self, point: &DimensionSpacePoint) -> Option<&DimensionSpacePoint> {
        self.relations
            .get(point.hash())
            .and_then(|r| r.generalizations.first())
            .map(|w| &w.point)
    }

    /// Points without any generalization
    pub fn root_generalizations(&self) -> DimensionSpacePointSet {
        self.subspace
            .iter()
            .filter(|point| {
                self.relations
                    .get(point.hash())
                    .map(|r| r.generalizations.is_empty())
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    /// Whether `subject` equals or specializes `reference`
    pub fn is_specialization_or_same(
        &self,
        subject: &DimensionSpacePoint,
        reference: &DimensionSpacePoint,
    ) -> bool {
        matches!(
            self.variant_type(subject, reference),
            VariantType::Same | VariantType::Specialization
        )
    }

    /// Classify `subject` relative to `reference`
    pub fn variant_type(
        &self,
        subject: &DimensionSpacePoint,
        reference: &DimensionSpacePoint,
    ) -> VariantType {
        if subject == reference {
            return VariantType::Same;
        }
        let Some(relations) = self.relations.get(reference.hash()) else {
            return VariantType::Peer;
        };
        if relations.specializations.iter().any(|w| &w.point == subject) {
            VariantType::Specialization
        } else if relations.generalizations.iter().any(|w| &w.point == subject) {
            VariantType::Generalization
        } else {
            VariantType::Peer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContentDimensionConfig, ContentDimensionValueConfig};
    use std::collections::BTreeMap;

    fn value(value: &str, generalization: Option<&str>) -> ContentDimensionValueConfig {
        ContentDimensionValueConfig {
            value: value.to_string(),
            generalization: generalization.map(str::to_string),
            constraints: BTreeMap::new(),
        }
    }

    fn graph() -> InterDimensionalVariationGraph {
        let zookeeper = ContentDimensionZookeeper::from_config(&[
            ContentDimensionConfig {
                identifier: "language".to_string(),
                default: "mul".to_string(),
                values: vec![
                    value("mul", None),
                    value("en", Some("mul")),
                    value("en-US", Some("en")),
                    value("de", Some("mul")),
                ],
            },
            ContentDimensionConfig {
                identifier: "market".to_string(),
                default: "world".to_string(),
                values: vec![value("world", None), value("CH", Some("world"))],
            },
        ])
        .unwrap();
        InterDimensionalVariationGraph::new(&zookeeper)
    }

    fn p(language: &str, market: &str) -> DimensionSpacePoint {
        DimensionSpacePoint::from_pairs([("language", language), ("market", market)])
    }

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     VG[Variation Graph] --> SS[Specialization Set]
    ///     VG --> PG[Primary Generalization]
    ///     VG --> VT[Variant Type]
    ///     VG --> RG[Root Generalizations]
    ///     VG --> W[Weights Across Many Dimensions]
    /// ```

    #[test]
    fn test_specialization_set() {
        let graph = graph();
        let set = graph.specialization_set(&p("en", "world"), true, &DimensionSpacePointSet::empty());

        assert_eq!(set.len(), 4);
        assert!(set.contains(&p("en", "world")));
        assert!(set.contains(&p("en-US", "world")));
        assert!(set.contains(&p("en", "CH")));
        assert!(set.contains(&p("en-US", "CH")));

        let without_self =
            graph.specialization_set(&p("en", "world"), false, &DimensionSpacePointSet::new([p("en", "CH")]));
        assert_eq!(without_self.len(), 2);
        assert!(!without_self.contains(&p("en", "world")));
        assert!(!without_self.contains(&p("en", "CH")));
    }

    #[test]
    fn test_primary_generalization_prefers_less_significant_dimension() {
        let graph = graph();

        assert_eq!(graph.primary_generalization(&p("mul", "world")), None);
        assert_eq!(graph.primary_generalization(&p("en", "world")), Some(&p("mul", "world")));
        // language outweighs market, so the market is generalized first
        assert_eq!(graph.primary_generalization(&p("en", "CH")), Some(&p("en", "world")));
    }

    #[test]
    fn test_variant_types() {
        let graph = graph();

        assert_eq!(graph.variant_type(&p("en", "CH"), &p("en", "CH")), VariantType::Same);
        assert_eq!(
            graph.variant_type(&p("en-US", "CH"), &p("en", "world")),
            VariantType::Specialization
        );
        assert_eq!(
            graph.variant_type(&p("mul", "world"), &p("de", "CH")),
            VariantType::Generalization
        );
        assert_eq!(graph.variant_type(&p("de", "world"), &p("en", "world")), VariantType::Peer);
        assert_eq!(graph.variant_type(&p("en", "world"), &p("mul", "CH")), VariantType::Peer);
    }

    #[test]
    fn test_weights_of_many_dimensions_keep_their_order() {
        let mut dimensions = vec![ContentDimensionConfig {
            identifier: "depth".to_string(),
            default: "d0".to_string(),
            values: (0..16)
                .map(|i| ContentDimensionValueConfig {
                    value: format!("d{i}"),
                    generalization: (i > 0).then(|| format!("d{}", i - 1)),
                    constraints: BTreeMap::new(),
                })
                .collect(),
        }];
        for i in 0..16 {
            dimensions.push(ContentDimensionConfig {
                identifier: format!("flat{i}"),
                default: "v".to_string(),
                values: vec![value("v", None)],
            });
        }
        let zookeeper = ContentDimensionZookeeper::from_config(&dimensions).unwrap();
        let graph = InterDimensionalVariationGraph::new(&zookeeper);
        let point = |depth: usize| {
            let mut pairs = vec![("depth".to_string(), format!("d{depth}"))];
            pairs.extend((0..16).map(|i| (format!("flat{i}"), "v".to_string())));
            DimensionSpacePoint::from_pairs(pairs)
        };

        let weights: Vec<u32> = graph
            .weighted_specializations(&point(0))
            .iter()
            .map(|weighted| weighted.weight.depths()[0])
            .collect();
        assert_eq!(weights, (1..16).collect::<Vec<u32>>());
        assert_eq!(graph.primary_generalization(&point(15)), Some(&point(14)));
    }

    #[test]
    fn test_root_generalizations() {
        let graph = graph();
        assert_eq!(graph.root_generalizations(), DimensionSpacePointSet::new([p("mul", "world")]));
    }
}

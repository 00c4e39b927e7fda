//! Dimension space
//!
//! Content dimensions (e.g. language, market) span a space of dimension space points.
//! The zookeeper restricts that space to the allowed combinations, the variation graph
//! relates allowed points by specialization and generalization.

mod content_dimension;
mod variation_graph;
mod zookeeper;

pub use content_dimension::{ContentDimension, ContentDimensionValue};
pub use variation_graph::{InterDimensionalVariationGraph, VariantType, VariationWeight, WeightedPoint};
pub use zookeeper::ContentDimensionZookeeper;

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::config::{ContentDimensionConfig, ContentDimensionValueConfig};
    use crate::value_objects::DimensionSpacePointSet;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Builds a random forest per dimension: value `i` generalizes to some value `< i` or to none
    fn dimension_strategy(identifier: &'static str) -> impl Strategy<Value = ContentDimensionConfig> {
        prop::collection::vec(prop::option::of(0usize..8), 1..6).prop_map(move |parents| {
            let values = parents
                .into_iter()
                .enumerate()
                .map(|(index, parent)| ContentDimensionValueConfig {
                    value: format!("{identifier}{index}"),
                    generalization: parent
                        .filter(|_| index > 0)
                        .map(|parent| format!("{identifier}{}", parent % index)),
                    constraints: BTreeMap::new(),
                })
                .collect();
            ContentDimensionConfig {
                identifier: identifier.to_string(),
                default: format!("{identifier}0"),
                values,
            }
        })
    }

    proptest! {
        #[test]
        fn specialization_set_contains_self_and_is_idempotent(
            language in dimension_strategy("l"),
            market in dimension_strategy("m"),
        ) {
            let zookeeper = ContentDimensionZookeeper::from_config(&[language, market]).unwrap();
            let graph = InterDimensionalVariationGraph::new(&zookeeper);

            for point in graph.allowed_dimension_subspace().iter() {
                let first = graph.specialization_set(point, true, &DimensionSpacePointSet::empty());
                let second = graph.specialization_set(point, true, &DimensionSpacePointSet::empty());
                prop_assert!(first.contains(point));
                prop_assert_eq!(&first, &second);
                prop_assert!(first.is_subset_of(graph.allowed_dimension_subspace()));
            }
        }

        #[test]
        fn primary_generalization_is_a_generalization(
            language in dimension_strategy("l"),
            market in dimension_strategy("m"),
        ) {
            let zookeeper = ContentDimensionZookeeper::from_config(&[language, market]).unwrap();
            let graph = InterDimensionalVariationGraph::new(&zookeeper);

            for point in graph.allowed_dimension_subspace().iter() {
                if let Some(generalization) = graph.primary_generalization(point) {
                    prop_assert_eq!(
                        graph.variant_type(generalization, point),
                        VariantType::Generalization
                    );
                    prop_assert!(graph.indexed_specializations(generalization).contains(point));
                }
            }
        }
    }
}

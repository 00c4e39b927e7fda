//! Dimension Coverage Property Tests
//!
//! ## Test Coverage
//!
//! ```mermaid
//! graph TD
//!     A[Create Document] --> B[Random Variant Sequence]
//!     B --> C[Occupied Within Allowed Subspace]
//!     B --> D[Covered Within Allowed Subspace]
//!     B --> E[One Occupant Per Covered Point]
//! ```

mod common;

use cim_content_repository::commands::CreateNodeVariant;
use cim_content_repository::{DimensionSpacePoint, NodeAggregate, NodeAggregateIdentifier};
use common::{dsp, user, Fixture};
use proptest::prelude::*;

/// Allowed points plus one outside the subspace (`en-US` is not sold in `CH`)
fn points() -> Vec<DimensionSpacePoint> {
    vec![
        dsp("mul", "world"),
        dsp("mul", "CH"),
        dsp("en", "world"),
        dsp("en", "CH"),
        dsp("en-US", "world"),
        dsp("de", "world"),
        dsp("de", "CH"),
        dsp("en-US", "CH"),
    ]
}

fn check_coverage(node_aggregate: &NodeAggregate, allowed: &cim_content_repository::DimensionSpacePointSet) {
    let occupied = node_aggregate.occupied_dimension_space_points();
    let covered = node_aggregate.covered_dimension_space_points();
    assert!(occupied.is_subset_of(allowed), "occupied {occupied} outside {allowed}");
    assert!(covered.is_subset_of(allowed), "covered {covered} outside {allowed}");

    for point in covered.iter() {
        let occupants = occupied
            .iter()
            .filter(|origin| node_aggregate.coverage_by_occupant(origin).contains(point))
            .count();
        assert_eq!(occupants, 1, "{point} is covered by {occupants} nodes");
        let node = node_aggregate.node_by_covered_point(point).unwrap();
        assert!(occupied.contains(&node.origin_dimension_space_point.to_dimension_space_point()));
    }
}

async fn run_variants(start: usize, steps: Vec<(usize, usize)>) {
    let fx = Fixture::new().await;
    let points = points();
    let document = fx.create_document(fx.live, fx.root, "page", points[start % 7].clone()).await;
    let main = NodeAggregateIdentifier::for_tethered_descendant(&document, "main");
    let allowed = fx.repository.variation_graph().allowed_dimension_subspace().clone();

    for (source, target) in steps {
        let occupied: Vec<DimensionSpacePoint> = {
            let graph = fx.repository.content_graph().await;
            let aggregate = graph.find_node_aggregate_by_id(&fx.live, &document).unwrap();
            aggregate.occupied_dimension_space_points().iter().cloned().collect()
        };
        let source = occupied[source % occupied.len()].clone();
        // rejected variants must leave the aggregate consistent as well
        let _ = fx
            .repository
            .handle(CreateNodeVariant {
                content_stream_identifier: fx.live,
                node_aggregate_identifier: document,
                source_origin: source.into(),
                target_origin: points[target % points.len()].clone().into(),
                initiating_user_identifier: user(),
            })
            .await;

        let graph = fx.repository.content_graph().await;
        for identifier in [document, main] {
            let aggregate = graph.find_node_aggregate_by_id(&fx.live, &identifier).unwrap();
            check_coverage(&aggregate, &allowed);
        }
        let document_aggregate = graph.find_node_aggregate_by_id(&fx.live, &document).unwrap();
        let main_aggregate = graph.find_node_aggregate_by_id(&fx.live, &main).unwrap();
        assert_eq!(
            document_aggregate.covered_dimension_space_points(),
            main_aggregate.covered_dimension_space_points()
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn variants_keep_one_occupant_per_covered_point(
        start in 0usize..7,
        steps in prop::collection::vec((0usize..8, 0usize..8), 1..8),
    ) {
        tokio_test::block_on(run_variants(start, steps));
    }
}

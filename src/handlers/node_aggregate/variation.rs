//! Node variants: specializations, generalizations and peers of an existing aggregate
//!
//! A new variant becomes visible in its origin and in every specialization of it that is not
//! already occupied by a closer variant of the same aggregate. Tethered descendants follow
//! their parent into the new origin.

use super::ConstraintChecks;
use crate::aggregate::NodeAggregate;
use crate::commands::{CommandError, CommandHandlingResult, CreateNodeVariant};
use crate::dimension_space::VariantType;
use crate::domain_events::ContentRepositoryEvent;
use crate::events::{
    NodeGeneralizationVariantWasCreated, NodePeerVariantWasCreated, NodeSpecializationVariantWasCreated,
};
use crate::value_objects::{DimensionSpacePointSet, OriginDimensionSpacePoint};

pub(super) fn create_variant(
    checks: &ConstraintChecks<'_>,
    command: &CreateNodeVariant,
) -> CommandHandlingResult<Vec<ContentRepositoryEvent>> {
    let node_aggregate = checks.require_node_aggregate(&command.node_aggregate_identifier)?;
    checks.require_not_root(&node_aggregate)?;
    checks.require_not_tethered(&node_aggregate)?;
    checks.require_dimension_space_point(&command.source_origin)?;
    checks.require_dimension_space_point(&command.target_origin)?;
    checks.require_occupation(&node_aggregate, &command.source_origin)?;
    checks.require_no_occupation(&node_aggregate, &command.target_origin)?;

    let attachable = checks.common_parent_coverage(&node_aggregate);
    let target = &command.target_origin;
    if !attachable.contains(target) && !node_aggregate.covers(target) {
        return Err(CommandError::NodeAggregateCurrentlyDoesNotCoverDimensionSpacePoint {
            node_aggregate_identifier: node_aggregate.identifier(),
            dimension_space_point: target.to_dimension_space_point(),
        });
    }

    let mut events = Vec::new();
    vary(checks, &node_aggregate, &command.source_origin, target, &attachable, &mut events)?;
    Ok(events)
}

/// Emit the variant event of `node_aggregate` and recurse into its tethered children.
///
/// `attachable` holds the points a parent can take the new node in.
fn vary(
    checks: &ConstraintChecks<'_>,
    node_aggregate: &NodeAggregate,
    source: &OriginDimensionSpacePoint,
    target: &OriginDimensionSpacePoint,
    attachable: &DimensionSpacePointSet,
    events: &mut Vec<ContentRepositoryEvent>,
) -> CommandHandlingResult<()> {
    let coverage = variant_coverage(checks, node_aggregate, target)
        .intersection(&attachable.union(&node_aggregate.covered_dimension_space_points()));

    let content_stream_identifier = checks.content_stream_identifier;
    let node_aggregate_identifier = node_aggregate.identifier();
    if let Some(node_name) = node_aggregate.node_name() {
        let newly_covered = coverage.difference(&node_aggregate.covered_dimension_space_points());
        for parent in checks
            .graph
            .find_parent_node_aggregates(&content_stream_identifier, &node_aggregate_identifier)
        {
            checks.require_node_name_unoccupied(
                node_name,
                &parent.identifier(),
                &newly_covered,
                Some(&node_aggregate_identifier),
            )?;
        }
    }
    let event = match checks.variation_graph().variant_type(target, source) {
        VariantType::Specialization => {
            ContentRepositoryEvent::NodeSpecializationVariantWasCreated(NodeSpecializationVariantWasCreated {
                content_stream_identifier,
                node_aggregate_identifier,
                source_origin: source.clone(),
                specialization_origin: target.clone(),
                specialization_coverage: coverage.clone(),
            })
        }
        VariantType::Generalization => {
            ContentRepositoryEvent::NodeGeneralizationVariantWasCreated(NodeGeneralizationVariantWasCreated {
                content_stream_identifier,
                node_aggregate_identifier,
                source_origin: source.clone(),
                generalization_origin: target.clone(),
                generalization_coverage: coverage.clone(),
            })
        }
        VariantType::Peer => ContentRepositoryEvent::NodePeerVariantWasCreated(NodePeerVariantWasCreated {
            content_stream_identifier,
            node_aggregate_identifier,
            source_origin: source.clone(),
            peer_origin: target.clone(),
            peer_coverage: coverage.clone(),
        }),
        VariantType::Same => {
            return Err(CommandError::DimensionSpacePointIsAlreadyOccupied {
                node_aggregate_identifier,
                origin: target.to_dimension_space_point(),
            })
        }
    };
    events.push(event);

    let parent_coverage = node_aggregate.covered_dimension_space_points().union(&coverage);
    for child in checks
        .graph
        .find_tethered_child_node_aggregates(&content_stream_identifier, &node_aggregate_identifier)
    {
        if child.occupies(source) && !child.occupies(target) {
            vary(checks, &child, source, target, &parent_coverage, events)?;
        }
    }
    Ok(())
}

/// `target` and its specializations, minus those a more specific variant already owns
fn variant_coverage(
    checks: &ConstraintChecks<'_>,
    node_aggregate: &NodeAggregate,
    target: &OriginDimensionSpacePoint,
) -> DimensionSpacePointSet {
    let variation_graph = checks.variation_graph();
    let specializations = variation_graph.specialization_set(target, true, &DimensionSpacePointSet::empty());
    node_aggregate
        .occupied_dimension_space_points()
        .iter()
        .filter(|occupied| *occupied != &**target && specializations.contains(occupied))
        .fold(specializations.clone(), |coverage, occupied| {
            coverage.difference(&variation_graph.specialization_set(occupied, true, &DimensionSpacePointSet::empty()))
        })
}

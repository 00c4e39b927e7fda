//! Removing node aggregates from covered points

use super::ConstraintChecks;
use crate::commands::{CommandHandlingResult, RemoveNodeAggregate};
use crate::domain_events::ContentRepositoryEvent;
use crate::events::NodeAggregateWasRemoved;

pub(super) fn remove(
    checks: &ConstraintChecks<'_>,
    command: &RemoveNodeAggregate,
) -> CommandHandlingResult<Vec<ContentRepositoryEvent>> {
    let node_aggregate = checks.require_node_aggregate(&command.node_aggregate_identifier)?;
    checks.require_not_tethered(&node_aggregate)?;
    checks.require_coverage(&node_aggregate, &command.covered_dimension_space_point)?;

    let strategy = command.node_variant_selection_strategy;
    let affected_covered_dimension_space_points = strategy.resolve_affected_covered(
        &command.covered_dimension_space_point,
        &node_aggregate.covered_dimension_space_points(),
        checks.variation_graph(),
    );
    let affected_occupied_dimension_space_points = strategy.resolve_affected_occupied(
        &command.covered_dimension_space_point,
        &node_aggregate.occupied_dimension_space_points(),
        checks.variation_graph(),
    );

    Ok(vec![ContentRepositoryEvent::NodeAggregateWasRemoved(NodeAggregateWasRemoved {
        content_stream_identifier: checks.content_stream_identifier,
        node_aggregate_identifier: node_aggregate.identifier(),
        affected_occupied_dimension_space_points,
        affected_covered_dimension_space_points,
    })])
}

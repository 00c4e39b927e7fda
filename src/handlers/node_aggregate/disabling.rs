//! Disabling and re-enabling node aggregates

use super::ConstraintChecks;
use crate::commands::{CommandError, CommandHandlingResult, DisableNodeAggregate, EnableNodeAggregate};
use crate::domain_events::ContentRepositoryEvent;
use crate::events::{NodeAggregateWasDisabled, NodeAggregateWasEnabled};

pub(super) fn disable(
    checks: &ConstraintChecks<'_>,
    command: &DisableNodeAggregate,
) -> CommandHandlingResult<Vec<ContentRepositoryEvent>> {
    let node_aggregate = checks.require_node_aggregate(&command.node_aggregate_identifier)?;
    let point = &command.covered_dimension_space_point;
    checks.require_coverage(&node_aggregate, point)?;
    if node_aggregate.disables(point) {
        return Err(CommandError::NodeAggregateCurrentlyDisablesDimensionSpacePoint {
            node_aggregate_identifier: node_aggregate.identifier(),
            dimension_space_point: point.clone(),
        });
    }

    let affected_dimension_space_points = command.node_variant_selection_strategy.resolve_affected_covered(
        point,
        &node_aggregate.covered_dimension_space_points(),
        checks.variation_graph(),
    );
    Ok(vec![ContentRepositoryEvent::NodeAggregateWasDisabled(NodeAggregateWasDisabled {
        content_stream_identifier: checks.content_stream_identifier,
        node_aggregate_identifier: node_aggregate.identifier(),
        affected_dimension_space_points,
    })])
}

pub(super) fn enable(
    checks: &ConstraintChecks<'_>,
    command: &EnableNodeAggregate,
) -> CommandHandlingResult<Vec<ContentRepositoryEvent>> {
    let node_aggregate = checks.require_node_aggregate(&command.node_aggregate_identifier)?;
    let point = &command.covered_dimension_space_point;
    checks.require_coverage(&node_aggregate, point)?;
    if !node_aggregate.disables(point) {
        return Err(CommandError::NodeAggregateCurrentlyDoesNotDisableDimensionSpacePoint {
            node_aggregate_identifier: node_aggregate.identifier(),
            dimension_space_point: point.clone(),
        });
    }

    let affected_dimension_space_points = command
        .node_variant_selection_strategy
        .resolve_affected_covered(point, &node_aggregate.covered_dimension_space_points(), checks.variation_graph())
        .intersection(node_aggregate.disabled_dimension_space_points());
    Ok(vec![ContentRepositoryEvent::NodeAggregateWasEnabled(NodeAggregateWasEnabled {
        content_stream_identifier: checks.content_stream_identifier,
        node_aggregate_identifier: node_aggregate.identifier(),
        affected_dimension_space_points,
    })])
}

//! Moving node aggregates to a new parent or position

use super::ConstraintChecks;
use crate::commands::{CommandError, CommandHandlingResult, MoveNodeAggregate};
use crate::domain_events::ContentRepositoryEvent;
use crate::events::{NodeAggregateWasMoved, NodeMoveMapping};
use crate::queries::VisibilityConstraints;
use crate::value_objects::{DimensionSpacePoint, DimensionSpacePointSet, NodeAggregateIdentifier};
use tracing::debug;

pub(super) fn move_node_aggregate(
    checks: &ConstraintChecks<'_>,
    command: &MoveNodeAggregate,
) -> CommandHandlingResult<Vec<ContentRepositoryEvent>> {
    let node_aggregate = checks.require_node_aggregate(&command.node_aggregate_identifier)?;
    checks.require_not_root(&node_aggregate)?;
    checks.require_coverage(&node_aggregate, &command.dimension_space_point)?;
    if command.new_parent_node_aggregate_identifier.is_none()
        && command.new_succeeding_sibling_node_aggregate_identifier.is_none()
    {
        return Err(CommandError::InvalidCommand(
            "a move needs a new parent or a new succeeding sibling".to_string(),
        ));
    }

    let affected = command.relation_distribution_strategy.affected_dimension_space_points(
        &command.dimension_space_point,
        &node_aggregate.covered_dimension_space_points(),
        checks.variation_graph(),
    );

    if let Some(new_parent_identifier) = &command.new_parent_node_aggregate_identifier {
        checks.require_not_tethered(&node_aggregate)?;
        let new_parent = checks.require_node_aggregate(new_parent_identifier)?;
        checks.require_coverage_of_set(&new_parent, &affected)?;
        let node_type = checks.require_node_type(node_aggregate.node_type_name())?;
        checks.require_node_type_allowed_below(&new_parent, node_type, node_aggregate.node_name())?;
        for point in &affected {
            require_not_descendant(checks, &node_aggregate.identifier(), new_parent_identifier, point)?;
        }
        if let Some(node_name) = node_aggregate.node_name() {
            let covered: DimensionSpacePointSet = checks
                .graph
                .children_named(&checks.content_stream_identifier, node_name, new_parent_identifier, &affected)
                .into_iter()
                .filter(|(child, _)| child != &node_aggregate.identifier())
                .map(|(_, origin)| origin)
                .collect();
            if !covered.is_empty() {
                return Err(CommandError::NodeNameIsAlreadyCovered {
                    node_name: node_name.clone(),
                    node_aggregate_identifier: node_aggregate.identifier(),
                    covered,
                });
            }
        }
    }

    if let Some(sibling) = &command.new_succeeding_sibling_node_aggregate_identifier {
        if sibling == &node_aggregate.identifier() {
            return Err(CommandError::InvalidCommand(format!(
                "node aggregate {sibling} cannot succeed itself"
            )));
        }
        checks.require_node_aggregate(sibling)?;
    }

    let mut node_move_mappings = Vec::new();
    let mut sibling_found = false;
    let mut target_parent = command.new_parent_node_aggregate_identifier;
    for point in &affected {
        let current_parent = checks.parent_in(&node_aggregate.identifier(), point);
        if let Some(sibling) = &command.new_succeeding_sibling_node_aggregate_identifier {
            target_parent = command.new_parent_node_aggregate_identifier.or(current_parent);
            match checks.parent_in(sibling, point) {
                Some(actual) if Some(actual) != target_parent => {
                    return Err(CommandError::NodeAggregateIsNoSibling {
                        succeeding_sibling: *sibling,
                        parent_node_aggregate_identifier: target_parent.unwrap_or(actual),
                    })
                }
                Some(_) => sibling_found = true,
                None => {}
            }
        }
        let new_parent = command
            .new_parent_node_aggregate_identifier
            .filter(|new_parent| Some(*new_parent) != current_parent);
        if new_parent.is_none() && command.new_succeeding_sibling_node_aggregate_identifier.is_none() {
            continue;
        }
        node_move_mappings.push(NodeMoveMapping {
            dimension_space_point: point.clone(),
            new_parent_node_aggregate_identifier: new_parent,
            new_succeeding_sibling_node_aggregate_identifier: command.new_succeeding_sibling_node_aggregate_identifier,
        });
    }

    if let (Some(sibling), false, Some(parent)) = (
        &command.new_succeeding_sibling_node_aggregate_identifier,
        sibling_found,
        target_parent,
    ) {
        return Err(CommandError::NodeAggregateIsNoSibling {
            succeeding_sibling: *sibling,
            parent_node_aggregate_identifier: parent,
        });
    }

    if node_move_mappings.is_empty() {
        debug!(node_aggregate = %node_aggregate.identifier(), "Move changes nothing");
        return Ok(Vec::new());
    }
    Ok(vec![ContentRepositoryEvent::NodeAggregateWasMoved(NodeAggregateWasMoved {
        content_stream_identifier: checks.content_stream_identifier,
        node_aggregate_identifier: node_aggregate.identifier(),
        node_move_mappings,
    })])
}

/// Fail if `new_parent` is `moved` itself or one of its descendants in `point`
fn require_not_descendant(
    checks: &ConstraintChecks<'_>,
    moved: &NodeAggregateIdentifier,
    new_parent: &NodeAggregateIdentifier,
    point: &DimensionSpacePoint,
) -> CommandHandlingResult<()> {
    let subgraph = checks.graph.subgraph(
        checks.content_stream_identifier,
        point.clone(),
        VisibilityConstraints::without_restrictions(),
    );
    let mut ancestor = Some(*new_parent);
    while let Some(current) = ancestor {
        if &current == moved {
            return Err(CommandError::NodeAggregateIsDescendant {
                node_aggregate_identifier: *moved,
                new_parent: *new_parent,
                dimension_space_point: point.clone(),
            });
        }
        ancestor = subgraph
            .find_parent_node(&current)
            .map(|parent| parent.node_aggregate_identifier);
    }
    Ok(())
}

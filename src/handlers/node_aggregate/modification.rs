//! Property, reference and name changes of existing node aggregates

use super::ConstraintChecks;
use crate::aggregate::NodeAggregate;
use crate::commands::{
    ChangeNodeAggregateName, CommandError, CommandHandlingResult, SetNodeProperties, SetNodeReferences,
};
use crate::domain_events::ContentRepositoryEvent;
use crate::events::{NodeAggregateNameWasChanged, NodePropertiesWereSet, NodeReferencesWereSet};
use crate::value_objects::{DimensionSpacePointSet, OriginDimensionSpacePoint, PropertyScope};
use tracing::debug;

pub(super) fn set_properties(
    checks: &ConstraintChecks<'_>,
    command: &SetNodeProperties,
) -> CommandHandlingResult<Vec<ContentRepositoryEvent>> {
    let node_aggregate = checks.require_node_aggregate(&command.node_aggregate_identifier)?;
    let origin = &command.origin_dimension_space_point;
    checks.require_occupation(&node_aggregate, origin)?;
    let node_type = checks.require_node_type(node_aggregate.node_type_name())?;
    let property_values = checks.serialize_property_values(node_type, &command.property_values)?;

    let events = property_values
        .split_by(|name| node_type.property_scope(name.as_str()))
        .into_iter()
        .map(|(scope, property_values)| {
            ContentRepositoryEvent::NodePropertiesWereSet(NodePropertiesWereSet {
                content_stream_identifier: checks.content_stream_identifier,
                node_aggregate_identifier: node_aggregate.identifier(),
                origin_dimension_space_point: origin.clone(),
                affected_origin_dimension_space_points: affected_origins(checks, &node_aggregate, origin, scope),
                property_values,
            })
        })
        .collect();
    Ok(events)
}

pub(super) fn set_references(
    checks: &ConstraintChecks<'_>,
    command: &SetNodeReferences,
) -> CommandHandlingResult<Vec<ContentRepositoryEvent>> {
    let source = checks.require_node_aggregate(&command.source_node_aggregate_identifier)?;
    let origin = &command.source_origin_dimension_space_point;
    checks.require_occupation(&source, origin)?;
    let node_type = checks.require_node_type(source.node_type_name())?;
    let Some(reference) = node_type.reference(command.reference_name.as_str()) else {
        return Err(CommandError::ReferenceCannotBeSet {
            reference_name: command.reference_name.clone(),
            node_type_name: node_type.name().clone(),
        });
    };

    let given = command.destination_node_aggregate_identifiers.len();
    if let Some(max_items) = reference.max_items.filter(|max_items| given > *max_items) {
        return Err(CommandError::TooManyReferences {
            reference_name: command.reference_name.clone(),
            max_items,
            given,
        });
    }
    for destination in &command.destination_node_aggregate_identifiers {
        let destination = checks.require_node_aggregate(destination)?;
        let destination_type = checks.require_node_type(destination.node_type_name())?;
        if !destination_type.is_allowed_by(&reference.node_types) {
            return Err(CommandError::ReferenceTargetNotAllowed {
                reference_name: command.reference_name.clone(),
                destination_node_type_name: destination_type.name().clone(),
            });
        }
    }

    Ok(vec![ContentRepositoryEvent::NodeReferencesWereSet(NodeReferencesWereSet {
        content_stream_identifier: checks.content_stream_identifier,
        source_node_aggregate_identifier: source.identifier(),
        source_origin_dimension_space_point: origin.clone(),
        affected_source_origin_dimension_space_points: affected_origins(checks, &source, origin, reference.scope),
        reference_name: command.reference_name.clone(),
        destination_node_aggregate_identifiers: command.destination_node_aggregate_identifiers.clone(),
    })])
}

pub(super) fn change_name(
    checks: &ConstraintChecks<'_>,
    command: &ChangeNodeAggregateName,
) -> CommandHandlingResult<Vec<ContentRepositoryEvent>> {
    let node_aggregate = checks.require_node_aggregate(&command.node_aggregate_identifier)?;
    checks.require_not_root(&node_aggregate)?;
    checks.require_not_tethered(&node_aggregate)?;
    if node_aggregate.node_name() == Some(&command.new_node_name) {
        debug!(node_aggregate = %node_aggregate.identifier(), "Node name unchanged");
        return Ok(Vec::new());
    }

    let covered = node_aggregate.covered_dimension_space_points();
    for parent in checks
        .graph
        .find_parent_node_aggregates(&checks.content_stream_identifier, &node_aggregate.identifier())
    {
        checks.require_node_name_unoccupied(
            &command.new_node_name,
            &parent.identifier(),
            &covered.intersection(&parent.covered_dimension_space_points()),
            Some(&node_aggregate.identifier()),
        )?;
    }

    Ok(vec![ContentRepositoryEvent::NodeAggregateNameWasChanged(NodeAggregateNameWasChanged {
        content_stream_identifier: checks.content_stream_identifier,
        node_aggregate_identifier: node_aggregate.identifier(),
        new_node_name: command.new_node_name.clone(),
    })])
}

/// Origins a write at `origin` reaches under `scope`
fn affected_origins(
    checks: &ConstraintChecks<'_>,
    node_aggregate: &NodeAggregate,
    origin: &OriginDimensionSpacePoint,
    scope: PropertyScope,
) -> DimensionSpacePointSet {
    let occupied = node_aggregate.occupied_dimension_space_points();
    match scope {
        PropertyScope::Node => DimensionSpacePointSet::new([origin.to_dimension_space_point()]),
        PropertyScope::Specializations => occupied.intersection(&checks.variation_graph().specialization_set(
            origin,
            true,
            &DimensionSpacePointSet::empty(),
        )),
        PropertyScope::NodeAggregate => occupied,
    }
}

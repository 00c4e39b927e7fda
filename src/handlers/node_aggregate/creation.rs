//! Creation of root and regular node aggregates, including tethered descendants

use super::ConstraintChecks;
use crate::commands::{
    path_key, CommandError, CommandHandlingResult, CreateNodeAggregateWithNode, CreateRootNodeAggregateWithNode,
};
use crate::domain_events::ContentRepositoryEvent;
use crate::events::{NodeAggregateWithNodeWasCreated, RootNodeAggregateWithNodeWasCreated};
use crate::node_types::NodeType;
use crate::value_objects::{
    DimensionSpacePointSet, NodeAggregateClassification, NodeAggregateIdentifier, NodePath,
    OriginDimensionSpacePoint,
};

pub(super) fn create_root(
    checks: &ConstraintChecks<'_>,
    command: &CreateRootNodeAggregateWithNode,
) -> CommandHandlingResult<Vec<ContentRepositoryEvent>> {
    checks.require_node_aggregate_absent(&command.node_aggregate_identifier)?;
    let node_type = checks.require_node_type(&command.node_type_name)?;
    checks.require_node_type_not_abstract(node_type)?;
    if !node_type.is_root() {
        return Err(CommandError::NodeTypeIsNotOfTypeRoot(node_type.name().clone()));
    }
    if checks
        .graph
        .find_root_node_aggregate_by_type(&checks.content_stream_identifier, node_type.name())
        .is_some()
    {
        return Err(CommandError::RootNodeAggregateTypeIsAlreadyOccupied(node_type.name().clone()));
    }

    Ok(vec![ContentRepositoryEvent::RootNodeAggregateWithNodeWasCreated(
        RootNodeAggregateWithNodeWasCreated {
            content_stream_identifier: checks.content_stream_identifier,
            node_aggregate_identifier: command.node_aggregate_identifier,
            node_type_name: command.node_type_name.clone(),
            covered_dimension_space_points: checks.variation_graph().allowed_dimension_subspace().clone(),
            node_aggregate_classification: NodeAggregateClassification::Root,
        },
    )])
}

pub(super) fn create(
    checks: &ConstraintChecks<'_>,
    command: &CreateNodeAggregateWithNode,
) -> CommandHandlingResult<Vec<ContentRepositoryEvent>> {
    let origin = &command.origin_dimension_space_point;
    checks.require_dimension_space_point(origin)?;
    let node_type = checks.require_node_type(&command.node_type_name)?;
    checks.require_node_type_not_abstract(node_type)?;
    if node_type.is_root() {
        return Err(CommandError::NodeTypeIsOfTypeRoot(node_type.name().clone()));
    }
    checks.require_node_aggregate_absent(&command.node_aggregate_identifier)?;
    for descendant in command.tethered_descendant_node_aggregate_identifiers.values() {
        checks.require_node_aggregate_absent(descendant)?;
    }

    let parent = checks.require_node_aggregate(&command.parent_node_aggregate_identifier)?;
    checks.require_coverage(&parent, origin)?;
    checks.require_node_type_allowed_below(&parent, node_type, command.node_name.as_ref())?;

    let covered = checks
        .variation_graph()
        .specialization_set(origin, true, &DimensionSpacePointSet::empty())
        .intersection(&parent.covered_dimension_space_points());
    if let Some(sibling) = &command.succeeding_sibling_node_aggregate_identifier {
        checks.require_node_aggregate(sibling)?;
        checks.require_succeeding_sibling(sibling, &parent.identifier(), &covered)?;
    }
    if let Some(node_name) = &command.node_name {
        checks.require_node_name_unoccupied(node_name, &parent.identifier(), &covered, None)?;
    }

    let initial_property_values = checks
        .default_property_values(node_type)?
        .merge(&checks.serialize_property_values(node_type, &command.initial_property_values)?);

    let mut events = vec![ContentRepositoryEvent::NodeAggregateWithNodeWasCreated(
        NodeAggregateWithNodeWasCreated {
            content_stream_identifier: checks.content_stream_identifier,
            node_aggregate_identifier: command.node_aggregate_identifier,
            node_type_name: command.node_type_name.clone(),
            origin_dimension_space_point: origin.clone(),
            covered_dimension_space_points: covered.clone(),
            parent_node_aggregate_identifier: parent.identifier(),
            node_name: command.node_name.clone(),
            initial_property_values,
            node_aggregate_classification: NodeAggregateClassification::Regular,
            succeeding_node_aggregate_identifier: command.succeeding_sibling_node_aggregate_identifier,
        },
    )];
    let below = TetheredCreation {
        command,
        origin,
        covered: &covered,
    };
    below.create_descendants(
        checks,
        node_type,
        &command.node_aggregate_identifier,
        &NodePath::from_names(Vec::new()),
        &mut events,
    )?;
    Ok(events)
}

/// Shared origin and coverage of a new aggregate and all its tethered descendants
struct TetheredCreation<'c> {
    command: &'c CreateNodeAggregateWithNode,
    origin: &'c OriginDimensionSpacePoint,
    covered: &'c DimensionSpacePointSet,
}

impl TetheredCreation<'_> {
    fn create_descendants(
        &self,
        checks: &ConstraintChecks<'_>,
        node_type: &NodeType,
        parent: &NodeAggregateIdentifier,
        path: &NodePath,
        events: &mut Vec<ContentRepositoryEvent>,
    ) -> CommandHandlingResult<()> {
        for tethered in node_type.tethered_nodes() {
            let path = path.appended(tethered.name.clone());
            let key = path_key(&path);
            let identifier = self
                .command
                .tethered_descendant_node_aggregate_identifiers
                .get(&key)
                .copied()
                .ok_or_else(|| {
                    CommandError::InvalidCommand(format!("no identifier given for tethered descendant \"{key}\""))
                })?;
            let tethered_type = checks.require_node_type(&tethered.node_type_name)?;

            events.push(ContentRepositoryEvent::NodeAggregateWithNodeWasCreated(
                NodeAggregateWithNodeWasCreated {
                    content_stream_identifier: checks.content_stream_identifier,
                    node_aggregate_identifier: identifier,
                    node_type_name: tethered.node_type_name.clone(),
                    origin_dimension_space_point: self.origin.clone(),
                    covered_dimension_space_points: self.covered.clone(),
                    parent_node_aggregate_identifier: *parent,
                    node_name: Some(tethered.name.clone()),
                    initial_property_values: checks.default_property_values(tethered_type)?,
                    node_aggregate_classification: NodeAggregateClassification::Tethered,
                    succeeding_node_aggregate_identifier: None,
                },
            ));
            self.create_descendants(checks, tethered_type, &identifier, &path, events)?;
        }
        Ok(())
    }
}

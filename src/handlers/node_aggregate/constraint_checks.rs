//! Preconditions shared by the node aggregate commands
//!
//! Every check reads the projected state of one content stream. Nothing here mutates; a
//! failing check aborts the command before the first event is published.

use crate::aggregate::NodeAggregate;
use crate::commands::{CommandError, CommandHandlingResult};
use crate::dimension_space::InterDimensionalVariationGraph;
use crate::handlers::CommandHandlerContext;
use crate::node_types::{serialize_property_value, NodeType};
use crate::projections::ContentGraphProjection;
use crate::queries::VisibilityConstraints;
use crate::value_objects::{
    ContentStreamIdentifier, DimensionSpacePoint, DimensionSpacePointSet, NodeAggregateIdentifier, NodeName,
    NodeTypeName, OriginDimensionSpacePoint, PropertyName, PropertyValuesToWrite, SerializedPropertyValues,
};

/// Read access to everything a node aggregate command is validated against
pub(super) struct ConstraintChecks<'a> {
    pub(super) context: &'a CommandHandlerContext,
    pub(super) graph: &'a ContentGraphProjection,
    pub(super) content_stream_identifier: ContentStreamIdentifier,
}

impl<'a> ConstraintChecks<'a> {
    pub(super) fn new(
        context: &'a CommandHandlerContext,
        graph: &'a ContentGraphProjection,
        content_stream_identifier: ContentStreamIdentifier,
    ) -> Self {
        Self {
            context,
            graph,
            content_stream_identifier,
        }
    }

    pub(super) fn variation_graph(&self) -> &'a InterDimensionalVariationGraph {
        &self.context.variation_graph
    }

    pub(super) fn require_dimension_space_point(&self, point: &DimensionSpacePoint) -> CommandHandlingResult<()> {
        if self.context.zookeeper.is_allowed(point) {
            Ok(())
        } else {
            Err(CommandError::DimensionSpacePointNotFound(point.clone()))
        }
    }

    pub(super) fn require_node_type(&self, node_type_name: &NodeTypeName) -> CommandHandlingResult<&'a NodeType> {
        self.context
            .node_type_manager
            .get_node_type(node_type_name)
            .ok_or_else(|| CommandError::NodeTypeNotFound(node_type_name.clone()))
    }

    pub(super) fn require_node_type_not_abstract(&self, node_type: &NodeType) -> CommandHandlingResult<()> {
        if node_type.is_abstract() {
            return Err(CommandError::NodeTypeIsAbstract(node_type.name().clone()));
        }
        Ok(())
    }

    pub(super) fn require_node_aggregate(
        &self,
        node_aggregate_identifier: &NodeAggregateIdentifier,
    ) -> CommandHandlingResult<NodeAggregate> {
        self.graph
            .find_node_aggregate_by_id(&self.content_stream_identifier, node_aggregate_identifier)
            .ok_or(CommandError::NodeAggregateCurrentlyDoesNotExist(*node_aggregate_identifier))
    }

    pub(super) fn require_node_aggregate_absent(
        &self,
        node_aggregate_identifier: &NodeAggregateIdentifier,
    ) -> CommandHandlingResult<()> {
        match self
            .graph
            .find_node_aggregate_by_id(&self.content_stream_identifier, node_aggregate_identifier)
        {
            Some(_) => Err(CommandError::NodeAggregateCurrentlyExists(*node_aggregate_identifier)),
            None => Ok(()),
        }
    }

    pub(super) fn require_not_root(&self, node_aggregate: &NodeAggregate) -> CommandHandlingResult<()> {
        if node_aggregate.is_root() {
            return Err(CommandError::NodeAggregateIsRoot(node_aggregate.identifier()));
        }
        Ok(())
    }

    pub(super) fn require_not_tethered(&self, node_aggregate: &NodeAggregate) -> CommandHandlingResult<()> {
        if node_aggregate.is_tethered() {
            return Err(CommandError::NodeAggregateIsTethered(node_aggregate.identifier()));
        }
        Ok(())
    }

    pub(super) fn require_coverage(
        &self,
        node_aggregate: &NodeAggregate,
        point: &DimensionSpacePoint,
    ) -> CommandHandlingResult<()> {
        if node_aggregate.covers(point) {
            return Ok(());
        }
        Err(CommandError::NodeAggregateCurrentlyDoesNotCoverDimensionSpacePoint {
            node_aggregate_identifier: node_aggregate.identifier(),
            dimension_space_point: point.clone(),
        })
    }

    pub(super) fn require_coverage_of_set(
        &self,
        node_aggregate: &NodeAggregate,
        points: &DimensionSpacePointSet,
    ) -> CommandHandlingResult<()> {
        let uncovered = points.difference(&node_aggregate.covered_dimension_space_points());
        if uncovered.is_empty() {
            return Ok(());
        }
        Err(CommandError::NodeAggregateDoesCurrentlyNotCoverDimensionSpacePointSet {
            node_aggregate_identifier: node_aggregate.identifier(),
            uncovered,
        })
    }

    pub(super) fn require_occupation(
        &self,
        node_aggregate: &NodeAggregate,
        origin: &OriginDimensionSpacePoint,
    ) -> CommandHandlingResult<()> {
        if node_aggregate.occupies(origin) {
            return Ok(());
        }
        Err(CommandError::NodeAggregateCurrentlyDoesNotOccupyDimensionSpacePoint {
            node_aggregate_identifier: node_aggregate.identifier(),
            origin: origin.to_dimension_space_point(),
        })
    }

    pub(super) fn require_no_occupation(
        &self,
        node_aggregate: &NodeAggregate,
        origin: &OriginDimensionSpacePoint,
    ) -> CommandHandlingResult<()> {
        if !node_aggregate.occupies(origin) {
            return Ok(());
        }
        Err(CommandError::DimensionSpacePointIsAlreadyOccupied {
            node_aggregate_identifier: node_aggregate.identifier(),
            origin: origin.to_dimension_space_point(),
        })
    }

    /// Check the child node constraints of `parent`'s type and, for tethered parents, the
    /// constraints the grandparent declares for that tethered node
    pub(super) fn require_node_type_allowed_below(
        &self,
        parent: &NodeAggregate,
        node_type: &NodeType,
        node_name: Option<&NodeName>,
    ) -> CommandHandlingResult<()> {
        let parent_type = self.require_node_type(parent.node_type_name())?;
        if let Some(node_name) = node_name {
            if parent_type.tethered_node(node_name).is_some() {
                return Err(CommandError::NodeConstraintException(format!(
                    "node name \"{node_name}\" is reserved for a tethered child of {}",
                    parent_type.name()
                )));
            }
        }
        if !parent_type.allows_child_node_type(node_type) {
            return Err(CommandError::NodeConstraintException(format!(
                "node type {} is not allowed below nodes of type {}",
                node_type.name(),
                parent_type.name()
            )));
        }

        let Some(parent_name) = parent.node_name().filter(|_| parent.is_tethered()) else {
            return Ok(());
        };
        for grandparent in self
            .graph
            .find_parent_node_aggregates(&self.content_stream_identifier, &parent.identifier())
        {
            let grandparent_type = self.require_node_type(grandparent.node_type_name())?;
            let Some(definition) = grandparent_type.tethered_node(parent_name) else {
                continue;
            };
            if !node_type.is_allowed_by(&definition.constraints) {
                return Err(CommandError::NodeConstraintException(format!(
                    "node type {} is not allowed below the tethered node \"{parent_name}\" of {}",
                    node_type.name(),
                    grandparent_type.name()
                )));
            }
        }
        Ok(())
    }

    /// Fail if a child of `parent` other than `except` is named `node_name` in any of `points`
    pub(super) fn require_node_name_unoccupied(
        &self,
        node_name: &NodeName,
        parent: &NodeAggregateIdentifier,
        points: &DimensionSpacePointSet,
        except: Option<&NodeAggregateIdentifier>,
    ) -> CommandHandlingResult<()> {
        let occupied: DimensionSpacePointSet = self
            .graph
            .children_named(&self.content_stream_identifier, node_name, parent, points)
            .into_iter()
            .filter(|(child, _)| Some(child) != except)
            .map(|(_, origin)| origin)
            .collect();
        if occupied.is_empty() {
            return Ok(());
        }
        Err(CommandError::NodeNameIsAlreadyOccupied {
            node_name: node_name.clone(),
            parent_node_aggregate_identifier: *parent,
            occupied,
        })
    }

    /// Parent of `child` in `point`, hidden nodes included
    pub(super) fn parent_in(
        &self,
        child: &NodeAggregateIdentifier,
        point: &DimensionSpacePoint,
    ) -> Option<NodeAggregateIdentifier> {
        self.graph
            .subgraph(
                self.content_stream_identifier,
                point.clone(),
                VisibilityConstraints::without_restrictions(),
            )
            .find_parent_node(child)
            .map(|parent| parent.node_aggregate_identifier)
    }

    /// Fail unless `sibling` is a child of `parent` in at least one of `points` and of no other
    /// parent in any of them. Points the sibling is absent from append at the end.
    pub(super) fn require_succeeding_sibling(
        &self,
        sibling: &NodeAggregateIdentifier,
        parent: &NodeAggregateIdentifier,
        points: &DimensionSpacePointSet,
    ) -> CommandHandlingResult<()> {
        let mut found = false;
        for point in points {
            match self.parent_in(sibling, point) {
                Some(actual) if &actual != parent => return Err(no_sibling(sibling, parent)),
                Some(_) => found = true,
                None => {}
            }
        }
        if found {
            Ok(())
        } else {
            Err(no_sibling(sibling, parent))
        }
    }

    /// Points every parent of the aggregate covers
    pub(super) fn common_parent_coverage(&self, node_aggregate: &NodeAggregate) -> DimensionSpacePointSet {
        self.graph
            .find_parent_node_aggregates(&self.content_stream_identifier, &node_aggregate.identifier())
            .iter()
            .map(NodeAggregate::covered_dimension_space_points)
            .reduce(|common, covered| common.intersection(&covered))
            .unwrap_or_default()
    }

    /// Type check and serialize values against the declared properties of `node_type`
    pub(super) fn serialize_property_values(
        &self,
        node_type: &NodeType,
        values: &PropertyValuesToWrite,
    ) -> CommandHandlingResult<SerializedPropertyValues> {
        let mut serialized = SerializedPropertyValues::empty();
        for (name, value) in values.iter() {
            let property_name = PropertyName::new(name.as_str());
            let Some(property) = node_type.property(name) else {
                return Err(CommandError::PropertyCannotBeSet {
                    property_name,
                    node_type_name: node_type.name().clone(),
                });
            };
            let value = serialize_property_value(property, value).map_err(|reason| {
                CommandError::PropertyTypeMismatch {
                    property_name: property_name.clone(),
                    node_type_name: node_type.name().clone(),
                    reason,
                }
            })?;
            serialized.insert(property_name, value);
        }
        Ok(serialized)
    }

    /// Declared default values of `node_type`
    pub(super) fn default_property_values(&self, node_type: &NodeType) -> CommandHandlingResult<SerializedPropertyValues> {
        let defaults: PropertyValuesToWrite = node_type
            .default_values()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        self.serialize_property_values(node_type, &defaults)
    }
}

fn no_sibling(sibling: &NodeAggregateIdentifier, parent: &NodeAggregateIdentifier) -> CommandError {
    CommandError::NodeAggregateIsNoSibling {
        succeeding_sibling: *sibling,
        parent_node_aggregate_identifier: *parent,
    }
}

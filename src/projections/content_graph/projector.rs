//! Event handlers of the content graph projection
//!
//! Every handler resolves all anchors it needs before mutating anything, so an event that
//! does not fit the projected state leaves the projection untouched.

use super::records::{ContentStreamGraph, NodeRecord, NodeRelationAnchorPoint};
use super::ContentGraphProjection;
use crate::domain_events::ContentRepositoryEvent;
use crate::events::*;
use crate::projections::{ProjectionError, ProjectionResult};
use crate::value_objects::{
    ContentStreamIdentifier, DimensionSpacePoint, DimensionSpacePointSet, NodeAggregateIdentifier, NodeName,
    OriginDimensionSpacePoint, SerializedPropertyValues,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

enum VariantPlacement {
    /// Take over the edges of an existing node of the aggregate in one point
    Transfer {
        from: NodeRelationAnchorPoint,
        point_hash: String,
    },
    /// Attach below the parent in a point the aggregate did not cover yet
    Connect {
        parent: NodeRelationAnchorPoint,
        dimension_space_point: DimensionSpacePoint,
        name: Option<NodeName>,
    },
}

impl ContentGraphProjection {
    pub(super) fn project(&mut self, event: &ContentRepositoryEvent) -> ProjectionResult<()> {
        match event {
            ContentRepositoryEvent::ContentStreamWasCreated(e) => {
                self.streams.entry(e.content_stream_identifier).or_default();
                Ok(())
            }
            ContentRepositoryEvent::ContentStreamWasForked(e) => self.when_content_stream_was_forked(e),
            ContentRepositoryEvent::ContentStreamWasRemoved(e) => {
                self.when_content_stream_was_removed(&e.content_stream_identifier);
                Ok(())
            }
            ContentRepositoryEvent::RootNodeAggregateWithNodeWasCreated(e) => {
                self.when_root_node_aggregate_with_node_was_created(e)
            }
            ContentRepositoryEvent::NodeAggregateWithNodeWasCreated(e) => {
                self.when_node_aggregate_with_node_was_created(e)
            }
            ContentRepositoryEvent::NodeSpecializationVariantWasCreated(e) => self.create_variant(
                &e.content_stream_identifier,
                &e.node_aggregate_identifier,
                &e.source_origin,
                &e.specialization_origin,
                &e.specialization_coverage,
            ),
            ContentRepositoryEvent::NodeGeneralizationVariantWasCreated(e) => self.create_variant(
                &e.content_stream_identifier,
                &e.node_aggregate_identifier,
                &e.source_origin,
                &e.generalization_origin,
                &e.generalization_coverage,
            ),
            ContentRepositoryEvent::NodePeerVariantWasCreated(e) => self.create_variant(
                &e.content_stream_identifier,
                &e.node_aggregate_identifier,
                &e.source_origin,
                &e.peer_origin,
                &e.peer_coverage,
            ),
            ContentRepositoryEvent::NodeAggregateWasMoved(e) => self.when_node_aggregate_was_moved(e),
            ContentRepositoryEvent::NodeAggregateWasRemoved(e) => self.when_node_aggregate_was_removed(e),
            ContentRepositoryEvent::NodeAggregateWasDisabled(e) => {
                let graph = self.graph_mut(&e.content_stream_identifier)?;
                let disabled = graph.disabled.entry(e.node_aggregate_identifier).or_default();
                for point in &e.affected_dimension_space_points {
                    disabled.insert(point.hash().to_string(), point.clone());
                }
                Ok(())
            }
            ContentRepositoryEvent::NodeAggregateWasEnabled(e) => {
                let graph = self.graph_mut(&e.content_stream_identifier)?;
                if let Some(disabled) = graph.disabled.get_mut(&e.node_aggregate_identifier) {
                    for hash in e.affected_dimension_space_points.hashes() {
                        disabled.remove(hash);
                    }
                    if disabled.is_empty() {
                        graph.disabled.remove(&e.node_aggregate_identifier);
                    }
                }
                Ok(())
            }
            ContentRepositoryEvent::NodePropertiesWereSet(e) => self.when_node_properties_were_set(e),
            ContentRepositoryEvent::NodeReferencesWereSet(e) => self.when_node_references_were_set(e),
            ContentRepositoryEvent::NodeAggregateNameWasChanged(e) => {
                let graph = self.graph_mut(&e.content_stream_identifier)?;
                let anchors: Vec<NodeRelationAnchorPoint> = graph
                    .node_index
                    .get(&e.node_aggregate_identifier)
                    .into_iter()
                    .flat_map(|origins| origins.values().copied())
                    .collect();
                for anchor in anchors {
                    for edge in graph.parents.get_mut(&anchor).into_iter().flat_map(|edges| edges.values_mut()) {
                        edge.name = Some(e.new_node_name.clone());
                    }
                }
                Ok(())
            }
            // Workspace events do not touch the graph
            _ => Ok(()),
        }
    }

    fn graph(&self, content_stream_identifier: &ContentStreamIdentifier) -> ProjectionResult<&ContentStreamGraph> {
        self.streams
            .get(content_stream_identifier)
            .ok_or_else(|| Self::missing_stream(content_stream_identifier))
    }

    fn graph_mut(
        &mut self,
        content_stream_identifier: &ContentStreamIdentifier,
    ) -> ProjectionResult<&mut ContentStreamGraph> {
        self.streams
            .get_mut(content_stream_identifier)
            .ok_or_else(|| Self::missing_stream(content_stream_identifier))
    }

    fn allocate_anchor(&mut self) -> NodeRelationAnchorPoint {
        self.last_anchor += 1;
        NodeRelationAnchorPoint::new(self.last_anchor)
    }

    fn insert_record(&mut self, record: NodeRecord) {
        self.usage.insert(record.anchor, 1);
        self.nodes.insert(record.anchor, record);
    }

    /// Drop one stream's use of a record, deleting it when no stream uses it anymore
    fn release(&mut self, anchor: NodeRelationAnchorPoint) {
        match self.usage.get_mut(&anchor) {
            Some(count) if *count > 1 => *count -= 1,
            _ => {
                self.usage.remove(&anchor);
                self.nodes.remove(&anchor);
            }
        }
    }

    /// An anchor of a record only `content_stream_identifier` uses, copying the record if shared
    fn copy_on_write(
        &mut self,
        content_stream_identifier: &ContentStreamIdentifier,
        anchor: NodeRelationAnchorPoint,
    ) -> ProjectionResult<NodeRelationAnchorPoint> {
        if self.usage.get(&anchor).copied().unwrap_or(0) <= 1 {
            return Ok(anchor);
        }
        let record = self
            .nodes
            .get(&anchor)
            .cloned()
            .ok_or_else(|| missing_anchor(anchor))?;
        let copy = self.allocate_anchor();
        self.insert_record(NodeRecord { anchor: copy, ..record });
        if let Some(count) = self.usage.get_mut(&anchor) {
            *count -= 1;
        }
        self.graph_mut(content_stream_identifier)?.replace_anchor(anchor, copy);
        debug!(from = %anchor, to = %copy, "Copied shared node record");
        Ok(copy)
    }

    fn when_content_stream_was_forked(&mut self, event: &ContentStreamWasForked) -> ProjectionResult<()> {
        let source = self.graph(&event.source_content_stream_identifier)?.clone();
        for anchor in source.anchors() {
            *self.usage.entry(anchor).or_insert(0) += 1;
        }
        self.streams.insert(event.new_content_stream_identifier, source);
        Ok(())
    }

    fn when_content_stream_was_removed(&mut self, content_stream_identifier: &ContentStreamIdentifier) {
        if let Some(graph) = self.streams.remove(content_stream_identifier) {
            for anchor in graph.anchors() {
                self.release(anchor);
            }
        }
    }

    fn when_root_node_aggregate_with_node_was_created(
        &mut self,
        event: &RootNodeAggregateWithNodeWasCreated,
    ) -> ProjectionResult<()> {
        self.graph(&event.content_stream_identifier)?;
        let anchor = self.allocate_anchor();
        let origin = OriginDimensionSpacePoint::empty();
        self.insert_record(NodeRecord {
            anchor,
            node_aggregate_identifier: event.node_aggregate_identifier,
            origin_dimension_space_point: origin.clone(),
            node_type_name: event.node_type_name.clone(),
            properties: SerializedPropertyValues::empty(),
            references: BTreeMap::new(),
            classification: event.node_aggregate_classification,
        });
        let graph = self.graph_mut(&event.content_stream_identifier)?;
        graph
            .node_index
            .entry(event.node_aggregate_identifier)
            .or_default()
            .insert(origin.hash().to_string(), anchor);
        for point in &event.covered_dimension_space_points {
            graph.connect(NodeRelationAnchorPoint::ROOT, anchor, point, None, None);
        }
        Ok(())
    }

    fn when_node_aggregate_with_node_was_created(
        &mut self,
        event: &NodeAggregateWithNodeWasCreated,
    ) -> ProjectionResult<()> {
        let graph = self.graph(&event.content_stream_identifier)?;
        let mut placements = Vec::with_capacity(event.covered_dimension_space_points.len());
        for point in &event.covered_dimension_space_points {
            let parent = graph
                .covering_anchor(&event.parent_node_aggregate_identifier, point.hash())
                .ok_or_else(|| not_covering(&event.parent_node_aggregate_identifier, point))?;
            let succeeding = event
                .succeeding_node_aggregate_identifier
                .and_then(|sibling| graph.covering_anchor(&sibling, point.hash()));
            placements.push((point.clone(), parent, succeeding));
        }

        let anchor = self.allocate_anchor();
        self.insert_record(NodeRecord {
            anchor,
            node_aggregate_identifier: event.node_aggregate_identifier,
            origin_dimension_space_point: event.origin_dimension_space_point.clone(),
            node_type_name: event.node_type_name.clone(),
            properties: SerializedPropertyValues::empty().merge(&event.initial_property_values),
            references: BTreeMap::new(),
            classification: event.node_aggregate_classification,
        });
        let graph = self.graph_mut(&event.content_stream_identifier)?;
        graph
            .node_index
            .entry(event.node_aggregate_identifier)
            .or_default()
            .insert(event.origin_dimension_space_point.hash().to_string(), anchor);
        for (point, parent, succeeding) in placements {
            graph.connect(parent, anchor, &point, event.node_name.clone(), succeeding);
        }
        Ok(())
    }

    fn create_variant(
        &mut self,
        content_stream_identifier: &ContentStreamIdentifier,
        node_aggregate_identifier: &NodeAggregateIdentifier,
        source_origin: &OriginDimensionSpacePoint,
        new_origin: &OriginDimensionSpacePoint,
        coverage: &DimensionSpacePointSet,
    ) -> ProjectionResult<()> {
        let graph = self.graph(content_stream_identifier)?;
        let source_anchor = graph
            .node_index
            .get(node_aggregate_identifier)
            .and_then(|origins| origins.get(source_origin.hash()))
            .copied()
            .ok_or_else(|| {
                ProjectionError::Inconsistent(format!(
                    "node aggregate {node_aggregate_identifier} does not occupy {source_origin}"
                ))
            })?;
        let source = self
            .nodes
            .get(&source_anchor)
            .cloned()
            .ok_or_else(|| missing_anchor(source_anchor))?;
        let parent = self.aggregate_parent(graph, node_aggregate_identifier, source_anchor);

        let mut placements = Vec::with_capacity(coverage.len());
        for point in coverage {
            match graph.covering_anchor(node_aggregate_identifier, point.hash()) {
                Some(from) => placements.push(VariantPlacement::Transfer {
                    from,
                    point_hash: point.hash().to_string(),
                }),
                None => {
                    let (parent_aggregate, name) = parent.as_ref().ok_or_else(|| {
                        ProjectionError::Inconsistent(format!(
                            "node aggregate {node_aggregate_identifier} has no parent to attach a variant to"
                        ))
                    })?;
                    let parent_anchor = graph
                        .covering_anchor(parent_aggregate, point.hash())
                        .ok_or_else(|| not_covering(parent_aggregate, point))?;
                    placements.push(VariantPlacement::Connect {
                        parent: parent_anchor,
                        dimension_space_point: point.clone(),
                        name: name.clone(),
                    });
                }
            }
        }

        let anchor = self.allocate_anchor();
        self.insert_record(NodeRecord {
            anchor,
            origin_dimension_space_point: new_origin.clone(),
            ..source
        });
        let graph = self.graph_mut(content_stream_identifier)?;
        graph
            .node_index
            .entry(*node_aggregate_identifier)
            .or_default()
            .insert(new_origin.hash().to_string(), anchor);
        for placement in placements {
            match placement {
                VariantPlacement::Transfer { from, point_hash } => graph.transfer_point(from, anchor, &point_hash),
                VariantPlacement::Connect {
                    parent,
                    dimension_space_point,
                    name,
                } => graph.connect(parent, anchor, &dimension_space_point, name, None),
            }
        }
        Ok(())
    }

    /// The parent aggregate and node name of an aggregate, preferring the edges of `preferred`
    fn aggregate_parent(
        &self,
        graph: &ContentStreamGraph,
        node_aggregate_identifier: &NodeAggregateIdentifier,
        preferred: NodeRelationAnchorPoint,
    ) -> Option<(NodeAggregateIdentifier, Option<NodeName>)> {
        let others = graph
            .node_index
            .get(node_aggregate_identifier)
            .into_iter()
            .flat_map(|origins| origins.values().copied())
            .filter(move |anchor| *anchor != preferred);
        std::iter::once(preferred)
            .chain(others)
            .filter_map(|anchor| graph.parents.get(&anchor))
            .flat_map(|edges| edges.values())
            .find_map(|edge| {
                self.nodes
                    .get(&edge.parent)
                    .map(|parent| (parent.node_aggregate_identifier, edge.name.clone()))
            })
    }

    fn when_node_aggregate_was_moved(&mut self, event: &NodeAggregateWasMoved) -> ProjectionResult<()> {
        let graph = self.graph(&event.content_stream_identifier)?;
        let mut moves = Vec::with_capacity(event.node_move_mappings.len());
        for mapping in &event.node_move_mappings {
            let point = &mapping.dimension_space_point;
            let hash = point.hash();
            let child = graph
                .covering_anchor(&event.node_aggregate_identifier, hash)
                .ok_or_else(|| not_covering(&event.node_aggregate_identifier, point))?;
            let edge = graph
                .parent_edge(child, hash)
                .ok_or_else(|| not_covering(&event.node_aggregate_identifier, point))?;
            let parent = match &mapping.new_parent_node_aggregate_identifier {
                Some(new_parent) => graph
                    .covering_anchor(new_parent, hash)
                    .ok_or_else(|| not_covering(new_parent, point))?,
                None => edge.parent,
            };
            let succeeding = mapping
                .new_succeeding_sibling_node_aggregate_identifier
                .and_then(|sibling| graph.covering_anchor(&sibling, hash));
            moves.push((child, parent, point.clone(), edge.name.clone(), succeeding));
        }

        let graph = self.graph_mut(&event.content_stream_identifier)?;
        for (child, parent, point, name, succeeding) in moves {
            graph.disconnect(child, point.hash());
            graph.connect(parent, child, &point, name, succeeding);
        }
        Ok(())
    }

    fn when_node_aggregate_was_removed(&mut self, event: &NodeAggregateWasRemoved) -> ProjectionResult<()> {
        let graph = self.graph(&event.content_stream_identifier)?;
        let mut detached: Vec<(NodeRelationAnchorPoint, String)> = Vec::new();
        let mut visited = BTreeSet::new();
        for hash in event.affected_covered_dimension_space_points.hashes() {
            let Some(start) = graph.covering_anchor(&event.node_aggregate_identifier, hash) else {
                continue;
            };
            let mut stack = vec![start];
            while let Some(anchor) = stack.pop() {
                detached.push((anchor, hash.to_string()));
                visited.insert(anchor);
                stack.extend(graph.child_anchors(anchor, hash).iter().copied());
            }
        }

        let csi = event.content_stream_identifier;
        let graph = self
            .streams
            .get_mut(&csi)
            .ok_or_else(|| Self::missing_stream(&csi))?;
        for (anchor, hash) in &detached {
            graph.disconnect(*anchor, hash);
            if let Some(record) = self.nodes.get(anchor) {
                if let Some(disabled) = graph.disabled.get_mut(&record.node_aggregate_identifier) {
                    disabled.remove(hash);
                    if disabled.is_empty() {
                        graph.disabled.remove(&record.node_aggregate_identifier);
                    }
                }
            }
        }

        let mut orphans = Vec::new();
        for anchor in visited {
            if graph.parents.contains_key(&anchor) {
                continue;
            }
            if let Some(record) = self.nodes.get(&anchor) {
                let identifier = record.node_aggregate_identifier;
                if let Some(origins) = graph.node_index.get_mut(&identifier) {
                    origins.remove(record.origin_dimension_space_point.hash());
                    if origins.is_empty() {
                        graph.node_index.remove(&identifier);
                        graph.disabled.remove(&identifier);
                    }
                }
            }
            orphans.push(anchor);
        }
        for anchor in orphans {
            self.release(anchor);
        }
        Ok(())
    }

    fn when_node_properties_were_set(&mut self, event: &NodePropertiesWereSet) -> ProjectionResult<()> {
        let anchors = self.anchors_for_origins(
            &event.content_stream_identifier,
            &event.node_aggregate_identifier,
            &event.affected_origin_dimension_space_points,
        )?;
        for anchor in anchors {
            let anchor = self.copy_on_write(&event.content_stream_identifier, anchor)?;
            if let Some(record) = self.nodes.get_mut(&anchor) {
                record.properties = record.properties.merge(&event.property_values);
            }
        }
        Ok(())
    }

    fn when_node_references_were_set(&mut self, event: &NodeReferencesWereSet) -> ProjectionResult<()> {
        let anchors = self.anchors_for_origins(
            &event.content_stream_identifier,
            &event.source_node_aggregate_identifier,
            &event.affected_source_origin_dimension_space_points,
        )?;
        for anchor in anchors {
            let anchor = self.copy_on_write(&event.content_stream_identifier, anchor)?;
            if let Some(record) = self.nodes.get_mut(&anchor) {
                if event.destination_node_aggregate_identifiers.is_empty() {
                    record.references.remove(&event.reference_name);
                } else {
                    record.references.insert(
                        event.reference_name.clone(),
                        event.destination_node_aggregate_identifiers.clone(),
                    );
                }
            }
        }
        Ok(())
    }

    fn anchors_for_origins(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
        node_aggregate_identifier: &NodeAggregateIdentifier,
        origins: &DimensionSpacePointSet,
    ) -> ProjectionResult<Vec<NodeRelationAnchorPoint>> {
        let graph = self.graph(content_stream_identifier)?;
        let occupied = graph.node_index.get(node_aggregate_identifier);
        origins
            .iter()
            .map(|origin| {
                occupied
                    .and_then(|occupied| occupied.get(origin.hash()))
                    .copied()
                    .ok_or_else(|| {
                        ProjectionError::Inconsistent(format!(
                            "node aggregate {node_aggregate_identifier} does not occupy {origin}"
                        ))
                    })
            })
            .collect()
    }
}

fn missing_anchor(anchor: NodeRelationAnchorPoint) -> ProjectionError {
    ProjectionError::Inconsistent(format!("node record {anchor} does not exist"))
}

fn not_covering(node_aggregate_identifier: &NodeAggregateIdentifier, point: &DimensionSpacePoint) -> ProjectionError {
    ProjectionError::Inconsistent(format!(
        "node aggregate {node_aggregate_identifier} does not cover {point}"
    ))
}

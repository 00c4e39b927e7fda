//! Domain events enum for the content repository

use crate::events::*;
use crate::value_objects::{ContentStreamIdentifier, WorkspaceName};
use serde::{Deserialize, Serialize};

/// Enum wrapper for all content repository events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ContentRepositoryEvent {
    /// An empty content stream was created
    ContentStreamWasCreated(ContentStreamWasCreated),
    /// A content stream was forked
    ContentStreamWasForked(ContentStreamWasForked),
    /// A content stream was removed
    ContentStreamWasRemoved(ContentStreamWasRemoved),
    /// A root node aggregate was created
    RootNodeAggregateWithNodeWasCreated(RootNodeAggregateWithNodeWasCreated),
    /// A node aggregate was created
    NodeAggregateWithNodeWasCreated(NodeAggregateWithNodeWasCreated),
    /// A specialization variant was created
    NodeSpecializationVariantWasCreated(NodeSpecializationVariantWasCreated),
    /// A generalization variant was created
    NodeGeneralizationVariantWasCreated(NodeGeneralizationVariantWasCreated),
    /// A peer variant was created
    NodePeerVariantWasCreated(NodePeerVariantWasCreated),
    /// A node aggregate was moved
    NodeAggregateWasMoved(NodeAggregateWasMoved),
    /// A node aggregate was removed
    NodeAggregateWasRemoved(NodeAggregateWasRemoved),
    /// A node aggregate was disabled
    NodeAggregateWasDisabled(NodeAggregateWasDisabled),
    /// A node aggregate was enabled
    NodeAggregateWasEnabled(NodeAggregateWasEnabled),
    /// Node properties were set
    NodePropertiesWereSet(NodePropertiesWereSet),
    /// Node references were set
    NodeReferencesWereSet(NodeReferencesWereSet),
    /// A node aggregate was renamed
    NodeAggregateNameWasChanged(NodeAggregateNameWasChanged),
    /// The root workspace was created
    RootWorkspaceWasCreated(RootWorkspaceWasCreated),
    /// A workspace was created
    WorkspaceWasCreated(WorkspaceWasCreated),
    /// A workspace was rebased
    WorkspaceWasRebased(WorkspaceWasRebased),
    /// A workspace rebase failed
    WorkspaceRebaseFailed(WorkspaceRebaseFailed),
    /// A workspace was published
    WorkspaceWasPublished(WorkspaceWasPublished),
    /// A workspace was discarded
    WorkspaceWasDiscarded(WorkspaceWasDiscarded),
}

impl ContentRepositoryEvent {
    /// The event type as persisted in the event log
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ContentStreamWasCreated(_) => "ContentStreamWasCreated",
            Self::ContentStreamWasForked(_) => "ContentStreamWasForked",
            Self::ContentStreamWasRemoved(_) => "ContentStreamWasRemoved",
            Self::RootNodeAggregateWithNodeWasCreated(_) => "RootNodeAggregateWithNodeWasCreated",
            Self::NodeAggregateWithNodeWasCreated(_) => "NodeAggregateWithNodeWasCreated",
            Self::NodeSpecializationVariantWasCreated(_) => "NodeSpecializationVariantWasCreated",
            Self::NodeGeneralizationVariantWasCreated(_) => "NodeGeneralizationVariantWasCreated",
            Self::NodePeerVariantWasCreated(_) => "NodePeerVariantWasCreated",
            Self::NodeAggregateWasMoved(_) => "NodeAggregateWasMoved",
            Self::NodeAggregateWasRemoved(_) => "NodeAggregateWasRemoved",
            Self::NodeAggregateWasDisabled(_) => "NodeAggregateWasDisabled",
            Self::NodeAggregateWasEnabled(_) => "NodeAggregateWasEnabled",
            Self::NodePropertiesWereSet(_) => "NodePropertiesWereSet",
            Self::NodeReferencesWereSet(_) => "NodeReferencesWereSet",
            Self::NodeAggregateNameWasChanged(_) => "NodeAggregateNameWasChanged",
            Self::RootWorkspaceWasCreated(_) => "RootWorkspaceWasCreated",
            Self::WorkspaceWasCreated(_) => "WorkspaceWasCreated",
            Self::WorkspaceWasRebased(_) => "WorkspaceWasRebased",
            Self::WorkspaceRebaseFailed(_) => "WorkspaceRebaseFailed",
            Self::WorkspaceWasPublished(_) => "WorkspaceWasPublished",
            Self::WorkspaceWasDiscarded(_) => "WorkspaceWasDiscarded",
        }
    }

    /// Rebuild an event from its persisted type and payload
    pub fn from_parts(event_type: &str, payload: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(serde_json::json!({ "type": event_type, "payload": payload }))
    }

    /// Split into persisted type and payload
    pub fn to_parts(&self) -> serde_json::Result<(&'static str, serde_json::Value)> {
        let mut value = serde_json::to_value(self)?;
        let payload = value
            .get_mut("payload")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);
        Ok((self.event_type(), payload))
    }

    /// Whether the event can be re-targeted at another content stream
    pub fn is_publishable(&self) -> bool {
        self.node_content_stream_identifier().is_some()
    }

    /// The content stream a node event affects, `None` for all other events
    pub fn node_content_stream_identifier(&self) -> Option<ContentStreamIdentifier> {
        match self {
            Self::RootNodeAggregateWithNodeWasCreated(e) => Some(e.content_stream_identifier),
            Self::NodeAggregateWithNodeWasCreated(e) => Some(e.content_stream_identifier),
            Self::NodeSpecializationVariantWasCreated(e) => Some(e.content_stream_identifier),
            Self::NodeGeneralizationVariantWasCreated(e) => Some(e.content_stream_identifier),
            Self::NodePeerVariantWasCreated(e) => Some(e.content_stream_identifier),
            Self::NodeAggregateWasMoved(e) => Some(e.content_stream_identifier),
            Self::NodeAggregateWasRemoved(e) => Some(e.content_stream_identifier),
            Self::NodeAggregateWasDisabled(e) => Some(e.content_stream_identifier),
            Self::NodeAggregateWasEnabled(e) => Some(e.content_stream_identifier),
            Self::NodePropertiesWereSet(e) => Some(e.content_stream_identifier),
            Self::NodeReferencesWereSet(e) => Some(e.content_stream_identifier),
            Self::NodeAggregateNameWasChanged(e) => Some(e.content_stream_identifier),
            _ => None,
        }
    }

    /// The content stream whose event stream this event belongs to, if any
    pub fn content_stream_identifier(&self) -> Option<ContentStreamIdentifier> {
        match self {
            Self::ContentStreamWasCreated(e) => Some(e.content_stream_identifier),
            Self::ContentStreamWasForked(e) => Some(e.new_content_stream_identifier),
            Self::ContentStreamWasRemoved(e) => Some(e.content_stream_identifier),
            _ => self.node_content_stream_identifier(),
        }
    }

    /// The workspace a workspace event belongs to
    pub fn workspace_name(&self) -> Option<&WorkspaceName> {
        match self {
            Self::RootWorkspaceWasCreated(e) => Some(&e.workspace_name),
            Self::WorkspaceWasCreated(e) => Some(&e.workspace_name),
            Self::WorkspaceWasRebased(e) => Some(&e.workspace_name),
            Self::WorkspaceRebaseFailed(e) => Some(&e.workspace_name),
            Self::WorkspaceWasPublished(e) => Some(&e.source_workspace_name),
            Self::WorkspaceWasDiscarded(e) => Some(&e.workspace_name),
            _ => None,
        }
    }

    /// A copy of a node event addressing another content stream; `None` if not publishable
    pub fn create_copy_for_content_stream(
        &self,
        content_stream_identifier: ContentStreamIdentifier,
    ) -> Option<Self> {
        let csi = content_stream_identifier;
        Some(match self {
            Self::RootNodeAggregateWithNodeWasCreated(e) => {
                Self::RootNodeAggregateWithNodeWasCreated(e.create_copy_for_content_stream(csi))
            }
            Self::NodeAggregateWithNodeWasCreated(e) => {
                Self::NodeAggregateWithNodeWasCreated(e.create_copy_for_content_stream(csi))
            }
            Self::NodeSpecializationVariantWasCreated(e) => {
                Self::NodeSpecializationVariantWasCreated(e.create_copy_for_content_stream(csi))
            }
            Self::NodeGeneralizationVariantWasCreated(e) => {
                Self::NodeGeneralizationVariantWasCreated(e.create_copy_for_content_stream(csi))
            }
            Self::NodePeerVariantWasCreated(e) => {
                Self::NodePeerVariantWasCreated(e.create_copy_for_content_stream(csi))
            }
            Self::NodeAggregateWasMoved(e) => {
                Self::NodeAggregateWasMoved(e.create_copy_for_content_stream(csi))
            }
            Self::NodeAggregateWasRemoved(e) => {
                Self::NodeAggregateWasRemoved(e.create_copy_for_content_stream(csi))
            }
            Self::NodeAggregateWasDisabled(e) => {
                Self::NodeAggregateWasDisabled(e.create_copy_for_content_stream(csi))
            }
            Self::NodeAggregateWasEnabled(e) => {
                Self::NodeAggregateWasEnabled(e.create_copy_for_content_stream(csi))
            }
            Self::NodePropertiesWereSet(e) => {
                Self::NodePropertiesWereSet(e.create_copy_for_content_stream(csi))
            }
            Self::NodeReferencesWereSet(e) => {
                Self::NodeReferencesWereSet(e.create_copy_for_content_stream(csi))
            }
            Self::NodeAggregateNameWasChanged(e) => {
                Self::NodeAggregateNameWasChanged(e.create_copy_for_content_stream(csi))
            }
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{NodeAggregateIdentifier, NodeName, UserIdentifier};

    #[test]
    fn test_persisted_parts_roundtrip() {
        let event = ContentRepositoryEvent::NodeAggregateNameWasChanged(NodeAggregateNameWasChanged {
            content_stream_identifier: ContentStreamIdentifier::new(),
            node_aggregate_identifier: NodeAggregateIdentifier::new(),
            new_node_name: NodeName::new("main").unwrap(),
        });

        let (event_type, payload) = event.to_parts().unwrap();
        assert_eq!(event_type, "NodeAggregateNameWasChanged");
        assert_eq!(payload["new_node_name"], "main");
        assert_eq!(ContentRepositoryEvent::from_parts(event_type, payload).unwrap(), event);
    }

    #[test]
    fn test_only_node_events_are_publishable() {
        let stream = ContentStreamIdentifier::new();
        let created = ContentRepositoryEvent::ContentStreamWasCreated(ContentStreamWasCreated {
            content_stream_identifier: stream,
            initiating_user_identifier: UserIdentifier::system_user(),
        });
        assert!(!created.is_publishable());
        assert!(created.create_copy_for_content_stream(ContentStreamIdentifier::new()).is_none());

        let renamed = ContentRepositoryEvent::NodeAggregateNameWasChanged(NodeAggregateNameWasChanged {
            content_stream_identifier: stream,
            node_aggregate_identifier: NodeAggregateIdentifier::new(),
            new_node_name: NodeName::new("main").unwrap(),
        });
        let target = ContentStreamIdentifier::new();
        let copy = renamed.create_copy_for_content_stream(target).unwrap();
        assert!(renamed.is_publishable());
        assert_eq!(copy.content_stream_identifier(), Some(target));
    }
}

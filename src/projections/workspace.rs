//! Workspace projection
//!
//! The workspace table: name, base, current content stream, owner and whether the
//! workspace still builds on the current state of its base.

use super::{Projection, ProjectionResult};
use crate::aggregate::{Workspace, WorkspaceStatus};
use crate::domain_events::ContentRepositoryEvent;
use crate::infrastructure::RecordedEvent;
use crate::value_objects::{ContentStreamIdentifier, WorkspaceName};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Read model of all workspaces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceProjection {
    workspaces: BTreeMap<WorkspaceName, Workspace>,
    checkpoint: u64,
}

impl WorkspaceProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_by_name(&self, workspace_name: &WorkspaceName) -> Option<&Workspace> {
        self.workspaces.get(workspace_name)
    }

    pub fn find_by_current_content_stream(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
    ) -> Option<&Workspace> {
        self.workspaces
            .values()
            .find(|workspace| &workspace.current_content_stream_identifier == content_stream_identifier)
    }

    /// The single workspace without a base
    pub fn find_root_workspace(&self) -> Option<&Workspace> {
        self.workspaces.values().find(|workspace| workspace.is_root_workspace())
    }

    /// Workspaces whose base is `base_workspace_name`
    pub fn find_dependent_workspaces(&self, base_workspace_name: &WorkspaceName) -> Vec<&Workspace> {
        self.workspaces
            .values()
            .filter(|workspace| workspace.base_workspace_name.as_ref() == Some(base_workspace_name))
            .collect()
    }

    pub fn find_outdated(&self) -> Vec<&Workspace> {
        self.workspaces
            .values()
            .filter(|workspace| !workspace.is_up_to_date())
            .collect()
    }

    pub fn find_all(&self) -> impl Iterator<Item = &Workspace> {
        self.workspaces.values()
    }

    fn mark_dependents_outdated(&mut self, base_workspace_name: &WorkspaceName) {
        for workspace in self.workspaces.values_mut() {
            if workspace.base_workspace_name.as_ref() == Some(base_workspace_name)
                && workspace.status == WorkspaceStatus::UpToDate
            {
                debug!(workspace = %workspace.workspace_name, "Workspace is outdated");
                workspace.status = WorkspaceStatus::Outdated;
            }
        }
    }

    fn switch_content_stream(&mut self, workspace_name: &WorkspaceName, content_stream_identifier: ContentStreamIdentifier) {
        if let Some(workspace) = self.workspaces.get_mut(workspace_name) {
            workspace.current_content_stream_identifier = content_stream_identifier;
            workspace.status = WorkspaceStatus::UpToDate;
        }
        self.mark_dependents_outdated(workspace_name);
    }
}

#[async_trait]
impl Projection for WorkspaceProjection {
    fn name(&self) -> &'static str {
        "workspaces"
    }

    async fn apply(&mut self, event: &RecordedEvent) -> ProjectionResult<()> {
        match &event.event {
            ContentRepositoryEvent::RootWorkspaceWasCreated(e) => {
                self.workspaces.insert(
                    e.workspace_name.clone(),
                    Workspace {
                        workspace_name: e.workspace_name.clone(),
                        base_workspace_name: None,
                        workspace_title: e.workspace_title.clone(),
                        workspace_owner: None,
                        current_content_stream_identifier: e.new_content_stream_identifier,
                        status: WorkspaceStatus::UpToDate,
                    },
                );
            }
            ContentRepositoryEvent::WorkspaceWasCreated(e) => {
                self.workspaces.insert(
                    e.workspace_name.clone(),
                    Workspace {
                        workspace_name: e.workspace_name.clone(),
                        base_workspace_name: Some(e.base_workspace_name.clone()),
                        workspace_title: e.workspace_title.clone(),
                        workspace_owner: e.workspace_owner.clone(),
                        current_content_stream_identifier: e.new_content_stream_identifier,
                        status: WorkspaceStatus::UpToDate,
                    },
                );
            }
            ContentRepositoryEvent::WorkspaceWasRebased(e) => {
                self.switch_content_stream(&e.workspace_name, e.new_content_stream_identifier);
            }
            ContentRepositoryEvent::WorkspaceWasPublished(e) => {
                self.switch_content_stream(&e.source_workspace_name, e.new_source_content_stream_identifier);
            }
            ContentRepositoryEvent::WorkspaceWasDiscarded(e) => {
                self.switch_content_stream(&e.workspace_name, e.new_content_stream_identifier);
            }
            ContentRepositoryEvent::WorkspaceRebaseFailed(e) => {
                if let Some(workspace) = self.workspaces.get_mut(&e.workspace_name) {
                    workspace.status = WorkspaceStatus::OutdatedConflict;
                }
            }
            other => {
                let changed = other
                    .node_content_stream_identifier()
                    .and_then(|id| self.find_by_current_content_stream(&id))
                    .map(|workspace| workspace.workspace_name.clone());
                if let Some(workspace_name) = changed {
                    self.mark_dependents_outdated(&workspace_name);
                }
            }
        }
        Ok(())
    }

    async fn reset(&mut self) -> ProjectionResult<()> {
        *self = Self::default();
        info!("Workspace projection reset");
        Ok(())
    }

    async fn checkpoint(&self) -> u64 {
        self.checkpoint
    }

    async fn save_checkpoint(&mut self, sequence_number: u64) -> ProjectionResult<()> {
        self.checkpoint = sequence_number;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        NodeAggregateNameWasChanged, RebaseErrorRecord, RootWorkspaceWasCreated, WorkspaceRebaseFailed,
        WorkspaceWasCreated, WorkspaceWasRebased,
    };
    use crate::infrastructure::{EventMetadata, StreamName};
    use crate::value_objects::{EventId, NodeAggregateIdentifier, NodeName, UserIdentifier, WorkspaceTitle};
    use chrono::Utc;

    fn recorded(sequence_number: u64, event: ContentRepositoryEvent) -> RecordedEvent {
        RecordedEvent {
            sequence_number,
            stream: StreamName::for_workspace(&WorkspaceName::for_live()),
            version: sequence_number,
            event_id: EventId::new(),
            event,
            metadata: EventMetadata::default(),
            correlation_id: None,
            causation_id: None,
            recorded_at: Utc::now(),
        }
    }

    async fn live_and_user(projection: &mut WorkspaceProjection) -> (ContentStreamIdentifier, ContentStreamIdentifier) {
        let live = ContentStreamIdentifier::new();
        let user = ContentStreamIdentifier::new();
        projection
            .apply(&recorded(
                1,
                ContentRepositoryEvent::RootWorkspaceWasCreated(RootWorkspaceWasCreated {
                    workspace_name: WorkspaceName::for_live(),
                    workspace_title: WorkspaceTitle::new("Live"),
                    new_content_stream_identifier: live,
                    initiating_user_identifier: UserIdentifier::system_user(),
                }),
            ))
            .await
            .unwrap();
        projection
            .apply(&recorded(
                2,
                ContentRepositoryEvent::WorkspaceWasCreated(WorkspaceWasCreated {
                    workspace_name: WorkspaceName::new("user-alice"),
                    base_workspace_name: WorkspaceName::for_live(),
                    workspace_title: WorkspaceTitle::new("Alice"),
                    workspace_owner: Some(UserIdentifier::new("alice")),
                    new_content_stream_identifier: user,
                    initiating_user_identifier: UserIdentifier::new("alice"),
                }),
            ))
            .await
            .unwrap();
        (live, user)
    }

    #[tokio::test]
    async fn test_base_changes_outdate_dependents() {
        let mut projection = WorkspaceProjection::new();
        let (live, user) = live_and_user(&mut projection).await;
        let alice = WorkspaceName::new("user-alice");

        assert!(projection.find_root_workspace().unwrap().is_root_workspace());
        assert_eq!(projection.find_by_current_content_stream(&user).unwrap().workspace_name, alice);
        assert!(projection.find_outdated().is_empty());

        let rename = |content_stream_identifier: ContentStreamIdentifier| {
            ContentRepositoryEvent::NodeAggregateNameWasChanged(NodeAggregateNameWasChanged {
                content_stream_identifier,
                node_aggregate_identifier: NodeAggregateIdentifier::new(),
                new_node_name: NodeName::new("renamed").unwrap(),
            })
        };

        projection.apply(&recorded(3, rename(user))).await.unwrap();
        assert!(projection.find_outdated().is_empty());

        projection.apply(&recorded(4, rename(live))).await.unwrap();
        assert_eq!(projection.find_by_name(&alice).unwrap().status, WorkspaceStatus::Outdated);
    }

    #[tokio::test]
    async fn test_rebase_outcomes() {
        let mut projection = WorkspaceProjection::new();
        let (_, user) = live_and_user(&mut projection).await;
        let alice = WorkspaceName::new("user-alice");

        projection
            .apply(&recorded(
                3,
                ContentRepositoryEvent::WorkspaceRebaseFailed(WorkspaceRebaseFailed {
                    workspace_name: alice.clone(),
                    candidate_content_stream_identifier: ContentStreamIdentifier::new(),
                    source_content_stream_identifier: user,
                    errors: vec![RebaseErrorRecord {
                        sequence_number: 7,
                        command_type: "SetNodeProperties".to_string(),
                        message: "gone".to_string(),
                    }],
                    initiating_user_identifier: UserIdentifier::new("alice"),
                }),
            ))
            .await
            .unwrap();
        let workspace = projection.find_by_name(&alice).unwrap();
        assert_eq!(workspace.status, WorkspaceStatus::OutdatedConflict);
        assert_eq!(workspace.current_content_stream_identifier, user);

        let rebased = ContentStreamIdentifier::new();
        projection
            .apply(&recorded(
                4,
                ContentRepositoryEvent::WorkspaceWasRebased(WorkspaceWasRebased {
                    workspace_name: alice.clone(),
                    new_content_stream_identifier: rebased,
                    previous_content_stream_identifier: user,
                    initiating_user_identifier: UserIdentifier::new("alice"),
                }),
            ))
            .await
            .unwrap();
        let workspace = projection.find_by_name(&alice).unwrap();
        assert!(workspace.is_up_to_date());
        assert_eq!(workspace.current_content_stream_identifier, rebased);

        projection.reset().await.unwrap();
        assert_eq!(projection.find_all().count(), 0);
    }
}

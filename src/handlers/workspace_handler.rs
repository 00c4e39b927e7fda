//! Workspace command handler
//!
//! Workspaces point at a current content stream. Rebasing replays the commands recorded on
//! that stream onto a fresh fork of the base workspace; publishing copies the stream's node
//! events onto the base's stream; discarding simply forks the base again. In every case the
//! workspace is repointed only after the new content stream is complete.

use super::{
    CommandHandler, CommandHandlerContext, CommandResult, ContentStreamCommandHandler, NodeAggregateCommandHandler,
};
use crate::aggregate::Workspace;
use crate::commands::{
    CommandError, CommandHandlingResult, ContentRepositoryCommand, CreateRootWorkspace, CreateWorkspace,
    DiscardWorkspace, PublishWorkspace, RebaseWorkspace,
};
use crate::domain_events::ContentRepositoryEvent;
use crate::events::{
    RebaseErrorRecord, RootWorkspaceWasCreated, WorkspaceRebaseFailed, WorkspaceWasCreated, WorkspaceWasDiscarded,
    WorkspaceWasPublished, WorkspaceWasRebased,
};
use crate::infrastructure::{CommitResult, EventEnvelope, EventMetadata, ExpectedVersion, RecordedEvent, StreamName};
use crate::value_objects::{ContentStreamIdentifier, EventId, UserIdentifier, WorkspaceName};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Handles creation, rebasing, publishing and discarding of workspaces
pub struct WorkspaceCommandHandler {
    context: CommandHandlerContext,
    content_streams: Arc<ContentStreamCommandHandler>,
    node_aggregates: Arc<NodeAggregateCommandHandler>,
}

impl WorkspaceCommandHandler {
    pub fn new(
        context: CommandHandlerContext,
        content_streams: Arc<ContentStreamCommandHandler>,
        node_aggregates: Arc<NodeAggregateCommandHandler>,
    ) -> Self {
        Self {
            context,
            content_streams,
            node_aggregates,
        }
    }

    async fn create_root_workspace(&self, command: CreateRootWorkspace) -> CommandHandlingResult<CommitResult> {
        {
            let workspaces = self.context.catch_up.workspaces().await;
            if workspaces.find_by_name(&command.workspace_name).is_some() {
                return Err(CommandError::WorkspaceAlreadyExists(command.workspace_name));
            }
            if let Some(root) = workspaces.find_root_workspace() {
                return Err(CommandError::RootWorkspaceAlreadyExists(root.workspace_name.clone()));
            }
        }

        self.content_streams
            .create(command.new_content_stream_identifier, &command.initiating_user_identifier)
            .await?;
        let event = ContentRepositoryEvent::RootWorkspaceWasCreated(RootWorkspaceWasCreated {
            workspace_name: command.workspace_name.clone(),
            workspace_title: command.workspace_title,
            new_content_stream_identifier: command.new_content_stream_identifier,
            initiating_user_identifier: command.initiating_user_identifier.clone(),
        });
        let result = self
            .append(&command.workspace_name, event, &command.initiating_user_identifier, ExpectedVersion::NoStream)
            .await?;
        info!(workspace = %command.workspace_name, "Root workspace created");
        Ok(result)
    }

    async fn create_workspace(&self, command: CreateWorkspace) -> CommandHandlingResult<CommitResult> {
        let base = {
            let workspaces = self.context.catch_up.workspaces().await;
            if workspaces.find_by_name(&command.workspace_name).is_some() {
                return Err(CommandError::WorkspaceAlreadyExists(command.workspace_name));
            }
            workspaces
                .find_by_name(&command.base_workspace_name)
                .cloned()
                .ok_or_else(|| CommandError::BaseWorkspaceDoesNotExist(command.base_workspace_name.clone()))?
        };

        self.content_streams
            .fork(
                command.new_content_stream_identifier,
                base.current_content_stream_identifier,
                &command.initiating_user_identifier,
            )
            .await?;
        let event = ContentRepositoryEvent::WorkspaceWasCreated(WorkspaceWasCreated {
            workspace_name: command.workspace_name.clone(),
            base_workspace_name: command.base_workspace_name.clone(),
            workspace_title: command.workspace_title,
            workspace_owner: command.workspace_owner,
            new_content_stream_identifier: command.new_content_stream_identifier,
            initiating_user_identifier: command.initiating_user_identifier.clone(),
        });
        let result = self
            .append(&command.workspace_name, event, &command.initiating_user_identifier, ExpectedVersion::NoStream)
            .await?;
        info!(workspace = %command.workspace_name, base = %command.base_workspace_name, "Workspace created");
        Ok(result)
    }

    /// Replay the workspace's commands onto a fresh fork of its base.
    ///
    /// On failure the candidate stream is left behind unused and the workspace keeps its
    /// current content stream.
    #[instrument(skip(self, command), fields(workspace = %command.workspace_name))]
    async fn rebase_workspace(&self, command: RebaseWorkspace) -> CommandHandlingResult<Option<CommitResult>> {
        let (workspace, base) = self.workspace_with_base(&command.workspace_name).await?;
        if self.builds_on_current_base(&workspace, &base).await? {
            debug!("Workspace is up to date, nothing to rebase");
            return Ok(None);
        }

        let candidate = command.rebased_content_stream_identifier;
        let user = &command.initiating_user_identifier;
        self.content_streams
            .fork(candidate, base.current_content_stream_identifier, user)
            .await?;
        self.context.catch_up.catch_up().await?;

        let mut errors = Vec::new();
        for recorded in self.recorded_changes(&workspace.current_content_stream_identifier).await? {
            let Some(replayed) = replayable_command(&recorded, candidate)? else {
                continue;
            };
            let command_type = replayed.command_type();
            if let Err(error) = self.node_aggregates.handle(replayed).await {
                warn!(sequence_number = recorded.sequence_number, command_type, error = %error, "Command failed during rebase");
                errors.push(RebaseErrorRecord {
                    sequence_number: recorded.sequence_number,
                    command_type: command_type.to_string(),
                    message: error.to_string(),
                });
            }
            self.context.catch_up.catch_up().await?;
        }

        if !errors.is_empty() {
            let event = ContentRepositoryEvent::WorkspaceRebaseFailed(WorkspaceRebaseFailed {
                workspace_name: workspace.workspace_name.clone(),
                candidate_content_stream_identifier: candidate,
                source_content_stream_identifier: workspace.current_content_stream_identifier,
                errors: errors.clone(),
                initiating_user_identifier: user.clone(),
            });
            self.append(&workspace.workspace_name, event, user, ExpectedVersion::Any)
                .await?;
            return Err(CommandError::WorkspaceRebaseFailed {
                workspace_name: workspace.workspace_name,
                errors: errors.into_iter().map(|error| error.message).collect(),
            });
        }

        let event = ContentRepositoryEvent::WorkspaceWasRebased(WorkspaceWasRebased {
            workspace_name: workspace.workspace_name.clone(),
            new_content_stream_identifier: candidate,
            previous_content_stream_identifier: workspace.current_content_stream_identifier,
            initiating_user_identifier: user.clone(),
        });
        let result = self
            .append(&workspace.workspace_name, event, user, ExpectedVersion::Any)
            .await?;
        info!(content_stream = %candidate, "Workspace rebased");
        Ok(Some(result))
    }

    #[instrument(skip(self, command), fields(workspace = %command.workspace_name))]
    async fn publish_workspace(&self, command: PublishWorkspace) -> CommandHandlingResult<CommitResult> {
        let (workspace, base) = self.workspace_with_base(&command.workspace_name).await?;
        if !self.builds_on_current_base(&workspace, &base).await? {
            return Err(CommandError::BaseWorkspaceHasBeenModifiedInTheMeantime {
                workspace_name: workspace.workspace_name,
                base_workspace_name: base.workspace_name,
            });
        }

        let base_stream = StreamName::for_content_stream(&base.current_content_stream_identifier);
        let base_version = self.context.event_store.stream_version(&base_stream).await?;
        // causation is remapped onto the ids of the copies
        let mut copied_ids: HashMap<EventId, EventId> = HashMap::new();
        let envelopes: Vec<EventEnvelope> = self
            .recorded_changes(&workspace.current_content_stream_identifier)
            .await?
            .into_iter()
            .filter_map(|recorded| {
                let event = recorded
                    .event
                    .create_copy_for_content_stream(base.current_content_stream_identifier)?;
                let mut envelope = EventEnvelope::new(event, recorded.metadata);
                envelope.correlation_id = recorded.correlation_id;
                envelope.causation_id = recorded
                    .causation_id
                    .and_then(|cause| copied_ids.get(&cause).copied());
                copied_ids.insert(recorded.event_id, envelope.event_id);
                Some(envelope)
            })
            .collect();
        let published = envelopes.len();
        if !envelopes.is_empty() {
            self.context
                .event_store
                .append(&base_stream, envelopes, ExpectedVersion::Exact(base_version))
                .await?;
        }

        let user = &command.initiating_user_identifier;
        self.content_streams
            .fork(command.new_content_stream_identifier, base.current_content_stream_identifier, user)
            .await?;
        let event = ContentRepositoryEvent::WorkspaceWasPublished(WorkspaceWasPublished {
            source_workspace_name: workspace.workspace_name.clone(),
            target_workspace_name: base.workspace_name.clone(),
            new_source_content_stream_identifier: command.new_content_stream_identifier,
            previous_source_content_stream_identifier: workspace.current_content_stream_identifier,
            initiating_user_identifier: user.clone(),
        });
        self.append(&workspace.workspace_name, event, user, ExpectedVersion::Any)
            .await?;
        let result = self
            .content_streams
            .remove(workspace.current_content_stream_identifier, user)
            .await?;
        info!(target = %base.workspace_name, published, "Workspace published");
        Ok(result)
    }

    #[instrument(skip(self, command), fields(workspace = %command.workspace_name))]
    async fn discard_workspace(&self, command: DiscardWorkspace) -> CommandHandlingResult<CommitResult> {
        let (workspace, base) = self.workspace_with_base(&command.workspace_name).await?;
        let user = &command.initiating_user_identifier;
        self.content_streams
            .fork(command.new_content_stream_identifier, base.current_content_stream_identifier, user)
            .await?;
        let event = ContentRepositoryEvent::WorkspaceWasDiscarded(WorkspaceWasDiscarded {
            workspace_name: workspace.workspace_name.clone(),
            new_content_stream_identifier: command.new_content_stream_identifier,
            previous_content_stream_identifier: workspace.current_content_stream_identifier,
            initiating_user_identifier: user.clone(),
        });
        self.append(&workspace.workspace_name, event, user, ExpectedVersion::Any)
            .await?;
        let result = self
            .content_streams
            .remove(workspace.current_content_stream_identifier, user)
            .await?;
        info!("Workspace discarded");
        Ok(result)
    }

    async fn workspace_with_base(&self, workspace_name: &WorkspaceName) -> CommandHandlingResult<(Workspace, Workspace)> {
        let workspaces = self.context.catch_up.workspaces().await;
        let workspace = workspaces
            .find_by_name(workspace_name)
            .cloned()
            .ok_or_else(|| CommandError::WorkspaceDoesNotExist(workspace_name.clone()))?;
        let base_workspace_name = workspace
            .base_workspace_name
            .clone()
            .ok_or_else(|| CommandError::WorkspaceHasNoBaseWorkspace(workspace_name.clone()))?;
        let base = workspaces
            .find_by_name(&base_workspace_name)
            .cloned()
            .ok_or(CommandError::BaseWorkspaceDoesNotExist(base_workspace_name))?;
        Ok((workspace, base))
    }

    /// Whether the workspace's stream was forked from the base's current stream at its
    /// current version
    async fn builds_on_current_base(&self, workspace: &Workspace, base: &Workspace) -> CommandHandlingResult<bool> {
        let base_version = self
            .context
            .event_store
            .stream_version(&StreamName::for_content_stream(&base.current_content_stream_identifier))
            .await?;
        let content_streams = self.context.catch_up.content_streams().await;
        Ok(content_streams
            .find(&workspace.current_content_stream_identifier)
            .is_some_and(|record| {
                record.source_content_stream_identifier == Some(base.current_content_stream_identifier)
                    && record.source_content_stream_version == Some(base_version)
            }))
    }

    /// Node events recorded on a content stream since it was created or forked
    async fn recorded_changes(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
    ) -> CommandHandlingResult<Vec<RecordedEvent>> {
        Ok(self
            .context
            .event_store
            .load_stream(&StreamName::for_content_stream(content_stream_identifier))
            .await?
            .into_iter()
            .filter(|recorded| recorded.event.is_publishable())
            .collect())
    }

    async fn append(
        &self,
        workspace_name: &WorkspaceName,
        event: ContentRepositoryEvent,
        initiating_user_identifier: &UserIdentifier,
        expected_version: ExpectedVersion,
    ) -> CommandHandlingResult<CommitResult> {
        let envelope = EventEnvelope::new(event, EventMetadata::for_user(initiating_user_identifier));
        Ok(self
            .context
            .event_store
            .append(&StreamName::for_workspace(workspace_name), vec![envelope], expected_version)
            .await?)
    }
}

/// The command recorded with `recorded`, retargeted at `content_stream_identifier`.
///
/// Only the first event of each command batch carries the command.
fn replayable_command(
    recorded: &RecordedEvent,
    content_stream_identifier: ContentStreamIdentifier,
) -> CommandHandlingResult<Option<ContentRepositoryCommand>> {
    let (Some(command_type), Some(payload)) = (&recorded.metadata.command_type, &recorded.metadata.command_payload)
    else {
        return Ok(None);
    };
    let command = ContentRepositoryCommand::from_parts(command_type, payload.clone()).map_err(|error| {
        CommandError::InvalidCommand(format!(
            "recorded command {command_type} at sequence number {} cannot be decoded: {error}",
            recorded.sequence_number
        ))
    })?;
    Ok(command.create_copy_for_content_stream(content_stream_identifier))
}

#[async_trait]
impl CommandHandler for WorkspaceCommandHandler {
    fn can_handle(&self, command: &ContentRepositoryCommand) -> bool {
        matches!(
            command,
            ContentRepositoryCommand::CreateRootWorkspace(_)
                | ContentRepositoryCommand::CreateWorkspace(_)
                | ContentRepositoryCommand::RebaseWorkspace(_)
                | ContentRepositoryCommand::PublishWorkspace(_)
                | ContentRepositoryCommand::DiscardWorkspace(_)
        )
    }

    async fn handle(&self, command: ContentRepositoryCommand) -> CommandHandlingResult<CommandResult> {
        let result = match command {
            ContentRepositoryCommand::CreateRootWorkspace(c) => Some(self.create_root_workspace(c).await?),
            ContentRepositoryCommand::CreateWorkspace(c) => Some(self.create_workspace(c).await?),
            ContentRepositoryCommand::RebaseWorkspace(c) => self.rebase_workspace(c).await?,
            ContentRepositoryCommand::PublishWorkspace(c) => Some(self.publish_workspace(c).await?),
            ContentRepositoryCommand::DiscardWorkspace(c) => Some(self.discard_workspace(c).await?),
            other => {
                return Err(CommandError::InvalidCommand(format!(
                    "{} is not a workspace command",
                    other.command_type()
                )))
            }
        };
        self.context
            .result(result.map(|result| result.last_sequence_number))
            .await
    }
}

//! Content stream command handler
//!
//! Content stream events are not node events, so they bypass the node aggregate event
//! publisher and go straight to the stream of the content stream they describe.

use super::{CommandHandler, CommandHandlerContext, CommandResult};
use crate::commands::{CommandError, CommandHandlingResult, ContentRepositoryCommand};
use crate::domain_events::ContentRepositoryEvent;
use crate::events::{ContentStreamWasCreated, ContentStreamWasForked, ContentStreamWasRemoved};
use crate::infrastructure::{CommitResult, EventEnvelope, EventMetadata, ExpectedVersion, StreamName};
use crate::value_objects::{ContentStreamIdentifier, UserIdentifier};
use async_trait::async_trait;
use tracing::info;

/// Handles creation, forking and removal of content streams
pub struct ContentStreamCommandHandler {
    context: CommandHandlerContext,
}

impl ContentStreamCommandHandler {
    pub fn new(context: CommandHandlerContext) -> Self {
        Self { context }
    }

    pub(crate) async fn create(
        &self,
        content_stream_identifier: ContentStreamIdentifier,
        initiating_user_identifier: &UserIdentifier,
    ) -> CommandHandlingResult<CommitResult> {
        self.require_absent(&content_stream_identifier).await?;
        let event = ContentRepositoryEvent::ContentStreamWasCreated(ContentStreamWasCreated {
            content_stream_identifier,
            initiating_user_identifier: initiating_user_identifier.clone(),
        });
        let result = self
            .append(&content_stream_identifier, event, initiating_user_identifier, ExpectedVersion::NoStream)
            .await?;
        info!(content_stream = %content_stream_identifier, "Content stream created");
        Ok(result)
    }

    /// Fork `source` at its current version into `content_stream_identifier`
    pub(crate) async fn fork(
        &self,
        content_stream_identifier: ContentStreamIdentifier,
        source_content_stream_identifier: ContentStreamIdentifier,
        initiating_user_identifier: &UserIdentifier,
    ) -> CommandHandlingResult<CommitResult> {
        if !self
            .context
            .catch_up
            .content_streams()
            .await
            .exists(&source_content_stream_identifier)
        {
            return Err(CommandError::ContentStreamDoesNotExistYet(source_content_stream_identifier));
        }
        self.require_absent(&content_stream_identifier).await?;

        let version_of_source_content_stream = self
            .context
            .event_store
            .stream_version(&StreamName::for_content_stream(&source_content_stream_identifier))
            .await?;
        let event = ContentRepositoryEvent::ContentStreamWasForked(ContentStreamWasForked {
            new_content_stream_identifier: content_stream_identifier,
            source_content_stream_identifier,
            version_of_source_content_stream,
            initiating_user_identifier: initiating_user_identifier.clone(),
        });
        let result = self
            .append(&content_stream_identifier, event, initiating_user_identifier, ExpectedVersion::NoStream)
            .await?;
        info!(
            content_stream = %content_stream_identifier,
            source = %source_content_stream_identifier,
            source_version = version_of_source_content_stream,
            "Content stream forked"
        );
        Ok(result)
    }

    pub(crate) async fn remove(
        &self,
        content_stream_identifier: ContentStreamIdentifier,
        initiating_user_identifier: &UserIdentifier,
    ) -> CommandHandlingResult<CommitResult> {
        if !self.context.catch_up.content_streams().await.exists(&content_stream_identifier) {
            return Err(CommandError::ContentStreamDoesNotExistYet(content_stream_identifier));
        }
        let event = ContentRepositoryEvent::ContentStreamWasRemoved(ContentStreamWasRemoved {
            content_stream_identifier,
            initiating_user_identifier: initiating_user_identifier.clone(),
        });
        let result = self
            .append(&content_stream_identifier, event, initiating_user_identifier, ExpectedVersion::Any)
            .await?;
        info!(content_stream = %content_stream_identifier, "Content stream removed");
        Ok(result)
    }

    async fn require_absent(&self, content_stream_identifier: &ContentStreamIdentifier) -> CommandHandlingResult<()> {
        if self
            .context
            .catch_up
            .content_streams()
            .await
            .find(content_stream_identifier)
            .is_some()
        {
            return Err(CommandError::ContentStreamAlreadyExists(*content_stream_identifier));
        }
        Ok(())
    }

    async fn append(
        &self,
        content_stream_identifier: &ContentStreamIdentifier,
        event: ContentRepositoryEvent,
        initiating_user_identifier: &UserIdentifier,
        expected_version: ExpectedVersion,
    ) -> CommandHandlingResult<CommitResult> {
        let envelope = EventEnvelope::new(event, EventMetadata::for_user(initiating_user_identifier));
        Ok(self
            .context
            .event_store
            .append(
                &StreamName::for_content_stream(content_stream_identifier),
                vec![envelope],
                expected_version,
            )
            .await?)
    }
}

#[async_trait]
impl CommandHandler for ContentStreamCommandHandler {
    fn can_handle(&self, command: &ContentRepositoryCommand) -> bool {
        matches!(
            command,
            ContentRepositoryCommand::CreateContentStream(_)
                | ContentRepositoryCommand::ForkContentStream(_)
                | ContentRepositoryCommand::RemoveContentStream(_)
        )
    }

    async fn handle(&self, command: ContentRepositoryCommand) -> CommandHandlingResult<CommandResult> {
        let result = match command {
            ContentRepositoryCommand::CreateContentStream(c) => {
                self.create(c.content_stream_identifier, &c.initiating_user_identifier)
                    .await?
            }
            ContentRepositoryCommand::ForkContentStream(c) => {
                self.fork(
                    c.content_stream_identifier,
                    c.source_content_stream_identifier,
                    &c.initiating_user_identifier,
                )
                .await?
            }
            ContentRepositoryCommand::RemoveContentStream(c) => {
                self.remove(c.content_stream_identifier, &c.initiating_user_identifier)
                    .await?
            }
            other => {
                return Err(CommandError::InvalidCommand(format!(
                    "{} is not a content stream command",
                    other.command_type()
                )))
            }
        };
        self.context.result(Some(result.last_sequence_number)).await
    }
}

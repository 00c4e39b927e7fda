//! Event publishing with command metadata
//!
//! Node aggregate events must be published within the scope of the command that caused them.
//! The first event of a batch records the command type and payload so a workspace can later
//! be rebased by replaying its commands; the remaining events point back to that first event.

use super::event_store::{
    CommitResult, EventEnvelope, EventMetadata, EventStore, EventStoreError, ExpectedVersion, StreamName,
};
use crate::commands::ContentRepositoryCommand;
use crate::domain_events::ContentRepositoryEvent;
use crate::value_objects::{CorrelationId, EventId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised by the event publisher
#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("Event {0} cannot be published to content streams")]
    NotPublishable(String),

    #[error("A command is already being published; command handlers must not be nested")]
    NestedCommand,

    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Could not serialize command: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for publisher operations
pub type PublisherResult<T> = Result<T, PublisherError>;

/// Publishes node aggregate events with the metadata of the command that caused them
pub struct NodeAggregateEventPublisher {
    event_store: Arc<dyn EventStore>,
    command_in_progress: AtomicBool,
}

impl NodeAggregateEventPublisher {
    pub fn new(event_store: Arc<dyn EventStore>) -> Self {
        Self {
            event_store,
            command_in_progress: AtomicBool::new(false),
        }
    }

    /// Open a publishing scope for `command`.
    ///
    /// Only one scope may be open at a time; the scope closes when dropped.
    pub fn with_command(&self, command: &ContentRepositoryCommand) -> PublisherResult<CommandScope<'_>> {
        if self
            .command_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PublisherError::NestedCommand);
        }
        // Build the scope first so the flag is released even if serialization fails
        let mut scope = CommandScope {
            publisher: self,
            command_type: command.command_type(),
            command_payload: serde_json::Value::Null,
            metadata: EventMetadata::for_user(command.initiating_user_identifier()),
            correlation_id: CorrelationId::new(),
            first_event_id: None,
        };
        scope.command_payload = command.payload()?;
        Ok(scope)
    }

    pub fn event_store(&self) -> &Arc<dyn EventStore> {
        &self.event_store
    }
}

/// Publishing scope of one command
pub struct CommandScope<'a> {
    publisher: &'a NodeAggregateEventPublisher,
    command_type: &'static str,
    command_payload: serde_json::Value,
    metadata: EventMetadata,
    correlation_id: CorrelationId,
    first_event_id: Option<EventId>,
}

impl CommandScope<'_> {
    /// Append node aggregate events caused by the scoped command
    pub async fn publish(
        &mut self,
        stream: &StreamName,
        events: Vec<ContentRepositoryEvent>,
        expected_version: ExpectedVersion,
    ) -> PublisherResult<CommitResult> {
        if let Some(event) = events.iter().find(|event| !event.is_publishable()) {
            return Err(PublisherError::NotPublishable(event.event_type().to_string()));
        }

        let envelopes = events
            .into_iter()
            .map(|event| self.envelope(event))
            .collect::<Vec<_>>();
        let event_count = envelopes.len();

        let result = self
            .publisher
            .event_store
            .append(stream, envelopes, expected_version)
            .await?;

        info!(
            stream = %stream,
            command_type = self.command_type,
            correlation_id = %self.correlation_id,
            event_count,
            "Published node aggregate events"
        );
        Ok(result)
    }

    fn envelope(&mut self, event: ContentRepositoryEvent) -> EventEnvelope {
        let mut envelope = EventEnvelope::new(event, self.metadata.clone());
        envelope.correlation_id = Some(self.correlation_id);
        match self.first_event_id {
            None => {
                envelope.metadata.command_type = Some(self.command_type.to_string());
                envelope.metadata.command_payload = Some(self.command_payload.clone());
                self.first_event_id = Some(envelope.event_id);
            }
            Some(first) => envelope.causation_id = Some(first),
        }
        envelope
    }
}

impl Drop for CommandScope<'_> {
    fn drop(&mut self) {
        self.publisher.command_in_progress.store(false, Ordering::Release);
        debug!(command_type = self.command_type, "Closed publishing scope");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{ChangeNodeAggregateName, CreateContentStream};
    use crate::events::{ContentStreamWasCreated, NodeAggregateNameWasChanged};
    use crate::infrastructure::InMemoryEventStore;
    use crate::value_objects::{ContentStreamIdentifier, NodeAggregateIdentifier, NodeName, UserIdentifier};

    fn rename(csi: ContentStreamIdentifier, name: &str) -> (ContentRepositoryCommand, ContentRepositoryEvent) {
        let nai = NodeAggregateIdentifier::new();
        let new_node_name = NodeName::new(name).unwrap();
        (
            ChangeNodeAggregateName {
                content_stream_identifier: csi,
                node_aggregate_identifier: nai,
                new_node_name: new_node_name.clone(),
                initiating_user_identifier: UserIdentifier::new("alice"),
            }
            .into(),
            ContentRepositoryEvent::NodeAggregateNameWasChanged(NodeAggregateNameWasChanged {
                content_stream_identifier: csi,
                node_aggregate_identifier: nai,
                new_node_name,
            }),
        )
    }

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     P[Publisher] --> M[Command Metadata On First Event]
    ///     P --> C[Causation Chain]
    ///     P --> N[Nested Scope Rejected]
    ///     P --> NP[Non-publishable Events Rejected]
    /// ```

    #[tokio::test]
    async fn test_first_event_carries_command() {
        let store = Arc::new(InMemoryEventStore::new());
        let publisher = NodeAggregateEventPublisher::new(store.clone());
        let csi = ContentStreamIdentifier::new();
        let stream = StreamName::for_content_stream(&csi);
        let (command, first) = rename(csi, "a");
        let (_, second) = rename(csi, "b");

        let mut scope = publisher.with_command(&command).unwrap();
        scope
            .publish(&stream, vec![first, second], ExpectedVersion::Any)
            .await
            .unwrap();
        drop(scope);

        let events = store.load_stream(&stream).await.unwrap();
        assert_eq!(events[0].metadata.command_type.as_deref(), Some("ChangeNodeAggregateName"));
        assert!(events[0].metadata.command_payload.is_some());
        assert!(events[1].metadata.command_type.is_none());
        assert_eq!(events[1].causation_id, Some(events[0].event_id));
        assert_eq!(events[0].correlation_id, events[1].correlation_id);

        let restored = ContentRepositoryCommand::from_parts(
            "ChangeNodeAggregateName",
            events[0].metadata.command_payload.clone().unwrap(),
        )
        .unwrap();
        assert_eq!(restored, command);
    }

    #[tokio::test]
    async fn test_nested_scopes_are_rejected() {
        let publisher = NodeAggregateEventPublisher::new(Arc::new(InMemoryEventStore::new()));
        let (command, _) = rename(ContentStreamIdentifier::new(), "a");

        let scope = publisher.with_command(&command).unwrap();
        assert!(matches!(
            publisher.with_command(&command),
            Err(PublisherError::NestedCommand)
        ));
        drop(scope);
        assert!(publisher.with_command(&command).is_ok());
    }

    #[tokio::test]
    async fn test_content_stream_events_are_not_publishable() {
        let publisher = NodeAggregateEventPublisher::new(Arc::new(InMemoryEventStore::new()));
        let csi = ContentStreamIdentifier::new();
        let command = ContentRepositoryCommand::from(CreateContentStream {
            content_stream_identifier: csi,
            initiating_user_identifier: UserIdentifier::system_user(),
        });

        let mut scope = publisher.with_command(&command).unwrap();
        let result = scope
            .publish(
                &StreamName::for_content_stream(&csi),
                vec![ContentRepositoryEvent::ContentStreamWasCreated(ContentStreamWasCreated {
                    content_stream_identifier: csi,
                    initiating_user_identifier: UserIdentifier::system_user(),
                })],
                ExpectedVersion::Any,
            )
            .await;
        assert!(matches!(result, Err(PublisherError::NotPublishable(_))));
    }
}

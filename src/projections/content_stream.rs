//! Content stream projection
//!
//! Tracks which content streams exist, where they were forked from and how many events
//! they hold.

use super::workspace::WorkspaceProjection;
use super::{Projection, ProjectionResult};
use crate::domain_events::ContentRepositoryEvent;
use crate::infrastructure::RecordedEvent;
use crate::value_objects::ContentStreamIdentifier;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Lifecycle state of a content stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentStreamState {
    Created,
    Forked,
    Removed,
}

/// One projected content stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStreamRecord {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub source_content_stream_identifier: Option<ContentStreamIdentifier>,
    /// Version of the source stream at the time of forking
    pub source_content_stream_version: Option<u64>,
    /// Number of events in the stream
    pub version: u64,
    pub state: ContentStreamState,
}

impl ContentStreamRecord {
    pub fn is_removed(&self) -> bool {
        self.state == ContentStreamState::Removed
    }
}

/// Read model of all content streams
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentStreamProjection {
    content_streams: BTreeMap<ContentStreamIdentifier, ContentStreamRecord>,
    checkpoint: u64,
}

impl ContentStreamProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the stream exists and has not been removed
    pub fn exists(&self, content_stream_identifier: &ContentStreamIdentifier) -> bool {
        self.find(content_stream_identifier).is_some_and(|record| !record.is_removed())
    }

    pub fn find(&self, content_stream_identifier: &ContentStreamIdentifier) -> Option<&ContentStreamRecord> {
        self.content_streams.get(content_stream_identifier)
    }

    /// Projected version of a live stream
    pub fn find_version(&self, content_stream_identifier: &ContentStreamIdentifier) -> Option<u64> {
        self.find(content_stream_identifier)
            .filter(|record| !record.is_removed())
            .map(|record| record.version)
    }

    /// Live streams no workspace currently points to
    pub fn find_unused_content_streams(&self, workspaces: &WorkspaceProjection) -> Vec<ContentStreamIdentifier> {
        let in_use: BTreeSet<ContentStreamIdentifier> = workspaces
            .find_all()
            .map(|workspace| workspace.current_content_stream_identifier)
            .collect();
        self.content_streams
            .values()
            .filter(|record| !record.is_removed() && !in_use.contains(&record.content_stream_identifier))
            .map(|record| record.content_stream_identifier)
            .collect()
    }
}

#[async_trait]
impl Projection for ContentStreamProjection {
    fn name(&self) -> &'static str {
        "content_streams"
    }

    async fn apply(&mut self, event: &RecordedEvent) -> ProjectionResult<()> {
        match &event.event {
            ContentRepositoryEvent::ContentStreamWasCreated(e) => {
                self.content_streams.insert(
                    e.content_stream_identifier,
                    ContentStreamRecord {
                        content_stream_identifier: e.content_stream_identifier,
                        source_content_stream_identifier: None,
                        source_content_stream_version: None,
                        version: event.version,
                        state: ContentStreamState::Created,
                    },
                );
            }
            ContentRepositoryEvent::ContentStreamWasForked(e) => {
                self.content_streams.insert(
                    e.new_content_stream_identifier,
                    ContentStreamRecord {
                        content_stream_identifier: e.new_content_stream_identifier,
                        source_content_stream_identifier: Some(e.source_content_stream_identifier),
                        source_content_stream_version: Some(e.version_of_source_content_stream),
                        version: event.version,
                        state: ContentStreamState::Forked,
                    },
                );
            }
            ContentRepositoryEvent::ContentStreamWasRemoved(e) => {
                if let Some(record) = self.content_streams.get_mut(&e.content_stream_identifier) {
                    record.state = ContentStreamState::Removed;
                    record.version = event.version;
                }
            }
            other => {
                if let Some(record) = other
                    .node_content_stream_identifier()
                    .and_then(|id| self.content_streams.get_mut(&id))
                {
                    record.version = event.version;
                }
            }
        }
        Ok(())
    }

    async fn reset(&mut self) -> ProjectionResult<()> {
        *self = Self::default();
        info!("Content stream projection reset");
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
    use crate::events::{ContentStreamWasCreated, ContentStreamWasForked, ContentStreamWasRemoved};
    use crate::infrastructure::{EventMetadata, StreamName};
    use crate::value_objects::{EventId, UserIdentifier};
    use chrono::Utc;

    fn recorded(version: u64, csi: &ContentStreamIdentifier, event: ContentRepositoryEvent) -> RecordedEvent {
        RecordedEvent {
            sequence_number: version,
            stream: StreamName::for_content_stream(csi),
            version,
            event_id: EventId::new(),
            event,
            metadata: EventMetadata::default(),
            correlation_id: None,
            causation_id: None,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fork_and_remove() {
        let mut projection = ContentStreamProjection::new();
        let source = ContentStreamIdentifier::new();
        let fork = ContentStreamIdentifier::new();
        let user = UserIdentifier::system_user();

        projection
            .apply(&recorded(
                1,
                &source,
                ContentRepositoryEvent::ContentStreamWasCreated(ContentStreamWasCreated {
                    content_stream_identifier: source,
                    initiating_user_identifier: user.clone(),
                }),
            ))
            .await
            .unwrap();
        projection
            .apply(&recorded(
                1,
                &fork,
                ContentRepositoryEvent::ContentStreamWasForked(ContentStreamWasForked {
                    new_content_stream_identifier: fork,
                    source_content_stream_identifier: source,
                    version_of_source_content_stream: 1,
                    initiating_user_identifier: user.clone(),
                }),
            ))
            .await
            .unwrap();

        let record = projection.find(&fork).unwrap();
        assert_eq!(record.state, ContentStreamState::Forked);
        assert_eq!(record.source_content_stream_identifier, Some(source));
        assert_eq!(record.source_content_stream_version, Some(1));
        assert_eq!(projection.find_version(&source), Some(1));

        let workspaces = WorkspaceProjection::new();
        let mut unused = projection.find_unused_content_streams(&workspaces);
        unused.sort();
        let mut expected = vec![source, fork];
        expected.sort();
        assert_eq!(unused, expected);

        projection
            .apply(&recorded(
                2,
                &fork,
                ContentRepositoryEvent::ContentStreamWasRemoved(ContentStreamWasRemoved {
                    content_stream_identifier: fork,
                    initiating_user_identifier: user,
                }),
            ))
            .await
            .unwrap();
        assert!(!projection.exists(&fork));
        assert_eq!(projection.find_version(&fork), None);
        assert_eq!(projection.find_unused_content_streams(&workspaces), vec![source]);
    }
}

//! Projection catch-up
//!
//! Applies committed events to the projections in sequence-number order. Each projection
//! keeps its own checkpoint, so a projection that is ahead of the others simply skips what it
//! has already seen.

use super::{
    ContentGraphProjection, ContentStreamProjection, Projection, ProjectionError, ProjectionResult,
    WorkspaceProjection,
};
use crate::infrastructure::{EventStore, RecordedEvent};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tracing::{debug, error, info, instrument};

/// Drives the three projections of a content repository from the event store
pub struct ProjectionCatchUp {
    event_store: Arc<dyn EventStore>,
    content_graph: RwLock<ContentGraphProjection>,
    content_streams: RwLock<ContentStreamProjection>,
    workspaces: RwLock<WorkspaceProjection>,
    running: Mutex<()>,
}

impl ProjectionCatchUp {
    pub fn new(event_store: Arc<dyn EventStore>) -> Self {
        Self {
            event_store,
            content_graph: RwLock::new(ContentGraphProjection::new()),
            content_streams: RwLock::new(ContentStreamProjection::new()),
            workspaces: RwLock::new(WorkspaceProjection::new()),
            running: Mutex::new(()),
        }
    }

    pub fn event_store(&self) -> &Arc<dyn EventStore> {
        &self.event_store
    }

    pub async fn content_graph(&self) -> RwLockReadGuard<'_, ContentGraphProjection> {
        self.content_graph.read().await
    }

    pub async fn content_streams(&self) -> RwLockReadGuard<'_, ContentStreamProjection> {
        self.content_streams.read().await
    }

    pub async fn workspaces(&self) -> RwLockReadGuard<'_, WorkspaceProjection> {
        self.workspaces.read().await
    }

    /// Lowest checkpoint over all projections
    pub async fn checkpoint(&self) -> u64 {
        let graph = self.content_graph.read().await.checkpoint().await;
        let streams = self.content_streams.read().await.checkpoint().await;
        let workspaces = self.workspaces.read().await.checkpoint().await;
        graph.min(streams).min(workspaces)
    }

    /// Apply every committed event not yet projected. Returns the new checkpoint.
    #[instrument(skip(self))]
    pub async fn catch_up(&self) -> ProjectionResult<u64> {
        let _running = self.running.lock().await;
        let from = self.checkpoint().await + 1;
        let events = self.event_store.load_all_from(from).await?;
        if events.is_empty() {
            return Ok(from - 1);
        }
        debug!(from, count = events.len(), "Catching up projections");

        for event in &events {
            apply_one(&self.content_graph, event).await?;
            apply_one(&self.content_streams, event).await?;
            apply_one(&self.workspaces, event).await?;
        }

        let checkpoint = self.checkpoint().await;
        debug!(checkpoint, "Projections caught up");
        Ok(checkpoint)
    }

    /// Catch up unless the projections already reached `sequence_number`
    pub async fn catch_up_to(&self, sequence_number: u64) -> ProjectionResult<u64> {
        let checkpoint = self.checkpoint().await;
        if checkpoint >= sequence_number {
            return Ok(checkpoint);
        }
        self.catch_up().await
    }

    /// Drop all projected state and rebuild it from the first event
    pub async fn replay(&self) -> ProjectionResult<u64> {
        {
            let _running = self.running.lock().await;
            self.content_graph.write().await.reset().await?;
            self.content_streams.write().await.reset().await?;
            self.workspaces.write().await.reset().await?;
        }
        info!("Replaying projections from the beginning");
        self.catch_up().await
    }
}

async fn apply_one<P: Projection>(projection: &RwLock<P>, event: &RecordedEvent) -> ProjectionResult<()> {
    let mut projection = projection.write().await;
    let checkpoint = projection.checkpoint().await;
    if event.sequence_number <= checkpoint {
        return Ok(());
    }
    if let Err(err) = projection.apply(event).await {
        error!(
            projection = projection.name(),
            sequence_number = event.sequence_number,
            checkpoint,
            event_type = event.event.event_type(),
            error = %err,
            "Projection failed to apply event"
        );
        return Err(ProjectionError::ReplayFailed {
            projection: projection.name(),
            sequence_number: event.sequence_number,
            checkpoint,
            reason: err.to_string(),
        });
    }
    projection.save_checkpoint(event.sequence_number).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_events::ContentRepositoryEvent;
    use crate::events::ContentStreamWasCreated;
    use crate::infrastructure::{EventEnvelope, EventMetadata, ExpectedVersion, InMemoryEventStore, StreamName};
    use crate::value_objects::{ContentStreamIdentifier, UserIdentifier};

    async fn append_stream_creation(store: &InMemoryEventStore) -> ContentStreamIdentifier {
        let csi = ContentStreamIdentifier::new();
        let event = ContentStreamWasCreated {
            content_stream_identifier: csi,
            initiating_user_identifier: UserIdentifier::system_user(),
        };
        store
            .append(
                &StreamName::for_content_stream(&csi),
                vec![EventEnvelope::new(
                    ContentRepositoryEvent::ContentStreamWasCreated(event),
                    EventMetadata::default(),
                )],
                ExpectedVersion::NoStream,
            )
            .await
            .unwrap();
        csi
    }

    #[tokio::test]
    async fn test_catch_up_applies_new_events_once() {
        let store = Arc::new(InMemoryEventStore::new());
        let catch_up = ProjectionCatchUp::new(store.clone());

        let first = append_stream_creation(&store).await;
        assert_eq!(catch_up.catch_up().await.unwrap(), 1);
        assert!(catch_up.content_streams().await.exists(&first));

        let second = append_stream_creation(&store).await;
        assert_eq!(catch_up.catch_up_to(2).await.unwrap(), 2);
        assert!(catch_up.content_streams().await.exists(&second));
        assert_eq!(catch_up.content_streams().await.find_version(&first), Some(1));

        // nothing new
        assert_eq!(catch_up.catch_up().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_replay_rebuilds_identical_state() {
        let store = Arc::new(InMemoryEventStore::new());
        let catch_up = ProjectionCatchUp::new(store.clone());
        append_stream_creation(&store).await;
        append_stream_creation(&store).await;
        catch_up.catch_up().await.unwrap();
        let before = catch_up.content_streams().await.clone();

        assert_eq!(catch_up.replay().await.unwrap(), 2);
        assert_eq!(*catch_up.content_streams().await, before);
    }
}

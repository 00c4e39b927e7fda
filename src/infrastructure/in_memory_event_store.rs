//! In-memory event store
//!
//! Keeps the persisted event log layout in memory. Used by tests and embedded setups.

use super::event_store::{
    CommitResult, EventEnvelope, EventRecord, EventStore, EventStoreError, EventStoreResult, ExpectedVersion,
    RecordedEvent, StreamName,
};
use crate::value_objects::EventId;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct EventLog {
    records: Vec<EventRecord>,
    stream_versions: HashMap<StreamName, u64>,
    stream_positions: HashMap<StreamName, Vec<usize>>,
    event_ids: HashSet<EventId>,
}

/// Event store keeping all records in memory
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    log: RwLock<EventLog>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw records in sequence order
    pub async fn records(&self) -> Vec<EventRecord> {
        self.log.read().await.records.clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        stream: &StreamName,
        events: Vec<EventEnvelope>,
        expected_version: ExpectedVersion,
    ) -> EventStoreResult<CommitResult> {
        let mut log = self.log.write().await;

        let actual = log.stream_versions.get(stream).copied().unwrap_or(0);
        if !expected_version.is_satisfied_by(actual) {
            warn!(stream = %stream, expected = %expected_version, actual, "Rejected append");
            return Err(EventStoreError::ConcurrencyConflict {
                stream: stream.clone(),
                expected: expected_version,
                actual,
            });
        }

        // Encode the whole batch before touching the log so a failure leaves it unchanged
        let mut batch_ids = HashSet::new();
        let mut records = Vec::with_capacity(events.len());
        let recorded_at = Utc::now();
        let first_sequence_number = log.records.len() as u64 + 1;
        for (offset, envelope) in events.into_iter().enumerate() {
            if log.event_ids.contains(&envelope.event_id) || !batch_ids.insert(envelope.event_id) {
                return Err(EventStoreError::DuplicateEventId(envelope.event_id));
            }
            let (event_type, payload) = envelope.event.to_parts()?;
            records.push(EventRecord {
                sequence_number: first_sequence_number + offset as u64,
                stream: stream.clone(),
                version: actual + offset as u64 + 1,
                event_type: event_type.to_string(),
                payload,
                metadata: serde_json::to_value(&envelope.metadata)?,
                event_id: envelope.event_id,
                correlation_id: envelope.correlation_id,
                causation_id: envelope.causation_id,
                recorded_at,
            });
        }

        let stream_version = actual + records.len() as u64;
        let last_sequence_number = first_sequence_number + records.len() as u64 - 1;
        for record in records {
            let position = log.records.len();
            log.event_ids.insert(record.event_id);
            log.stream_positions.entry(stream.clone()).or_default().push(position);
            log.records.push(record);
        }
        log.stream_versions.insert(stream.clone(), stream_version);

        debug!(stream = %stream, stream_version, last_sequence_number, "Appended events");
        Ok(CommitResult {
            stream_version,
            last_sequence_number,
        })
    }

    async fn load_stream(&self, stream: &StreamName) -> EventStoreResult<Vec<RecordedEvent>> {
        let log = self.log.read().await;
        log.stream_positions
            .get(stream)
            .map(|positions| positions.iter().map(|position| log.records[*position].decode()).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn load_all_from(&self, sequence_number: u64) -> EventStoreResult<Vec<RecordedEvent>> {
        let log = self.log.read().await;
        let start = sequence_number.saturating_sub(1) as usize;
        log.records
            .iter()
            .skip(start)
            .map(EventRecord::decode)
            .collect()
    }

    async fn stream_version(&self, stream: &StreamName) -> EventStoreResult<u64> {
        Ok(self.log.read().await.stream_versions.get(stream).copied().unwrap_or(0))
    }

    async fn head_sequence_number(&self) -> EventStoreResult<u64> {
        Ok(self.log.read().await.records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_events::ContentRepositoryEvent;
    use crate::events::ContentStreamWasCreated;
    use crate::infrastructure::event_store::EventMetadata;
    use crate::value_objects::{ContentStreamIdentifier, UserIdentifier};

    fn created(content_stream_identifier: ContentStreamIdentifier) -> EventEnvelope {
        EventEnvelope::new(
            ContentRepositoryEvent::ContentStreamWasCreated(ContentStreamWasCreated {
                content_stream_identifier,
                initiating_user_identifier: UserIdentifier::system_user(),
            }),
            EventMetadata::for_user(&UserIdentifier::system_user()),
        )
    }

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     ES[InMemoryEventStore] --> AP[Append]
    ///     ES --> OC[Optimistic Concurrency]
    ///     ES --> UQ[Unique Event Ids]
    ///     ES --> LD[Load Stream / Load All]
    /// ```

    #[tokio::test]
    async fn test_append_and_load() {
        let store = InMemoryEventStore::new();
        let id = ContentStreamIdentifier::new();
        let stream = StreamName::for_content_stream(&id);

        let result = store
            .append(&stream, vec![created(id)], ExpectedVersion::NoStream)
            .await
            .unwrap();
        assert_eq!(result.stream_version, 1);
        assert_eq!(result.last_sequence_number, 1);

        let events = store.load_stream(&stream).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].version, 1);
        assert_eq!(events[0].event.content_stream_identifier(), Some(id));

        let records = store.records().await;
        assert_eq!(records[0].event_type, "ContentStreamWasCreated");
        assert_eq!(records[0].stream, stream);
    }

    #[tokio::test]
    async fn test_expected_version_mismatch_is_a_conflict() {
        let store = InMemoryEventStore::new();
        let id = ContentStreamIdentifier::new();
        let stream = StreamName::for_content_stream(&id);
        store
            .append(&stream, vec![created(id)], ExpectedVersion::NoStream)
            .await
            .unwrap();

        let error = store
            .append(&stream, vec![created(id)], ExpectedVersion::Exact(0))
            .await
            .unwrap_err();
        assert!(error.is_concurrency_conflict());
        assert_eq!(store.stream_version(&stream).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_event_ids_are_rejected_atomically() {
        let store = InMemoryEventStore::new();
        let id = ContentStreamIdentifier::new();
        let stream = StreamName::for_content_stream(&id);
        let envelope = created(id);

        let error = store
            .append(&stream, vec![envelope.clone(), envelope], ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(error, EventStoreError::DuplicateEventId(_)));
        assert_eq!(store.head_sequence_number().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_all_from_sequence_number() {
        let store = InMemoryEventStore::new();
        for _ in 0..3 {
            let id = ContentStreamIdentifier::new();
            store
                .append(&StreamName::for_content_stream(&id), vec![created(id)], ExpectedVersion::NoStream)
                .await
                .unwrap();
        }

        let tail = store.load_all_from(2).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].sequence_number, 2);
        assert_eq!(store.load_all_from(0).await.unwrap().len(), 3);
    }
}

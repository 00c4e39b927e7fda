//! Event store abstraction
//!
//! The event log is append-only and partitioned into named streams. Every stream has a
//! monotonically increasing version; appends are conditioned on an expected version so that
//! concurrent writers to the same stream fail instead of overwriting each other.

use crate::domain_events::ContentRepositoryEvent;
use crate::value_objects::{ContentStreamIdentifier, CorrelationId, EventId, UserIdentifier, WorkspaceName};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Name of an event stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamName(String);

impl StreamName {
    /// The stream holding a content stream's events
    pub fn for_content_stream(content_stream_identifier: &ContentStreamIdentifier) -> Self {
        Self(format!("ContentStream:{content_stream_identifier}"))
    }

    /// The stream holding a workspace's events
    pub fn for_workspace(workspace_name: &WorkspaceName) -> Self {
        Self(format!("Workspace:{workspace_name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Condition an append is subject to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedVersion {
    /// Append unconditionally
    Any,
    /// The stream must not contain any event yet
    NoStream,
    /// The stream's version must equal the given one
    Exact(u64),
}

impl ExpectedVersion {
    /// Whether a stream currently at `actual` satisfies the condition
    pub fn is_satisfied_by(&self, actual: u64) -> bool {
        match self {
            Self::Any => true,
            Self::NoStream => actual == 0,
            Self::Exact(expected) => *expected == actual,
        }
    }
}

impl fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::NoStream => f.write_str("no stream"),
            Self::Exact(version) => write!(f, "{version}"),
        }
    }
}

/// Metadata attached to an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Type of the command that caused the event batch (first event of a batch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_type: Option<String>,
    /// Payload of that command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiating_user_identifier: Option<UserIdentifier>,
}

impl EventMetadata {
    /// Metadata naming only the initiating user
    pub fn for_user(initiating_user_identifier: &UserIdentifier) -> Self {
        Self {
            initiating_user_identifier: Some(initiating_user_identifier.clone()),
            ..Default::default()
        }
    }
}

/// An event about to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub event: ContentRepositoryEvent,
    pub metadata: EventMetadata,
    pub correlation_id: Option<CorrelationId>,
    pub causation_id: Option<EventId>,
}

impl EventEnvelope {
    /// Wrap an event with a fresh id
    pub fn new(event: ContentRepositoryEvent, metadata: EventMetadata) -> Self {
        Self {
            event_id: EventId::new(),
            event,
            metadata,
            correlation_id: None,
            causation_id: None,
        }
    }
}

/// One row of the persisted event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Global position, starting at 1
    pub sequence_number: u64,
    pub stream: StreamName,
    /// Position within the stream, starting at 1
    pub version: u64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub metadata: serde_json::Value,
    pub event_id: EventId,
    pub correlation_id: Option<CorrelationId>,
    pub causation_id: Option<EventId>,
    pub recorded_at: DateTime<Utc>,
}

impl EventRecord {
    /// Decode payload and metadata
    pub fn decode(&self) -> EventStoreResult<RecordedEvent> {
        Ok(RecordedEvent {
            sequence_number: self.sequence_number,
            stream: self.stream.clone(),
            version: self.version,
            event_id: self.event_id,
            event: ContentRepositoryEvent::from_parts(&self.event_type, self.payload.clone())?,
            metadata: serde_json::from_value(self.metadata.clone())?,
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            recorded_at: self.recorded_at,
        })
    }
}

/// A committed, decoded event
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub sequence_number: u64,
    pub stream: StreamName,
    pub version: u64,
    pub event_id: EventId,
    pub event: ContentRepositoryEvent,
    pub metadata: EventMetadata,
    pub correlation_id: Option<CorrelationId>,
    pub causation_id: Option<EventId>,
    pub recorded_at: DateTime<Utc>,
}

/// Outcome of a successful append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitResult {
    /// Stream version after the append
    pub stream_version: u64,
    /// Sequence number of the last appended event
    pub last_sequence_number: u64,
}

/// Errors raised by event stores
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("Concurrency conflict on stream {stream}: expected version {expected}, actual version {actual}")]
    ConcurrencyConflict {
        stream: StreamName,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("Event {0} has already been stored")]
    DuplicateEventId(EventId),

    #[error("Could not (de)serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

/// Result type for event store operations
pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Append-only, stream-partitioned event log
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Atomically append a batch of events to one stream
    async fn append(
        &self,
        stream: &StreamName,
        events: Vec<EventEnvelope>,
        expected_version: ExpectedVersion,
    ) -> EventStoreResult<CommitResult>;

    /// All events of one stream in version order
    async fn load_stream(&self, stream: &StreamName) -> EventStoreResult<Vec<RecordedEvent>>;

    /// All events with a sequence number of at least `sequence_number`, in sequence order
    async fn load_all_from(&self, sequence_number: u64) -> EventStoreResult<Vec<RecordedEvent>>;

    /// Current version of a stream; 0 if it has no events
    async fn stream_version(&self, stream: &StreamName) -> EventStoreResult<u64>;

    /// Sequence number of the most recent event; 0 if the log is empty
    async fn head_sequence_number(&self) -> EventStoreResult<u64>;
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use internlink_core::{AggregateId, ExpectedVersion, UserId};
use internlink_postings::InternshipId;

/// An event ready to be appended to a stream (not yet assigned a sequence
/// number). The store assigns sequence numbers during append.
///
/// Built from a typed domain event with [`UncommittedEvent::from_typed`],
/// which serializes the payload and captures the event metadata needed for
/// later deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A stored event in an append-only stream (assigned a sequence number).
///
/// Sequence numbers are stream-scoped, monotonically increasing, and
/// immutable once assigned; the last one doubles as the stream version for
/// optimistic concurrency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }

    /// Convert a stored event into an event envelope for publication.
    pub fn to_envelope(&self) -> internlink_events::EventEnvelope<JsonValue> {
        internlink_events::EventEnvelope::new(
            self.event_id,
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.sequence_number,
            self.payload.clone(),
        )
    }
}

/// The uniqueness key for application streams: one non-deleted application
/// per (student, internship) pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationKey {
    pub student_id: UserId,
    pub internship_id: InternshipId,
}

/// Event store operation error.
///
/// These are **infrastructure errors** (storage, concurrency, uniqueness at
/// the write) as opposed to domain errors (validation, authorization).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed (stream version moved).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// The (student, internship) uniqueness slot is already claimed.
    #[error("already applied to this internship")]
    DuplicateApplication,

    /// Invalid event data or stream state.
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// The backend did not answer within its bounded timeout (or is down).
    /// Transient; safe to retry with backoff.
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}

/// Append-only event store.
///
/// Events are organized into **streams**, one per aggregate instance, with
/// monotonically increasing sequence numbers (1, 2, 3, ...).
///
/// Implementations must:
/// - enforce optimistic concurrency (check version before append)
/// - assign sequence numbers monotonically (no gaps, no duplicates)
/// - ensure atomicity (all events in a batch are persisted or none are)
/// - make `append_initial` claim the uniqueness slot and write the creation
///   events in **one** atomic step; a prior read is not enough to keep two
///   near-simultaneous submissions from both succeeding
/// - bound blocking IO and surface timeouts as [`StoreError::Unavailable`]
///   instead of hanging indefinitely
pub trait EventStore: Send + Sync {
    /// Append events to an existing aggregate stream (append-only).
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, StoreError>;

    /// Atomically claim the `(student, internship)` slot and append the
    /// creation events of a brand-new application stream.
    fn append_initial(
        &self,
        key: ApplicationKey,
        events: Vec<UncommittedEvent>,
    ) -> Result<Vec<StoredEvent>, StoreError>;

    /// Load the full stream for an aggregate. Empty vector if the stream
    /// does not exist yet.
    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, StoreError>;

    /// Look up the application stream claimed for a (student, internship)
    /// pair, if any. Advisory: the authoritative duplicate check is the
    /// claim inside `append_initial`.
    fn find_application(&self, key: &ApplicationKey) -> Result<Option<AggregateId>, StoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        (**self).append(events, expected_version)
    }

    fn append_initial(
        &self,
        key: ApplicationKey,
        events: Vec<UncommittedEvent>,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        (**self).append_initial(key, events)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, StoreError> {
        (**self).load_stream(aggregate_id)
    }

    fn find_application(&self, key: &ApplicationKey) -> Result<Option<AggregateId>, StoreError> {
        (**self).find_application(key)
    }
}

impl UncommittedEvent {
    /// Convenience constructor from a typed domain event.
    pub fn from_typed<E>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_id: Uuid,
        event: &E,
    ) -> Result<Self, StoreError>
    where
        E: internlink_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            StoreError::InvalidAppend(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

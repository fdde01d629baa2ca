//! Transition execution pipeline (application-level orchestration).
//!
//! A status-change request flows through here:
//!
//! ```text
//! TransitionRequest
//!   ↓
//! 1. Load events from store
//!   ↓
//! 2. Rehydrate the application (apply historical events)
//!   ↓
//! 3. Stale-state check against the request's observed status
//!   ↓
//! 4. Handle the transition command (authorization + payload validation,
//!    pure decision logic producing events)
//!   ↓
//! 5. Append to the store (optimistic concurrency on the stream version)
//!   ↓
//! 6. Publish committed envelopes to the bus (failures logged, not surfaced)
//!   ↓
//! 7. Dispatch side effects (notifications; fire-and-forget)
//! ```
//!
//! Status, payload and history fact are carried by the same appended events,
//! so they commit together or not at all. Everything after the append is a
//! delivery concern: the transition is already the source of truth, and a
//! failed notification or publication never rolls it back.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use internlink_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use internlink_events::{EventBus, EventEnvelope};
use internlink_lifecycle::{
    ActorRole, Application, ApplicationCommand, ApplicationEvent, ApplicationId,
    ApplicationStatus, InterviewSlot, StatusGraph, TransitionStatus,
};

use crate::event_store::{EventStore, StoreError, StoredEvent, UncommittedEvent};
use crate::side_effects::{NotificationSink, SideEffectDispatcher};

/// Stream type identifier for application streams.
pub const APPLICATION_AGGREGATE_TYPE: &str = "internship.application";

/// Errors surfaced by the execution pipeline, grouped the way callers must
/// react to them (validation / authorization / conflict / infrastructure).
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// The transition was refused; the reason is one of the stable strings
    /// `terminal`, `no-such-edge`, `role-not-permitted` or `stale-state`.
    #[error("transition denied: {0}")]
    TransitionDenied(String),

    /// The transition payload failed validation (caller error; not retried).
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A non-deleted application already exists for this (student, internship).
    #[error("already applied to this internship")]
    DuplicateApplication,

    /// The internship posting is not accepting applications.
    #[error("internship not accepting applications")]
    PostingNotOpen,

    /// The internship's application deadline has passed.
    #[error("application deadline passed")]
    DeadlinePassed,

    /// The employer's KYC verification is not approved.
    #[error("employer verification required")]
    VerificationRequired,

    /// The referenced record does not exist (or is not visible to the actor).
    #[error("not found")]
    NotFound,

    /// A state conflict; re-fetch current state before deciding to retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The persistence backend timed out or is down. Transient; safe to
    /// retry with backoff (execution is idempotent against terminal state
    /// and duplicate-safe against the uniqueness claim).
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// Failed to decode historical event payloads.
    #[error("failed to decode stored events: {0}")]
    Deserialize(String),

    /// Other storage failure.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ExecuteError {
    fn from(value: StoreError) -> Self {
        match value {
            // A lost optimistic-concurrency race is the same caller-visible
            // condition as a stale observed status.
            StoreError::Concurrency(msg) => {
                ExecuteError::TransitionDenied(format!("stale-state: {msg}"))
            }
            StoreError::DuplicateApplication => ExecuteError::DuplicateApplication,
            StoreError::Unavailable(msg) => ExecuteError::PersistenceUnavailable(msg),
            other => ExecuteError::Store(other),
        }
    }
}

impl From<DomainError> for ExecuteError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ExecuteError::InvalidPayload(msg),
            DomainError::TransitionDenied(reason) => ExecuteError::TransitionDenied(reason),
            DomainError::DuplicateApplication => ExecuteError::DuplicateApplication,
            DomainError::PostingNotOpen => ExecuteError::PostingNotOpen,
            DomainError::DeadlinePassed => ExecuteError::DeadlinePassed,
            DomainError::VerificationRequired => ExecuteError::VerificationRequired,
            DomainError::NotFound => ExecuteError::NotFound,
            DomainError::Conflict(msg) => ExecuteError::Conflict(msg),
            DomainError::InvalidId(msg) => ExecuteError::InvalidPayload(msg),
        }
    }
}

/// Ephemeral per-invocation value describing a requested status change.
/// Constructed at the request boundary; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub application_id: ApplicationId,
    /// The status the caller observed; execution is refused as stale if the
    /// record has moved on since.
    pub current_status: ApplicationStatus,
    pub target: ApplicationStatus,
    pub acting_role: ActorRole,
    pub interview: Option<InterviewSlot>,
    pub occurred_at: DateTime<Utc>,
}

/// Applies authorized transitions to persisted applications and triggers
/// their side effects.
#[derive(Debug)]
pub struct TransitionExecutor<S, B, N> {
    store: S,
    bus: B,
    effects: SideEffectDispatcher<N>,
    graph: StatusGraph,
}

impl<S, B, N> TransitionExecutor<S, B, N> {
    pub fn new(store: S, bus: B, effects: SideEffectDispatcher<N>) -> Self {
        Self::with_graph(store, bus, effects, StatusGraph::standard())
    }

    pub fn with_graph(
        store: S,
        bus: B,
        effects: SideEffectDispatcher<N>,
        graph: StatusGraph,
    ) -> Self {
        Self {
            store,
            bus,
            effects,
            graph,
        }
    }
}

impl<S, B, N> TransitionExecutor<S, B, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    N: NotificationSink,
{
    /// Execute a transition request end to end and return the updated record.
    pub fn execute(&self, request: TransitionRequest) -> Result<Application, ExecuteError> {
        let aggregate_id = request.application_id.0;

        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        if history.is_empty() {
            return Err(ExecuteError::NotFound);
        }
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate
        let mut application =
            Application::empty_with_graph(request.application_id, self.graph.clone());
        apply_history(&mut application, &history)?;

        // 3) Stale-state check: never act on a status the caller didn't see.
        if application.status() != request.current_status {
            return Err(ExecuteError::TransitionDenied(format!(
                "stale-state: application is {}, request observed {}",
                application.status(),
                request.current_status
            )));
        }

        // 4) Decide events (no mutation)
        let command = ApplicationCommand::TransitionStatus(TransitionStatus {
            application_id: request.application_id,
            target: request.target,
            acting_role: request.acting_role,
            interview: request.interview.clone(),
            occurred_at: request.occurred_at,
        });
        let decided = application.handle(&command)?;

        // 5) Persist (append-only, optimistic)
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    aggregate_id,
                    APPLICATION_AGGREGATE_TYPE,
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let committed = self.store.append(uncommitted, expected)?;

        // 6) Publish committed envelopes. The append is authoritative; a
        // failed publish is logged and the response still reports success.
        publish_committed(&self.bus, &committed);

        // 7) Evolve the returned record and dispatch side effects.
        for event in &decided {
            application.apply(event);
        }
        for event in &decided {
            if let ApplicationEvent::StatusChanged(change) = event {
                self.effects.on_status_changed(&application, change);
            }
        }

        Ok(application)
    }

    /// Read-only load through the executor's store and graph.
    pub fn load(&self, application_id: ApplicationId) -> Result<Application, ExecuteError> {
        load_application(&self.store, &self.graph, application_id)
    }
}

/// Load and rehydrate an application record (read-only).
pub fn load_application<S: EventStore>(
    store: &S,
    graph: &StatusGraph,
    application_id: ApplicationId,
) -> Result<Application, ExecuteError> {
    let history = store.load_stream(application_id.0)?;
    if history.is_empty() {
        return Err(ExecuteError::NotFound);
    }
    validate_loaded_stream(application_id.0, &history)?;

    let mut application = Application::empty_with_graph(application_id, graph.clone());
    apply_history(&mut application, &history)?;
    Ok(application)
}

pub(crate) fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

pub(crate) fn publish_committed<B>(bus: &B, committed: &[StoredEvent])
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    for stored in committed {
        if let Err(err) = bus.publish(stored.to_envelope()) {
            tracing::warn!(
                aggregate_id = %stored.aggregate_id,
                sequence_number = stored.sequence_number,
                error = ?err,
                "event publication failed after append; state remains committed"
            );
        }
    }
}

pub(crate) fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), ExecuteError> {
    // Defend against a buggy backend: the stream must belong to the
    // requested aggregate and be monotonically increasing.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(ExecuteError::Store(StoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number == 0 {
            return Err(ExecuteError::Store(StoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(ExecuteError::Store(StoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

pub(crate) fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), ExecuteError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Ensure deterministic ordering.
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| ExecuteError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(aggregate_id: AggregateId, sequence_number: u64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: APPLICATION_AGGREGATE_TYPE.to_string(),
            sequence_number,
            event_type: "application.status_changed".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn valid_stream_passes() {
        let id = AggregateId::new();
        let stream = vec![stored(id, 1), stored(id, 2), stored(id, 3)];
        assert!(validate_loaded_stream(id, &stream).is_ok());
        assert_eq!(stream_version(&stream), 3);
    }

    #[test]
    fn foreign_aggregate_in_stream_is_rejected() {
        let id = AggregateId::new();
        let stream = vec![stored(id, 1), stored(AggregateId::new(), 2)];
        let err = validate_loaded_stream(id, &stream).unwrap_err();
        assert!(matches!(err, ExecuteError::Store(StoreError::InvalidAppend(_))));
    }

    #[test]
    fn non_monotonic_stream_is_rejected() {
        let id = AggregateId::new();
        let stream = vec![stored(id, 2), stored(id, 2)];
        let err = validate_loaded_stream(id, &stream).unwrap_err();
        assert!(matches!(err, ExecuteError::Store(StoreError::InvalidAppend(_))));
    }

    #[test]
    fn concurrency_store_error_surfaces_as_stale_state() {
        let err: ExecuteError = StoreError::Concurrency("expected Exact(1), found 2".into()).into();
        match err {
            ExecuteError::TransitionDenied(reason) => {
                assert!(reason.starts_with("stale-state"))
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn domain_denial_keeps_its_reason() {
        let err: ExecuteError = DomainError::denied("no-such-edge").into();
        match err {
            ExecuteError::TransitionDenied(reason) => assert_eq!(reason, "no-such-edge"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}

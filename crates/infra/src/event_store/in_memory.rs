use std::collections::HashMap;
use std::sync::RwLock;

use internlink_core::{AggregateId, ExpectedVersion};

use super::r#trait::{ApplicationKey, EventStore, StoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Default)]
struct Inner {
    streams: HashMap<AggregateId, Vec<StoredEvent>>,
    /// Uniqueness registry: one application stream per (student, internship).
    applications: HashMap<ApplicationKey, AggregateId>,
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. A single lock covers both the streams and the
/// application uniqueness registry, which is what makes `append_initial`'s
/// claim-and-append atomic.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: RwLock<Inner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }

    fn validate_batch(events: &[UncommittedEvent]) -> Result<(AggregateId, String), StoreError> {
        let aggregate_id = events[0].aggregate_id;
        let aggregate_type = events[0].aggregate_type.clone();

        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id != aggregate_id {
                return Err(StoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_ids (index {idx})"
                )));
            }
            if e.aggregate_type != aggregate_type {
                return Err(StoreError::InvalidAppend(format!(
                    "batch contains multiple aggregate_types (index {idx})"
                )));
            }
        }

        Ok((aggregate_id, aggregate_type))
    }

    fn push_events(
        stream: &mut Vec<StoredEvent>,
        events: Vec<UncommittedEvent>,
    ) -> Vec<StoredEvent> {
        let mut next = Self::current_version(stream) + 1;
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            let stored = StoredEvent {
                event_id: e.event_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: next,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            next += 1;
            stream.push(stored.clone());
            committed.push(stored);
        }
        committed
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let (aggregate_id, aggregate_type) = Self::validate_batch(&events)?;

        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let stream = inner.streams.entry(aggregate_id).or_default();
        let current = Self::current_version(stream);

        if !expected_version.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        // Enforce aggregate type stability across the stream.
        if let Some(existing) = stream.first() {
            if existing.aggregate_type != aggregate_type {
                return Err(StoreError::InvalidAppend(format!(
                    "stream aggregate_type is '{}', attempted append with '{}'",
                    existing.aggregate_type, aggregate_type
                )));
            }
        }

        Ok(Self::push_events(stream, events))
    }

    fn append_initial(
        &self,
        key: ApplicationKey,
        events: Vec<UncommittedEvent>,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        if events.is_empty() {
            return Err(StoreError::InvalidAppend(
                "initial append requires at least one event".to_string(),
            ));
        }

        let (aggregate_id, _) = Self::validate_batch(&events)?;

        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        // Claim and append under the same lock: exactly one of two racing
        // submissions wins, the other observes the claim.
        if inner.applications.contains_key(&key) {
            return Err(StoreError::DuplicateApplication);
        }

        let stream = inner.streams.entry(aggregate_id).or_default();
        if !stream.is_empty() {
            return Err(StoreError::Concurrency(format!(
                "expected Exact(0), found {}",
                Self::current_version(stream)
            )));
        }

        let committed = Self::push_events(stream, events);
        inner.applications.insert(key, aggregate_id);

        Ok(committed)
    }

    fn load_stream(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(inner.streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    fn find_application(&self, key: &ApplicationKey) -> Result<Option<AggregateId>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(inner.applications.get(key).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use internlink_core::UserId;
    use internlink_postings::InternshipId;
    use uuid::Uuid;

    fn test_event(aggregate_id: AggregateId) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: "internship.application".to_string(),
            event_type: "application.submitted".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({}),
        }
    }

    fn test_key() -> ApplicationKey {
        ApplicationKey {
            student_id: UserId::new(),
            internship_id: InternshipId::new(AggregateId::new()),
        }
    }

    #[test]
    fn append_assigns_monotonic_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        let first = store
            .append(vec![test_event(aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap();
        assert_eq!(first[0].sequence_number, 1);

        let second = store
            .append(
                vec![test_event(aggregate_id), test_event(aggregate_id)],
                ExpectedVersion::Exact(1),
            )
            .unwrap();
        assert_eq!(second[0].sequence_number, 2);
        assert_eq!(second[1].sequence_number, 3);
    }

    #[test]
    fn stale_expected_version_is_a_concurrency_error() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new();

        store
            .append(vec![test_event(aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap();

        let err = store
            .append(vec![test_event(aggregate_id)], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
    }

    #[test]
    fn append_initial_claims_the_application_slot() {
        let store = InMemoryEventStore::new();
        let key = test_key();
        let aggregate_id = AggregateId::new();

        store
            .append_initial(key, vec![test_event(aggregate_id)])
            .unwrap();
        assert_eq!(store.find_application(&key).unwrap(), Some(aggregate_id));

        let err = store
            .append_initial(key, vec![test_event(AggregateId::new())])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateApplication));
    }

    #[test]
    fn concurrent_initial_appends_have_exactly_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryEventStore::new());
        let key = test_key();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.append_initial(key, vec![test_event(AggregateId::new())])
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::DuplicateApplication)))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(duplicates, 7);
    }

    #[test]
    fn load_stream_of_unknown_aggregate_is_empty() {
        let store = InMemoryEventStore::new();
        assert!(store.load_stream(AggregateId::new()).unwrap().is_empty());
    }
}

//! Admission control: the gates that run before a record is created.
//!
//! Two gates live here. Application creation checks that the posting is
//! published and inside its deadline, and relies on the store's atomic
//! uniqueness claim to keep two near-simultaneous submissions from both
//! succeeding. Posting publication resolves the employer's KYC state from
//! the identity context and feeds it into the pure publish check.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

use internlink_core::{Aggregate, AggregateId, AggregateRoot, ExpectedVersion, UserId};
use internlink_events::{EventBus, EventEnvelope};
use internlink_lifecycle::{Application, ApplicationCommand, ApplicationId, SubmitApplication};
use internlink_postings::{
    ClosePosting, CreatePosting, InternshipId, KycState, Posting, PostingCommand, PostingStatus,
    PublishPosting,
};

use crate::event_store::{ApplicationKey, EventStore, UncommittedEvent};
use crate::executor::{
    APPLICATION_AGGREGATE_TYPE, ExecuteError, apply_history, publish_committed, stream_version,
    validate_loaded_stream,
};

/// Stream type identifier for posting streams.
pub const POSTING_AGGREGATE_TYPE: &str = "internship.posting";

/// Resolves an employer's KYC verification state.
///
/// The real platform asks the identity service; the lifecycle core only
/// needs the resolved state at the moment of the publish request.
pub trait KycDirectory: Send + Sync {
    fn kyc_state(&self, employer_id: UserId) -> KycState;
}

/// In-memory directory for tests/dev. Unknown employers are `Pending`.
#[derive(Debug, Default)]
pub struct InMemoryKycDirectory {
    states: Mutex<HashMap<UserId, KycState>>,
}

impl InMemoryKycDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, employer_id: UserId, state: KycState) {
        if let Ok(mut states) = self.states.lock() {
            states.insert(employer_id, state);
        }
    }
}

impl KycDirectory for InMemoryKycDirectory {
    fn kyc_state(&self, employer_id: UserId) -> KycState {
        match self.states.lock() {
            Ok(states) => states.get(&employer_id).copied().unwrap_or(KycState::Pending),
            Err(_) => KycState::Pending,
        }
    }
}

impl<K> KycDirectory for std::sync::Arc<K>
where
    K: KycDirectory + ?Sized,
{
    fn kyc_state(&self, employer_id: UserId) -> KycState {
        (**self).kyc_state(employer_id)
    }
}

impl<K> KycDirectory for &K
where
    K: KycDirectory + ?Sized,
{
    fn kyc_state(&self, employer_id: UserId) -> KycState {
        (**self).kyc_state(employer_id)
    }
}

/// Parameters for a new application submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateApplication {
    pub student_id: UserId,
    pub internship_id: InternshipId,
    pub cover_letter: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Runs creation-time gates and dispatches the posting lifecycle commands.
#[derive(Debug)]
pub struct AdmissionController<S, B> {
    store: S,
    bus: B,
}

impl<S, B> AdmissionController<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    /// Admit and create a new application.
    ///
    /// Gate order: duplicate pre-check, posting open, deadline. The
    /// pre-check is advisory only; the authoritative duplicate guard is the
    /// claim inside `append_initial`, taken atomically with the write.
    pub fn create_application(
        &self,
        request: CreateApplication,
    ) -> Result<Application, ExecuteError> {
        let key = ApplicationKey {
            student_id: request.student_id,
            internship_id: request.internship_id,
        };
        if self.store.find_application(&key)?.is_some() {
            return Err(ExecuteError::DuplicateApplication);
        }

        let posting = match load_posting(&self.store, request.internship_id) {
            Ok(posting) => posting,
            // An unknown posting cannot be accepting applications.
            Err(ExecuteError::NotFound) => return Err(ExecuteError::PostingNotOpen),
            Err(other) => return Err(other),
        };
        if posting.status() != PostingStatus::Published {
            return Err(ExecuteError::PostingNotOpen);
        }
        match posting.application_deadline() {
            Some(deadline) if request.occurred_at < deadline => {}
            _ => return Err(ExecuteError::DeadlinePassed),
        }

        let application_id = ApplicationId::new(AggregateId::new());
        let mut application = Application::empty(application_id);
        let command = ApplicationCommand::SubmitApplication(SubmitApplication {
            application_id,
            student_id: request.student_id,
            internship_id: request.internship_id,
            cover_letter: request.cover_letter,
            occurred_at: request.occurred_at,
        });
        let decided = application.handle(&command)?;

        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    application_id.0,
                    APPLICATION_AGGREGATE_TYPE,
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let committed = self.store.append_initial(key, uncommitted)?;

        publish_committed(&self.bus, &committed);

        for event in &decided {
            application.apply(event);
        }
        Ok(application)
    }

    /// Create a draft posting.
    pub fn create_posting(&self, command: CreatePosting) -> Result<Posting, ExecuteError> {
        let internship_id = command.internship_id;
        let posting = Posting::empty(internship_id);
        let decided = posting.handle(&PostingCommand::CreatePosting(command))?;
        self.commit_posting(posting, internship_id, ExpectedVersion::Exact(0), decided)
    }

    /// Publish a draft posting, gated on the employer's KYC state.
    pub fn publish_posting(
        &self,
        internship_id: InternshipId,
        employer_id: UserId,
        kyc_state: KycState,
        occurred_at: DateTime<Utc>,
    ) -> Result<Posting, ExecuteError> {
        let posting = load_posting(&self.store, internship_id)?;
        let expected = ExpectedVersion::Exact(posting.version());
        let decided = posting.handle(&PostingCommand::PublishPosting(PublishPosting {
            internship_id,
            employer_id,
            kyc_state,
            occurred_at,
        }))?;
        self.commit_posting(posting, internship_id, expected, decided)
    }

    /// Close a posting. No further applications are admitted afterwards;
    /// existing applications continue their own lifecycles.
    pub fn close_posting(&self, command: ClosePosting) -> Result<Posting, ExecuteError> {
        let internship_id = command.internship_id;
        let posting = load_posting(&self.store, internship_id)?;
        let expected = ExpectedVersion::Exact(posting.version());
        let decided = posting.handle(&PostingCommand::ClosePosting(command))?;
        self.commit_posting(posting, internship_id, expected, decided)
    }

    fn commit_posting(
        &self,
        mut posting: Posting,
        internship_id: InternshipId,
        expected: ExpectedVersion,
        decided: Vec<internlink_postings::PostingEvent>,
    ) -> Result<Posting, ExecuteError> {
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(
                    internship_id.0,
                    POSTING_AGGREGATE_TYPE,
                    Uuid::now_v7(),
                    ev,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let committed = self.store.append(uncommitted, expected)?;

        publish_committed(&self.bus, &committed);

        for event in &decided {
            posting.apply(event);
        }
        Ok(posting)
    }

    /// Read-only posting load through the controller's store.
    pub fn load(&self, internship_id: InternshipId) -> Result<Posting, ExecuteError> {
        load_posting(&self.store, internship_id)
    }
}

/// Load and rehydrate a posting (read-only).
pub fn load_posting<S: EventStore>(
    store: &S,
    internship_id: InternshipId,
) -> Result<Posting, ExecuteError> {
    let history = store.load_stream(internship_id.0)?;
    if history.is_empty() {
        return Err(ExecuteError::NotFound);
    }
    validate_loaded_stream(internship_id.0, &history)?;

    let mut posting = Posting::empty(internship_id);
    apply_history(&mut posting, &history)?;
    debug_assert_eq!(posting.version(), stream_version(&history));
    Ok(posting)
}

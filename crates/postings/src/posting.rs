use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use internlink_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use internlink_events::Event;

use crate::kyc::KycState;

/// Internship posting identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternshipId(pub AggregateId);

impl InternshipId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InternshipId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Posting status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostingStatus {
    Draft,
    Published,
    Closed,
}

/// Aggregate root: internship posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    id: InternshipId,
    employer_id: Option<UserId>,
    status: PostingStatus,
    application_deadline: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Posting {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: InternshipId) -> Self {
        Self {
            id,
            employer_id: None,
            status: PostingStatus::Draft,
            application_deadline: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> InternshipId {
        self.id
    }

    pub fn employer_id(&self) -> Option<UserId> {
        self.employer_id
    }

    pub fn status(&self) -> PostingStatus {
        self.status
    }

    pub fn application_deadline(&self) -> Option<DateTime<Utc>> {
        self.application_deadline
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    /// Whether the posting admits new applications at `now`.
    ///
    /// Creation-time admission uses this split into its two reasons
    /// (`PostingNotOpen` vs `DeadlinePassed`); this predicate is the
    /// read-side convenience.
    pub fn accepting_applications(&self, now: DateTime<Utc>) -> bool {
        self.created
            && self.status == PostingStatus::Published
            && self.application_deadline.is_some_and(|deadline| now < deadline)
    }
}

impl AggregateRoot for Posting {
    type Id = InternshipId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePosting (a draft owned by an employer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePosting {
    pub internship_id: InternshipId,
    pub employer_id: UserId,
    pub application_deadline: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PublishPosting.
///
/// Carries the employer's KYC state as resolved by the identity context at
/// request time, keeping the gate check pure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishPosting {
    pub internship_id: InternshipId,
    pub employer_id: UserId,
    pub kyc_state: KycState,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClosePosting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosePosting {
    pub internship_id: InternshipId,
    pub employer_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostingCommand {
    CreatePosting(CreatePosting),
    PublishPosting(PublishPosting),
    ClosePosting(ClosePosting),
}

/// Event: PostingCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingCreated {
    pub internship_id: InternshipId,
    pub employer_id: UserId,
    pub application_deadline: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PostingPublished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingPublished {
    pub internship_id: InternshipId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PostingClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingClosed {
    pub internship_id: InternshipId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostingEvent {
    PostingCreated(PostingCreated),
    PostingPublished(PostingPublished),
    PostingClosed(PostingClosed),
}

impl Event for PostingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PostingEvent::PostingCreated(_) => "posting.created",
            PostingEvent::PostingPublished(_) => "posting.published",
            PostingEvent::PostingClosed(_) => "posting.closed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PostingEvent::PostingCreated(e) => e.occurred_at,
            PostingEvent::PostingPublished(e) => e.occurred_at,
            PostingEvent::PostingClosed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Posting {
    type Command = PostingCommand;
    type Event = PostingEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PostingEvent::PostingCreated(e) => {
                self.id = e.internship_id;
                self.employer_id = Some(e.employer_id);
                self.status = PostingStatus::Draft;
                self.application_deadline = Some(e.application_deadline);
                self.created = true;
            }
            PostingEvent::PostingPublished(_) => {
                self.status = PostingStatus::Published;
            }
            PostingEvent::PostingClosed(_) => {
                self.status = PostingStatus::Closed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PostingCommand::CreatePosting(cmd) => self.handle_create(cmd),
            PostingCommand::PublishPosting(cmd) => self.handle_publish(cmd),
            PostingCommand::ClosePosting(cmd) => self.handle_close(cmd),
        }
    }
}

impl Posting {
    fn ensure_owner(&self, employer_id: UserId) -> Result<(), DomainError> {
        // A foreign posting is indistinguishable from a missing one.
        if self.employer_id != Some(employer_id) {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreatePosting) -> Result<Vec<PostingEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("posting already exists"));
        }

        if cmd.application_deadline <= cmd.occurred_at {
            return Err(DomainError::validation(
                "application deadline must be in the future",
            ));
        }

        Ok(vec![PostingEvent::PostingCreated(PostingCreated {
            internship_id: cmd.internship_id,
            employer_id: cmd.employer_id,
            application_deadline: cmd.application_deadline,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_publish(&self, cmd: &PublishPosting) -> Result<Vec<PostingEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_owner(cmd.employer_id)?;

        // KYC gating comes before status checks: an unverified employer
        // learns nothing about the posting's state.
        if !cmd.kyc_state.is_approved() {
            return Err(DomainError::VerificationRequired);
        }

        match self.status {
            PostingStatus::Draft => Ok(vec![PostingEvent::PostingPublished(PostingPublished {
                internship_id: cmd.internship_id,
                occurred_at: cmd.occurred_at,
            })]),
            PostingStatus::Published => Err(DomainError::conflict("posting already published")),
            PostingStatus::Closed => Err(DomainError::conflict("posting is closed")),
        }
    }

    fn handle_close(&self, cmd: &ClosePosting) -> Result<Vec<PostingEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_owner(cmd.employer_id)?;

        if self.status == PostingStatus::Closed {
            return Err(DomainError::conflict("posting already closed"));
        }

        Ok(vec![PostingEvent::PostingClosed(PostingClosed {
            internship_id: cmd.internship_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

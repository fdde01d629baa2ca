use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use internlink_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use internlink_events::Event;
use internlink_postings::InternshipId;

use crate::authorize::{Decision, authorize};
use crate::graph::StatusGraph;
use crate::status::{ActorRole, ApplicationStatus};

/// Application identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub AggregateId);

impl ApplicationId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Structured payload for the edge into `InterviewScheduled`.
///
/// The schedule must be strictly in the future relative to the request's
/// business time; notes are free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewSlot {
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// One append-only history fact. `from` is `None` for the initiating fact
/// written at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFact {
    pub occurred_at: DateTime<Utc>,
    pub from: Option<ApplicationStatus>,
    pub to: ApplicationStatus,
    pub acting_role: ActorRole,
}

/// Aggregate root: a student's application to an internship posting.
///
/// Created at `Submitted` (admission control runs before the creation
/// command is dispatched), mutated exclusively through status transitions,
/// never physically deleted here. The interview slot is populated only
/// while the status is `InterviewScheduled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    id: ApplicationId,
    graph: StatusGraph,
    student_id: Option<UserId>,
    internship_id: Option<InternshipId>,
    cover_letter: Option<String>,
    status: ApplicationStatus,
    applied_at: Option<DateTime<Utc>>,
    interview: Option<InterviewSlot>,
    history: Vec<HistoryFact>,
    version: u64,
    created: bool,
}

impl Application {
    /// Create an empty, not-yet-created aggregate instance for rehydration,
    /// governed by the default status graph.
    pub fn empty(id: ApplicationId) -> Self {
        Self::empty_with_graph(id, StatusGraph::standard())
    }

    /// Rehydration seed with an explicit (e.g. override-configured) graph.
    pub fn empty_with_graph(id: ApplicationId, graph: StatusGraph) -> Self {
        Self {
            id,
            graph,
            student_id: None,
            internship_id: None,
            cover_letter: None,
            status: ApplicationStatus::Submitted,
            applied_at: None,
            interview: None,
            history: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ApplicationId {
        self.id
    }

    pub fn student_id(&self) -> Option<UserId> {
        self.student_id
    }

    pub fn internship_id(&self) -> Option<InternshipId> {
        self.internship_id
    }

    pub fn cover_letter(&self) -> Option<&str> {
        self.cover_letter.as_deref()
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        self.applied_at
    }

    pub fn interview(&self) -> Option<&InterviewSlot> {
        self.interview.as_ref()
    }

    pub fn history(&self) -> &[HistoryFact] {
        &self.history
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn graph(&self) -> &StatusGraph {
        &self.graph
    }
}

impl AggregateRoot for Application {
    type Id = ApplicationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitApplication (the creation command; admission gates run
/// before this is dispatched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitApplication {
    pub application_id: ApplicationId,
    pub student_id: UserId,
    pub internship_id: InternshipId,
    pub cover_letter: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: TransitionStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionStatus {
    pub application_id: ApplicationId,
    pub target: ApplicationStatus,
    pub acting_role: ActorRole,
    pub interview: Option<InterviewSlot>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationCommand {
    SubmitApplication(SubmitApplication),
    TransitionStatus(TransitionStatus),
}

/// Event: ApplicationSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmitted {
    pub application_id: ApplicationId,
    pub student_id: UserId,
    pub internship_id: InternshipId,
    pub cover_letter: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged. Carries everything a history fact needs, plus the
/// interview payload when the target is `InterviewScheduled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub application_id: ApplicationId,
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub acting_role: ActorRole,
    pub interview: Option<InterviewSlot>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationEvent {
    ApplicationSubmitted(ApplicationSubmitted),
    StatusChanged(StatusChanged),
}

impl Event for ApplicationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ApplicationEvent::ApplicationSubmitted(_) => "application.submitted",
            ApplicationEvent::StatusChanged(_) => "application.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ApplicationEvent::ApplicationSubmitted(e) => e.occurred_at,
            ApplicationEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Application {
    type Command = ApplicationCommand;
    type Event = ApplicationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ApplicationEvent::ApplicationSubmitted(e) => {
                self.id = e.application_id;
                self.student_id = Some(e.student_id);
                self.internship_id = Some(e.internship_id);
                self.cover_letter = e.cover_letter.clone();
                self.status = ApplicationStatus::Submitted;
                self.applied_at = Some(e.occurred_at);
                self.interview = None;
                self.created = true;
                self.history.push(HistoryFact {
                    occurred_at: e.occurred_at,
                    from: None,
                    to: ApplicationStatus::Submitted,
                    acting_role: ActorRole::Student,
                });
            }
            ApplicationEvent::StatusChanged(e) => {
                self.status = e.to;
                // The slot only lives while the status is InterviewScheduled.
                self.interview = if e.to == ApplicationStatus::InterviewScheduled {
                    e.interview.clone()
                } else {
                    None
                };
                self.history.push(HistoryFact {
                    occurred_at: e.occurred_at,
                    from: Some(e.from),
                    to: e.to,
                    acting_role: e.acting_role,
                });
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ApplicationCommand::SubmitApplication(cmd) => self.handle_submit(cmd),
            ApplicationCommand::TransitionStatus(cmd) => self.handle_transition(cmd),
        }
    }
}

impl Application {
    fn ensure_application_id(&self, application_id: ApplicationId) -> Result<(), DomainError> {
        if self.id != application_id {
            return Err(DomainError::validation("application_id mismatch"));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitApplication) -> Result<Vec<ApplicationEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("application already exists"));
        }

        Ok(vec![ApplicationEvent::ApplicationSubmitted(
            ApplicationSubmitted {
                application_id: cmd.application_id,
                student_id: cmd.student_id,
                internship_id: cmd.internship_id,
                cover_letter: cmd.cover_letter.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_transition(
        &self,
        cmd: &TransitionStatus,
    ) -> Result<Vec<ApplicationEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_application_id(cmd.application_id)?;

        match authorize(&self.graph, self.status, cmd.target, cmd.acting_role) {
            Decision::Allowed => {}
            Decision::Denied(reason) => return Err(DomainError::denied(reason.as_str())),
        }

        if StatusGraph::payload_required(cmd.target) {
            let slot = cmd
                .interview
                .as_ref()
                .ok_or_else(|| DomainError::validation("interview payload required"))?;
            if slot.scheduled_at <= cmd.occurred_at {
                return Err(DomainError::validation(
                    "interview must be scheduled in the future",
                ));
            }
        } else if cmd.interview.is_some() {
            return Err(DomainError::validation(
                "unexpected interview payload for this transition",
            ));
        }

        Ok(vec![ApplicationEvent::StatusChanged(StatusChanged {
            application_id: cmd.application_id,
            from: self.status,
            to: cmd.target,
            acting_role: cmd.acting_role,
            interview: cmd.interview.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

//! Service facade: the surface the request layer (HTTP handlers, jobs)
//! talks to. Captures wall-clock time and resolves identity-context lookups
//! at this boundary so everything beneath it stays deterministic.

use chrono::Utc;
use serde_json::Value as JsonValue;

use internlink_core::UserId;
use internlink_events::{EventBus, EventEnvelope};
use internlink_lifecycle::{
    Action, ActorRole, Application, ApplicationId, ApplicationStatus, InterviewSlot, StatusGraph,
    list_actions,
};
use internlink_postings::{ClosePosting, CreatePosting, InternshipId, Posting};

use crate::admission::{AdmissionController, CreateApplication, KycDirectory};
use crate::event_store::EventStore;
use crate::executor::{ExecuteError, TransitionExecutor, TransitionRequest};
use crate::side_effects::{NotificationSink, SideEffectDispatcher};

/// The platform's application-lifecycle service.
///
/// Clones of the store and bus handles are shared between the admission
/// controller and the transition executor, so `Arc`-wrapped implementations
/// are the expected way to construct one.
#[derive(Debug)]
pub struct PlatformService<S, B, N, K> {
    admission: AdmissionController<S, B>,
    executor: TransitionExecutor<S, B, N>,
    kyc: K,
    graph: StatusGraph,
}

impl<S, B, N, K> PlatformService<S, B, N, K>
where
    S: EventStore + Clone,
    B: EventBus<EventEnvelope<JsonValue>> + Clone,
    N: NotificationSink,
    K: KycDirectory,
{
    pub fn new(store: S, bus: B, sink: N, kyc: K) -> Self {
        Self::with_graph(store, bus, sink, kyc, StatusGraph::standard())
    }

    pub fn with_graph(store: S, bus: B, sink: N, kyc: K, graph: StatusGraph) -> Self {
        let admission = AdmissionController::new(store.clone(), bus.clone());
        let effects = SideEffectDispatcher::new(sink);
        let executor = TransitionExecutor::with_graph(store, bus, effects, graph.clone());
        Self {
            admission,
            executor,
            kyc,
            graph,
        }
    }

    /// Create a draft posting for an employer.
    pub fn create_posting(
        &self,
        employer_id: UserId,
        internship_id: InternshipId,
        application_deadline: chrono::DateTime<Utc>,
    ) -> Result<Posting, ExecuteError> {
        self.admission.create_posting(CreatePosting {
            internship_id,
            employer_id,
            application_deadline,
            occurred_at: Utc::now(),
        })
    }

    /// Publish a draft posting. The employer's KYC state is resolved here,
    /// at the request boundary.
    pub fn publish_posting(
        &self,
        employer_id: UserId,
        internship_id: InternshipId,
    ) -> Result<Posting, ExecuteError> {
        let kyc_state = self.kyc.kyc_state(employer_id);
        self.admission
            .publish_posting(internship_id, employer_id, kyc_state, Utc::now())
    }

    /// Close a posting to new applications.
    pub fn close_posting(
        &self,
        employer_id: UserId,
        internship_id: InternshipId,
    ) -> Result<Posting, ExecuteError> {
        self.admission.close_posting(ClosePosting {
            internship_id,
            employer_id,
            occurred_at: Utc::now(),
        })
    }

    /// Submit a student's application to a posting.
    pub fn create_application(
        &self,
        student_id: UserId,
        internship_id: InternshipId,
        cover_letter: Option<String>,
    ) -> Result<Application, ExecuteError> {
        self.admission.create_application(CreateApplication {
            student_id,
            internship_id,
            cover_letter,
            occurred_at: Utc::now(),
        })
    }

    /// Fetch an application with its full history.
    pub fn get_application(
        &self,
        application_id: ApplicationId,
    ) -> Result<Application, ExecuteError> {
        self.executor.load(application_id)
    }

    /// Fetch a posting.
    pub fn get_posting(&self, internship_id: InternshipId) -> Result<Posting, ExecuteError> {
        self.admission.load(internship_id)
    }

    /// The full action list for an application as seen by `acting_role`,
    /// including disabled entries with their block reasons.
    pub fn list_allowed_actions(
        &self,
        application_id: ApplicationId,
        acting_role: ActorRole,
    ) -> Result<Vec<Action>, ExecuteError> {
        let application = self.get_application(application_id)?;
        Ok(list_actions(&self.graph, application.status(), acting_role))
    }

    /// Execute a status transition. `current_status` is the status the
    /// caller rendered its decision against; a record that has since moved
    /// on denies the request as stale.
    pub fn transition_application(
        &self,
        application_id: ApplicationId,
        current_status: ApplicationStatus,
        target: ApplicationStatus,
        acting_role: ActorRole,
        interview: Option<InterviewSlot>,
    ) -> Result<Application, ExecuteError> {
        self.executor.execute(TransitionRequest {
            application_id,
            current_status,
            target,
            acting_role,
            interview,
            occurred_at: Utc::now(),
        })
    }
}

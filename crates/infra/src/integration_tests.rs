//! End-to-end tests through the service facade: admission, transitions,
//! concurrency, and the notification/bus plumbing around them.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;

use internlink_core::{AggregateId, UserId};
use internlink_events::{EventBus, EventEnvelope, InMemoryEventBus};
use internlink_lifecycle::{
    ActorRole, AdminOverride, ApplicationId, ApplicationStatus, DenialReason, InterviewSlot,
    StatusGraph,
};
use internlink_postings::{InternshipId, KycState};

use crate::admission::InMemoryKycDirectory;
use crate::event_store::InMemoryEventStore;
use crate::executor::ExecuteError;
use crate::service::PlatformService;
use crate::side_effects::{InMemoryNotificationSink, TemplateKind};

type TestBus = InMemoryEventBus<EventEnvelope<JsonValue>>;
type TestService = PlatformService<
    Arc<InMemoryEventStore>,
    Arc<TestBus>,
    Arc<InMemoryNotificationSink>,
    Arc<InMemoryKycDirectory>,
>;

struct Harness {
    service: TestService,
    bus: Arc<TestBus>,
    sink: Arc<InMemoryNotificationSink>,
    kyc: Arc<InMemoryKycDirectory>,
}

fn harness() -> Harness {
    harness_with_graph(StatusGraph::standard())
}

fn harness_with_graph(graph: StatusGraph) -> Harness {
    let store = Arc::new(InMemoryEventStore::new());
    let bus = Arc::new(TestBus::new());
    let sink = Arc::new(InMemoryNotificationSink::new());
    let kyc = Arc::new(InMemoryKycDirectory::new());
    let service = PlatformService::with_graph(
        store,
        Arc::clone(&bus),
        Arc::clone(&sink),
        Arc::clone(&kyc),
        graph,
    );
    Harness {
        service,
        bus,
        sink,
        kyc,
    }
}

impl Harness {
    fn published_internship(&self, employer_id: UserId) -> InternshipId {
        let internship_id = InternshipId::new(AggregateId::new());
        self.kyc.set(employer_id, KycState::Approved);
        self.service
            .create_posting(employer_id, internship_id, Utc::now() + Duration::days(30))
            .unwrap();
        self.service
            .publish_posting(employer_id, internship_id)
            .unwrap();
        internship_id
    }

    fn submitted_application(&self) -> ApplicationId {
        let internship_id = self.published_internship(UserId::new());
        self.service
            .create_application(UserId::new(), internship_id, None)
            .unwrap()
            .id_typed()
    }
}

#[test]
fn full_lifecycle_to_accepted() {
    let h = harness();
    let application_id = h.submitted_application();
    let slot = InterviewSlot {
        scheduled_at: Utc::now() + Duration::days(5),
        notes: Some("Video call".to_string()),
    };

    let steps = [
        (ApplicationStatus::Submitted, ApplicationStatus::UnderReview, None),
        (ApplicationStatus::UnderReview, ApplicationStatus::Shortlisted, None),
        (
            ApplicationStatus::Shortlisted,
            ApplicationStatus::InterviewScheduled,
            Some(slot.clone()),
        ),
        (
            ApplicationStatus::InterviewScheduled,
            ApplicationStatus::Accepted,
            None,
        ),
    ];
    for (current, target, interview) in steps {
        h.service
            .transition_application(
                application_id,
                current,
                target,
                ActorRole::Employer,
                interview,
            )
            .unwrap();
    }

    let application = h.service.get_application(application_id).unwrap();
    assert_eq!(application.status(), ApplicationStatus::Accepted);
    // Creation fact plus four transitions.
    assert_eq!(application.history().len(), 5);
    assert_eq!(application.history()[0].from, None);
    assert_eq!(
        application.history()[4].from,
        Some(ApplicationStatus::InterviewScheduled)
    );
    // The slot only lives while InterviewScheduled.
    assert!(application.interview().is_none());

    // The student was notified at every step; the interview step used its
    // dedicated template.
    let notifications = h.sink.drain();
    assert_eq!(notifications.len(), 4);
    assert_eq!(notifications[2].template, TemplateKind::InterviewScheduled);
    assert_eq!(notifications[3].template, TemplateKind::StatusChanged);
}

#[test]
fn submitted_cannot_jump_to_shortlisted() {
    let h = harness();
    let application_id = h.submitted_application();

    let err = h
        .service
        .transition_application(
            application_id,
            ApplicationStatus::Submitted,
            ApplicationStatus::Shortlisted,
            ActorRole::Employer,
            None,
        )
        .unwrap_err();
    match err {
        ExecuteError::TransitionDenied(reason) => assert_eq!(reason, "no-such-edge"),
        other => panic!("expected TransitionDenied, got {other:?}"),
    }
}

#[test]
fn retrying_a_completed_transition_is_stale() {
    let h = harness();
    let application_id = h.submitted_application();

    h.service
        .transition_application(
            application_id,
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ActorRole::Employer,
            None,
        )
        .unwrap();

    // Same request again: the observed status no longer matches.
    let err = h
        .service
        .transition_application(
            application_id,
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ActorRole::Employer,
            None,
        )
        .unwrap_err();
    match err {
        ExecuteError::TransitionDenied(reason) => {
            assert!(reason.starts_with("stale-state"), "got {reason}")
        }
        other => panic!("expected TransitionDenied, got {other:?}"),
    }

    let application = h.service.get_application(application_id).unwrap();
    assert_eq!(application.history().len(), 2);
}

#[test]
fn concurrent_transitions_have_one_winner() {
    let h = harness();
    let application_id = h.submitted_application();
    let service = Arc::new(h.service);

    let handles: Vec<_> = [ApplicationStatus::UnderReview, ApplicationStatus::Withdrawn]
        .into_iter()
        .map(|target| {
            let service = Arc::clone(&service);
            let role = if target == ApplicationStatus::Withdrawn {
                ActorRole::Student
            } else {
                ActorRole::Employer
            };
            std::thread::spawn(move || {
                service.transition_application(
                    application_id,
                    ApplicationStatus::Submitted,
                    target,
                    role,
                    None,
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let stale = results
        .iter()
        .filter(|r| matches!(r, Err(ExecuteError::TransitionDenied(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(stale, 1);

    let application = service.get_application(application_id).unwrap();
    assert_eq!(application.history().len(), 2);
}

#[test]
fn concurrent_submissions_admit_exactly_one() {
    let h = harness();
    let internship_id = h.published_internship(UserId::new());
    let student_id = UserId::new();
    let service = Arc::new(h.service);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                service.create_application(student_id, internship_id, None)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(ExecuteError::DuplicateApplication)))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(duplicates, 3);
}

#[test]
fn publish_waits_for_kyc_approval() {
    let h = harness();
    let employer_id = UserId::new();
    let internship_id = InternshipId::new(AggregateId::new());
    h.service
        .create_posting(employer_id, internship_id, Utc::now() + Duration::days(30))
        .unwrap();

    // Directory defaults to Pending.
    let err = h
        .service
        .publish_posting(employer_id, internship_id)
        .unwrap_err();
    assert!(matches!(err, ExecuteError::VerificationRequired));

    h.kyc.set(employer_id, KycState::Approved);
    let posting = h.service.publish_posting(employer_id, internship_id).unwrap();
    assert_eq!(
        posting.status(),
        internlink_postings::PostingStatus::Published
    );
}

#[test]
fn terminal_application_denies_everything() {
    let h = harness();
    let application_id = h.submitted_application();
    h.service
        .transition_application(
            application_id,
            ApplicationStatus::Submitted,
            ApplicationStatus::Withdrawn,
            ActorRole::Student,
            None,
        )
        .unwrap();

    for target in ApplicationStatus::ALL {
        let err = h
            .service
            .transition_application(
                application_id,
                ApplicationStatus::Withdrawn,
                target,
                ActorRole::Admin,
                None,
            )
            .unwrap_err();
        match err {
            ExecuteError::TransitionDenied(reason) => assert_eq!(reason, "terminal"),
            other => panic!("expected TransitionDenied, got {other:?}"),
        }
    }
}

#[test]
fn admin_override_can_force_rejection() {
    let h = harness();
    let application_id = h.submitted_application();

    // Rejected is not reachable from Submitted through the graph, but the
    // default override lets an admin force it.
    let application = h
        .service
        .transition_application(
            application_id,
            ApplicationStatus::Submitted,
            ApplicationStatus::Rejected,
            ActorRole::Admin,
            None,
        )
        .unwrap();
    assert_eq!(application.status(), ApplicationStatus::Rejected);
}

#[test]
fn disabled_admin_override_falls_back_to_the_graph() {
    let h = harness_with_graph(StatusGraph::with_admin_override(AdminOverride::disabled()));
    let application_id = h.submitted_application();

    let err = h
        .service
        .transition_application(
            application_id,
            ApplicationStatus::Submitted,
            ApplicationStatus::Rejected,
            ActorRole::Admin,
            None,
        )
        .unwrap_err();
    match err {
        ExecuteError::TransitionDenied(reason) => assert_eq!(reason, "no-such-edge"),
        other => panic!("expected TransitionDenied, got {other:?}"),
    }
}

#[test]
fn actions_reflect_the_acting_role() {
    let h = harness();
    let application_id = h.submitted_application();

    let employer = h
        .service
        .list_allowed_actions(application_id, ActorRole::Employer)
        .unwrap();
    let labels: Vec<_> = employer.iter().map(|a| (a.label, a.enabled)).collect();
    assert_eq!(
        labels,
        vec![("Move to Review", true), ("Withdraw Application", false)]
    );

    let student = h
        .service
        .list_allowed_actions(application_id, ActorRole::Student)
        .unwrap();
    assert!(!student[0].enabled);
    assert_eq!(
        student[0].block_reason,
        Some(DenialReason::RoleNotPermitted)
    );
    assert!(student[1].enabled);
}

#[test]
fn committed_events_reach_bus_subscribers() {
    let h = harness();
    let subscription = h.bus.subscribe();
    let application_id = h.submitted_application();

    let consumer = std::thread::spawn(move || {
        let mut types = Vec::new();
        // Posting created + published, application submitted, one change.
        for _ in 0..4 {
            let envelope = subscription
                .recv_timeout(StdDuration::from_secs(2))
                .expect("expected a published envelope");
            types.push(envelope.aggregate_type().to_string());
        }
        types
    });

    h.service
        .transition_application(
            application_id,
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ActorRole::Employer,
            None,
        )
        .unwrap();

    let types = consumer.join().unwrap();
    assert_eq!(
        types,
        vec![
            "internship.posting",
            "internship.posting",
            "internship.application",
            "internship.application",
        ]
    );
}

#[test]
fn unknown_application_is_not_found() {
    let h = harness();
    let err = h
        .service
        .get_application(ApplicationId::new(AggregateId::new()))
        .unwrap_err();
    assert!(matches!(err, ExecuteError::NotFound));
}

#[test]
fn interview_on_wrong_target_is_invalid_payload() {
    let h = harness();
    let application_id = h.submitted_application();

    let err = h
        .service
        .transition_application(
            application_id,
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ActorRole::Employer,
            Some(InterviewSlot {
                scheduled_at: Utc::now() + Duration::days(3),
                notes: None,
            }),
        )
        .unwrap_err();
    assert!(matches!(err, ExecuteError::InvalidPayload(_)));
}

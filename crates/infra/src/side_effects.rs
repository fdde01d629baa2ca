//! Side effects triggered by committed status changes.
//!
//! Notifications are enqueued after the transition has been appended; a
//! failed enqueue is logged and swallowed so the caller still sees the
//! transition succeed. Delivery (email, push) is a separate consumer's job.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use internlink_core::UserId;
use internlink_lifecycle::{Application, ApplicationStatus, StatusChanged};

/// Notification template selector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateKind {
    InterviewScheduled,
    StatusChanged,
}

/// A queued notification. `data` is the template's substitution payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub template: TemplateKind,
    pub data: JsonValue,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("notification sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination queue for notifications. Enqueue only; delivery happens
/// elsewhere.
pub trait NotificationSink: Send + Sync {
    fn enqueue(&self, notification: Notification) -> Result<(), SinkError>;
}

impl<S> NotificationSink for Arc<S>
where
    S: NotificationSink + ?Sized,
{
    fn enqueue(&self, notification: Notification) -> Result<(), SinkError> {
        (**self).enqueue(notification)
    }
}

impl<S> NotificationSink for &S
where
    S: NotificationSink + ?Sized,
{
    fn enqueue(&self, notification: Notification) -> Result<(), SinkError> {
        (**self).enqueue(notification)
    }
}

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryNotificationSink {
    queue: Mutex<Vec<Notification>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything enqueued so far.
    pub fn drain(&self) -> Vec<Notification> {
        match self.queue.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        }
    }

    /// Copy of the queue without consuming it.
    pub fn snapshot(&self) -> Vec<Notification> {
        match self.queue.lock() {
            Ok(queue) => queue.clone(),
            Err(_) => Vec::new(),
        }
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn enqueue(&self, notification: Notification) -> Result<(), SinkError> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| SinkError::Unavailable("lock poisoned".to_string()))?;
        queue.push(notification);
        Ok(())
    }
}

/// Turns committed status changes into queued notifications.
///
/// Scheduling an interview always notifies the student, with the date
/// rendered human-readable and the notes included when present. Every other
/// change gets the generic status-changed template.
#[derive(Debug)]
pub struct SideEffectDispatcher<N> {
    sink: N,
}

impl<N: NotificationSink> SideEffectDispatcher<N> {
    pub fn new(sink: N) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    /// Enqueue the notifications for a committed status change. Failures are
    /// logged at warn and never propagated.
    pub fn on_status_changed(&self, application: &Application, change: &StatusChanged) {
        let Some(student_id) = application.student_id() else {
            tracing::warn!(
                application_id = %change.application_id,
                "status change on application without a student; skipping notification"
            );
            return;
        };

        let notification = match change.to {
            ApplicationStatus::InterviewScheduled => {
                let Some(slot) = change.interview.as_ref() else {
                    tracing::warn!(
                        application_id = %change.application_id,
                        "interview scheduled without a slot payload; skipping notification"
                    );
                    return;
                };
                Notification {
                    user_id: student_id,
                    template: TemplateKind::InterviewScheduled,
                    data: json!({
                        "application_id": change.application_id,
                        "scheduled_at": format_interview_date(slot.scheduled_at),
                        "notes": slot.notes,
                    }),
                }
            }
            _ => Notification {
                user_id: student_id,
                template: TemplateKind::StatusChanged,
                data: json!({
                    "application_id": change.application_id,
                    "from": change.from,
                    "to": change.to,
                }),
            },
        };

        if let Err(err) = self.sink.enqueue(notification) {
            tracing::warn!(
                application_id = %change.application_id,
                error = %err,
                "notification enqueue failed; transition remains committed"
            );
        }
    }
}

/// Render an interview date for the notification body, e.g.
/// `04 September 2026, 14:30 UTC`.
fn format_interview_date(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%d %B %Y, %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use internlink_core::{Aggregate, AggregateId};
    use internlink_lifecycle::{
        ActorRole, ApplicationCommand, ApplicationEvent, ApplicationId, InterviewSlot,
        SubmitApplication, TransitionStatus,
    };
    use internlink_postings::InternshipId;

    fn scheduled_application() -> (Application, StatusChanged) {
        let id = ApplicationId::new(AggregateId::new());
        let mut app = Application::empty(id);
        let applied_at = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();

        let submit = ApplicationCommand::SubmitApplication(SubmitApplication {
            application_id: id,
            student_id: UserId::new(),
            internship_id: InternshipId::new(AggregateId::new()),
            cover_letter: None,
            occurred_at: applied_at,
        });
        for ev in app.handle(&submit).unwrap() {
            app.apply(&ev);
        }

        let mut last_change = None;
        let steps = [
            (ApplicationStatus::UnderReview, None),
            (ApplicationStatus::Shortlisted, None),
            (
                ApplicationStatus::InterviewScheduled,
                Some(InterviewSlot {
                    scheduled_at: Utc.with_ymd_and_hms(2026, 9, 4, 14, 30, 0).unwrap(),
                    notes: Some("Bring your portfolio".to_string()),
                }),
            ),
        ];
        for (target, interview) in steps {
            let cmd = ApplicationCommand::TransitionStatus(TransitionStatus {
                application_id: id,
                target,
                acting_role: ActorRole::Employer,
                interview,
                occurred_at: applied_at,
            });
            for ev in app.handle(&cmd).unwrap() {
                if let ApplicationEvent::StatusChanged(change) = &ev {
                    last_change = Some(change.clone());
                }
                app.apply(&ev);
            }
        }

        (app, last_change.unwrap())
    }

    #[test]
    fn interview_scheduled_notifies_the_student_with_formatted_date() {
        let (app, change) = scheduled_application();
        let sink = InMemoryNotificationSink::new();
        let dispatcher = SideEffectDispatcher::new(&sink);

        dispatcher.on_status_changed(&app, &change);

        let queued = sink.drain();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].template, TemplateKind::InterviewScheduled);
        assert_eq!(queued[0].user_id, app.student_id().unwrap());
        assert_eq!(
            queued[0].data["scheduled_at"],
            json!("04 September 2026, 14:30 UTC")
        );
        assert_eq!(queued[0].data["notes"], json!("Bring your portfolio"));
    }

    #[test]
    fn other_transitions_use_the_generic_template() {
        let (app, _) = scheduled_application();
        let change = StatusChanged {
            application_id: app.id_typed(),
            from: ApplicationStatus::InterviewScheduled,
            to: ApplicationStatus::Accepted,
            acting_role: ActorRole::Employer,
            interview: None,
            occurred_at: Utc::now(),
        };
        let sink = InMemoryNotificationSink::new();
        let dispatcher = SideEffectDispatcher::new(&sink);

        dispatcher.on_status_changed(&app, &change);

        let queued = sink.drain();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].template, TemplateKind::StatusChanged);
        assert_eq!(queued[0].data["to"], json!("ACCEPTED"));
    }

    #[test]
    fn enqueue_failures_are_swallowed() {
        struct FailingSink;
        impl NotificationSink for FailingSink {
            fn enqueue(&self, _notification: Notification) -> Result<(), SinkError> {
                Err(SinkError::Unavailable("queue full".to_string()))
            }
        }

        let (app, change) = scheduled_application();
        let dispatcher = SideEffectDispatcher::new(FailingSink);

        // Must not panic or propagate.
        dispatcher.on_status_changed(&app, &change);
    }
}

use serde::{Deserialize, Serialize};

/// Application lifecycle status.
///
/// Every application is always in exactly one of these states; there is no
/// "no status" once a record exists. `Accepted`, `Rejected` and `Withdrawn`
/// are terminal: the status graph has no outgoing edges from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Shortlisted,
    InterviewScheduled,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 7] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    /// Terminal statuses have no outgoing edges; no transition out of them
    /// ever succeeds, which is also the idempotency guarantee for retried
    /// requests after a client-visible success.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    /// Wire spelling (matches the platform's persisted enum values).
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::Shortlisted => "SHORTLISTED",
            ApplicationStatus::InterviewScheduled => "INTERVIEW_SCHEDULED",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Withdrawn => "WITHDRAWN",
        }
    }
}

impl core::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role under which a transition is requested.
///
/// Ownership (which student owns the application, which employer owns the
/// internship) is resolved by the identity context before a request reaches
/// this crate; only the role is modeled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Student,
    Employer,
    Admin,
}

impl ActorRole {
    pub const ALL: [ActorRole; 3] = [ActorRole::Student, ActorRole::Employer, ActorRole::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::Student => "STUDENT",
            ActorRole::Employer => "EMPLOYER",
            ActorRole::Admin => "ADMIN",
        }
    }
}

impl core::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_three_statuses_are_terminal() {
        let terminal: Vec<_> = ApplicationStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                ApplicationStatus::Accepted,
                ApplicationStatus::Rejected,
                ApplicationStatus::Withdrawn,
            ]
        );
    }

    #[test]
    fn wire_spelling_is_screaming_snake() {
        assert_eq!(ApplicationStatus::UnderReview.as_str(), "UNDER_REVIEW");
        assert_eq!(
            ApplicationStatus::InterviewScheduled.to_string(),
            "INTERVIEW_SCHEDULED"
        );
        assert_eq!(ActorRole::Employer.as_str(), "EMPLOYER");
    }
}

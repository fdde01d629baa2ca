//! Action presenter: what can this actor do with this application?
//!
//! UI layers are pure renderers of this output and never re-derive
//! permission logic themselves. The policy is "show but disable": every
//! outgoing edge of the current status is listed for every role, with
//! `enabled` and `block_reason` telling the UI whether to grey the button
//! out and what tooltip to attach. Silently hiding blocked actions was
//! rejected in favor of surfacing why an action is blocked.

use serde::Serialize;

use crate::authorize::{DenialReason, authorize};
use crate::graph::StatusGraph;
use crate::status::{ActorRole, ApplicationStatus};

/// One concrete action available (or visible but blocked) on an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub target: ApplicationStatus,
    pub label: &'static str,
    pub icon: &'static str,
    pub confirm_required: bool,
    pub enabled: bool,
    pub block_reason: Option<DenialReason>,
}

fn label_for(target: ApplicationStatus) -> &'static str {
    match target {
        ApplicationStatus::Submitted => "Submit",
        ApplicationStatus::UnderReview => "Move to Review",
        ApplicationStatus::Shortlisted => "Shortlist",
        ApplicationStatus::InterviewScheduled => "Schedule Interview",
        ApplicationStatus::Accepted => "Accept",
        ApplicationStatus::Rejected => "Reject",
        ApplicationStatus::Withdrawn => "Withdraw Application",
    }
}

fn icon_for(target: ApplicationStatus) -> &'static str {
    match target {
        ApplicationStatus::Submitted => "📨",
        ApplicationStatus::UnderReview => "👀",
        ApplicationStatus::Shortlisted => "⭐",
        ApplicationStatus::InterviewScheduled => "📅",
        ApplicationStatus::Accepted => "✅",
        ApplicationStatus::Rejected => "❌",
        ApplicationStatus::Withdrawn => "↩️",
    }
}

/// Enumerate the actions on `current` as seen by `acting_role`.
///
/// Ordering is the fixed edge declaration order in [`StatusGraph`], not
/// alphabetical or frequency-based. Terminal statuses yield an empty list.
pub fn list_actions(
    graph: &StatusGraph,
    current: ApplicationStatus,
    acting_role: ActorRole,
) -> Vec<Action> {
    graph
        .edges_from(current)
        .map(|rule| {
            let decision = authorize(graph, current, rule.to, acting_role);
            Action {
                target: rule.to,
                label: label_for(rule.to),
                icon: icon_for(rule.to),
                confirm_required: rule.confirm_required,
                enabled: decision.is_allowed(),
                block_reason: decision.block_reason(),
            }
        })
        .collect()
}

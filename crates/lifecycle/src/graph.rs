//! Static directed graph of legal status transitions.
//!
//! One row per legal `(from, to)` edge: the roles allowed to initiate it,
//! whether a confirmation step is required before executing it, and whether a
//! structured payload is mandatory. Edge declaration order is the order the
//! action presenter reports actions in.

use crate::status::{ActorRole, ApplicationStatus};

use ActorRole::{Employer, Student};
use ApplicationStatus::*;

/// A single legal transition edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    /// Roles allowed to initiate this edge (admin override is handled
    /// separately, as policy on [`StatusGraph`]).
    pub roles: &'static [ActorRole],
    /// Consequential and irreversible edges require an explicit confirmation
    /// step in the presentation layer before executing.
    pub confirm_required: bool,
    /// The edge cannot be taken without a structured payload
    /// (only scheduling an interview).
    pub payload_required: bool,
}

/// Legal edges in declaration order. This order is part of the contract:
/// the presenter lists actions exactly as declared here.
const EDGES: [TransitionRule; 10] = [
    TransitionRule {
        from: Submitted,
        to: UnderReview,
        roles: &[Employer],
        confirm_required: false,
        payload_required: false,
    },
    TransitionRule {
        from: Submitted,
        to: Withdrawn,
        roles: &[Student],
        confirm_required: false,
        payload_required: false,
    },
    TransitionRule {
        from: UnderReview,
        to: Shortlisted,
        roles: &[Employer],
        confirm_required: false,
        payload_required: false,
    },
    TransitionRule {
        from: UnderReview,
        to: Rejected,
        roles: &[Employer],
        confirm_required: true,
        payload_required: false,
    },
    TransitionRule {
        from: UnderReview,
        to: Withdrawn,
        roles: &[Student],
        confirm_required: false,
        payload_required: false,
    },
    TransitionRule {
        from: Shortlisted,
        to: InterviewScheduled,
        roles: &[Employer],
        confirm_required: false,
        payload_required: true,
    },
    TransitionRule {
        from: Shortlisted,
        to: Rejected,
        roles: &[Employer],
        confirm_required: true,
        payload_required: false,
    },
    TransitionRule {
        from: Shortlisted,
        to: Withdrawn,
        roles: &[Student],
        confirm_required: false,
        payload_required: false,
    },
    TransitionRule {
        from: InterviewScheduled,
        to: Accepted,
        roles: &[Employer],
        confirm_required: true,
        payload_required: false,
    },
    TransitionRule {
        from: InterviewScheduled,
        to: Rejected,
        roles: &[Employer],
        confirm_required: true,
        payload_required: false,
    },
];

/// Admin moderation policy: which targets an admin may force from any
/// non-terminal status, independent of the student/employer edges.
///
/// The observed product behavior only exercised force-reject; whether admins
/// may also force a withdrawal is a deployment decision, so the target set is
/// policy data rather than a hardcoded rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminOverride {
    force_targets: Vec<ApplicationStatus>,
}

impl AdminOverride {
    pub fn new(force_targets: Vec<ApplicationStatus>) -> Self {
        Self { force_targets }
    }

    /// The default moderation policy: force-reject only.
    pub fn force_reject_only() -> Self {
        Self::new(vec![Rejected])
    }

    /// No override at all (admins are bound to the edge table).
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    pub fn allows(&self, target: ApplicationStatus) -> bool {
        self.force_targets.contains(&target)
    }
}

impl Default for AdminOverride {
    fn default() -> Self {
        Self::force_reject_only()
    }
}

/// The status graph: the static edge table plus the admin override policy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusGraph {
    admin_override: AdminOverride,
}

impl StatusGraph {
    /// Graph with the default admin override policy (force-reject only).
    pub fn standard() -> Self {
        Self::default()
    }

    pub fn with_admin_override(admin_override: AdminOverride) -> Self {
        Self { admin_override }
    }

    /// Look up the edge `from → to`, if it is legal for anyone.
    pub fn edge(
        &self,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Option<&'static TransitionRule> {
        EDGES.iter().find(|r| r.from == from && r.to == to)
    }

    /// All outgoing edges from `from`, in declaration order, across all roles.
    pub fn edges_from(
        &self,
        from: ApplicationStatus,
    ) -> impl Iterator<Item = &'static TransitionRule> {
        EDGES.iter().filter(move |r| r.from == from)
    }

    /// Whether the admin override permits forcing `from → to`.
    ///
    /// Terminal sources are never overridable; terminality is absolute.
    pub fn admin_may_force(&self, from: ApplicationStatus, to: ApplicationStatus) -> bool {
        !from.is_terminal() && from != to && self.admin_override.allows(to)
    }

    /// Confirmation is a property of the target: accepting and rejecting are
    /// consequential and irreversible, so they always require it (including
    /// on the admin override path, which has no edge row to carry the flag).
    pub fn confirm_required(target: ApplicationStatus) -> bool {
        matches!(target, Accepted | Rejected)
    }

    /// Only entering `InterviewScheduled` carries a mandatory payload.
    pub fn payload_required(target: ApplicationStatus) -> bool {
        matches!(target, InterviewScheduled)
    }
}

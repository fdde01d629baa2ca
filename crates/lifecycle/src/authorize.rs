//! Pure transition authorization.
//!
//! `authorize` is side-effect free and deterministic: the same input always
//! yields the same decision. That property is what makes it safe to call
//! both from pre-flight UI queries (the action presenter) and as the
//! authoritative check inside the transition executor.

use serde::Serialize;

use crate::graph::StatusGraph;
use crate::status::{ActorRole, ApplicationStatus};

/// Why a transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenialReason {
    /// The current status has no outgoing edges at all.
    Terminal,
    /// No edge `current → target` exists, regardless of role.
    NoSuchEdge,
    /// The edge exists but the acting role is not in its permitted set.
    RoleNotPermitted,
}

impl DenialReason {
    /// Stable reason string surfaced to callers and UIs.
    pub fn as_str(self) -> &'static str {
        match self {
            DenialReason::Terminal => "terminal",
            DenialReason::NoSuchEdge => "no-such-edge",
            DenialReason::RoleNotPermitted => "role-not-permitted",
        }
    }
}

impl core::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn block_reason(self) -> Option<DenialReason> {
        match self {
            Decision::Allowed => None,
            Decision::Denied(reason) => Some(reason),
        }
    }
}

/// Decide whether `acting_role` may move an application from `current` to
/// `target`.
///
/// Checks run in a fixed order so the reported reason is stable:
/// terminality first, then the admin override policy, then edge existence,
/// then the edge's role set.
pub fn authorize(
    graph: &StatusGraph,
    current: ApplicationStatus,
    target: ApplicationStatus,
    acting_role: ActorRole,
) -> Decision {
    if current.is_terminal() {
        return Decision::Denied(DenialReason::Terminal);
    }

    if acting_role == ActorRole::Admin && graph.admin_may_force(current, target) {
        return Decision::Allowed;
    }

    match graph.edge(current, target) {
        None => Decision::Denied(DenialReason::NoSuchEdge),
        Some(rule) if rule.roles.contains(&acting_role) => Decision::Allowed,
        Some(_) => Decision::Denied(DenialReason::RoleNotPermitted),
    }
}

//! `internlink-lifecycle` — the application lifecycle state machine.
//!
//! This crate is pure: no IO, no clocks, no storage. It defines the status
//! graph, the transition authorizer, the action presenter, and the
//! `Application` aggregate whose events carry every status change as an
//! append-only fact.

pub mod actions;
pub mod application;
pub mod authorize;
pub mod graph;
pub mod status;

pub use actions::{Action, list_actions};
pub use application::{
    Application, ApplicationCommand, ApplicationEvent, ApplicationId, ApplicationSubmitted,
    HistoryFact, InterviewSlot, StatusChanged, SubmitApplication, TransitionStatus,
};
pub use authorize::{Decision, DenialReason, authorize};
pub use graph::{AdminOverride, StatusGraph, TransitionRule};
pub use status::{ActorRole, ApplicationStatus};

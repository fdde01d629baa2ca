//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// authorization, admission, conflicts). Infrastructure concerns belong elsewhere.
///
/// The taxonomy mirrors how callers must react:
/// - `Validation` / `DeadlinePassed`: caller error, surface verbatim, never retry.
/// - `TransitionDenied` / `VerificationRequired`: authorization, surface the reason.
/// - `DuplicateApplication` / `Conflict`: 409-equivalent, re-fetch before retrying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, bad transition payload).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A status transition was refused. The reason is one of the stable
    /// strings `terminal`, `no-such-edge`, `role-not-permitted` or `stale-state`.
    #[error("transition denied: {0}")]
    TransitionDenied(String),

    /// A non-deleted application already exists for this (student, internship) pair.
    #[error("already applied to this internship")]
    DuplicateApplication,

    /// The internship posting is not accepting applications (not published).
    #[error("internship not accepting applications")]
    PostingNotOpen,

    /// The internship's application deadline is at or before the current time.
    #[error("application deadline passed")]
    DeadlinePassed,

    /// The employer's KYC verification is not approved; publishing is gated on it.
    #[error("employer verification required")]
    VerificationRequired,

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::TransitionDenied(reason.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

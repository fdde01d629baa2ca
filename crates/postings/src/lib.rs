//! `internlink-postings` — internship posting lifecycle and the publish gate.
//!
//! A posting must be `Published` before any application can exist against it,
//! and publishing is gated on the owning employer's KYC verification. This
//! crate defends that admission boundary; application-side invariants live in
//! `internlink-lifecycle`.

pub mod kyc;
pub mod posting;

pub use kyc::KycState;
pub use posting::{
    ClosePosting, CreatePosting, InternshipId, Posting, PostingClosed, PostingCommand,
    PostingCreated, PostingEvent, PostingPublished, PostingStatus, PublishPosting,
};

use serde::{Deserialize, Serialize};

/// An employer's identity-verification status.
///
/// Publishing a posting requires `Approved`; there is no bypass, since
/// `Published` is the status from which the entire downstream application
/// lifecycle becomes reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycState {
    Pending,
    Approved,
    Rejected,
}

impl KycState {
    pub fn is_approved(self) -> bool {
        matches!(self, KycState::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KycState::Pending => "PENDING",
            KycState::Approved => "APPROVED",
            KycState::Rejected => "REJECTED",
        }
    }
}

impl core::fmt::Display for KycState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

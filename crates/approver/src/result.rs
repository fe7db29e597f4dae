//! Review outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message returned when no policies exist at all.
pub const NO_POLICIES_MESSAGE: &str = "No CertificateRequestPolicies exist";

/// Message returned when none of the existing policies are bound to the requester.
pub const NO_BOUND_POLICIES_MESSAGE: &str = "No CertificateRequestPolicies bound or applicable";

/// Final state of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Nothing could be decided; the request may be reviewed again later.
    Unprocessed,
    Denied,
    Approved,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unprocessed => "unprocessed",
            Self::Denied => "denied",
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unprocessed" => Ok(Self::Unprocessed),
            "denied" => Ok(Self::Denied),
            "approved" => Ok(Self::Approved),
            other => Err(format!("unknown review status: {other}")),
        }
    }
}

/// Outcome of reviewing one request, with a human readable justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub status: ReviewStatus,
    pub message: String,
}

impl ReviewResult {
    pub fn unprocessed(message: impl Into<String>) -> Self {
        Self {
            status: ReviewStatus::Unprocessed,
            message: message.into(),
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            status: ReviewStatus::Denied,
            message: message.into(),
        }
    }

    pub fn approved(message: impl Into<String>) -> Self {
        Self {
            status: ReviewStatus::Approved,
            message: message.into(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == ReviewStatus::Approved
    }
}

impl fmt::Display for ReviewResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

//! Review history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for a review record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The outcome of one review, as kept in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: RecordId,
    pub timestamp: DateTime<Utc>,
    /// `namespace/name` of the reviewed request.
    pub request: String,
    pub username: String,
    /// `approved`, `denied` or `unprocessed`.
    pub status: String,
    pub message: String,
}

impl ReviewRecord {
    pub fn new(
        request: impl Into<String>,
        username: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new(),
            timestamp: Utc::now(),
            request: request.into(),
            username: username.into(),
            status: status.into(),
            message: message.into(),
        }
    }
}

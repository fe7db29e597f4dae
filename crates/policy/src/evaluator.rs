//! Evaluator verdicts and the evaluator contract.

use crate::{CertificateRequest, CertificateRequestPolicy, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An evaluator's opinion on one policy/request pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Deny,
}

/// Result of a single evaluator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    pub verdict: Verdict,

    /// Optional explanation; empty when the evaluator has nothing to say.
    #[serde(default)]
    pub message: String,
}

impl EvaluationResponse {
    pub fn approve() -> Self {
        Self {
            verdict: Verdict::Approve,
            message: String::new(),
        }
    }

    pub fn deny(message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Deny,
            message: message.into(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn is_denied(&self) -> bool {
        self.verdict == Verdict::Deny
    }
}

/// A pluggable check run against every policy bound to a requester.
///
/// Implementations must be safe to share between concurrent reviews.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Name used in logs and error reports.
    fn name(&self) -> &str;

    /// Decide whether `request` satisfies `policy`.
    async fn evaluate(
        &self,
        policy: &CertificateRequestPolicy,
        request: &CertificateRequest,
    ) -> Result<EvaluationResponse>;
}

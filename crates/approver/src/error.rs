use policy::Scope;
use thiserror::Error;

/// Review errors.
///
/// Every collaborator failure ends the review it happened in; nothing is
/// retried here. A review that finds no policies is not an error, see
/// [`ReviewStatus::Unprocessed`](crate::ReviewStatus::Unprocessed).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The policy store could not list policies.
    #[error("failed to list policies: {0}")]
    Store(#[source] policy::Error),

    /// A permission check failed while binding policies to the requester.
    #[error("failed to determine bound policies: permission check for {policy:?} in {scope} failed: {source}")]
    Binding {
        policy: String,
        scope: Scope,
        #[source]
        source: policy::Error,
    },

    /// An evaluator failed while evaluating a bound policy.
    #[error("evaluator {evaluator:?} failed on policy {policy:?}: {source}")]
    Evaluation {
        policy: String,
        evaluator: String,
        #[source]
        source: policy::Error,
    },

    /// The review was cancelled before it produced a verdict.
    #[error("review cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

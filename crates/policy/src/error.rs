//! Policy error types.

use thiserror::Error;

/// Boxed error used to carry failures from collaborator backends.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Policy errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A policy or request document is invalid.
    #[error("invalid document: {0}")]
    Invalid(String),

    /// Failed to parse a policy or request document.
    #[error("failed to parse document: {0}")]
    Parse(String),

    /// An I/O error occurred while reading a document.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A collaborator (store, oracle, evaluator) failed.
    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Wrap a collaborator failure with a short description of what was attempted.
    pub fn backend(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            context: context.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

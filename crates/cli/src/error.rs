//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The database file does not exist.
    ///
    /// This typically means no policy has been applied yet.
    #[error("database not found at {path}. Run 'approver policy apply' first")]
    DatabaseNotFound { path: PathBuf },

    /// No policy exists with the given name.
    #[error("no policy named '{name}'")]
    PolicyNotFound { name: String },

    /// An evaluator process could not be started.
    #[error("failed to start evaluator '{name}': {source}")]
    EvaluatorStart {
        name: String,
        #[source]
        source: plugin::Error,
    },

    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The review itself failed.
    #[error(transparent)]
    Review(#[from] approver::Error),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// A policy or request document could not be loaded.
    #[error(transparent)]
    Policy(#[from] policy::Error),

    /// The RBAC rules could not be loaded.
    #[error(transparent)]
    Rbac(#[from] rbac::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! RBAC error types.

use thiserror::Error;

/// RBAC errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The rules reference something that does not exist or conflict.
    #[error("invalid rbac rules: {0}")]
    Invalid(String),

    /// Failed to parse a rules file.
    #[error("failed to parse rbac rules: {0}")]
    Parse(String),

    /// An I/O error occurred while reading rules.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

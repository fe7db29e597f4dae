//! Evaluator plugin error types.

use crate::protocol::JsonRpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to spawn evaluator: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("evaluator I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("evaluator not initialized")]
    NotInitialized,

    #[error("evaluator exited unexpectedly")]
    Exited,

    #[error("timeout waiting for response")]
    Timeout,

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] JsonRpcError),

    #[error("output too large: {size} bytes (max {max})")]
    OutputTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

//! Out-of-process evaluators.
//!
//! An evaluator plugin is any executable that speaks line-delimited JSON-RPC
//! 2.0 on stdin/stdout. The approver starts it, performs an `initialize`
//! handshake, then sends one `evaluate` request per policy/request pair:
//!
//! ```text
//! -> {"jsonrpc":"2.0","id":2,"method":"evaluate","params":{"policy":{..},"request":{..}}}
//! <- {"jsonrpc":"2.0","id":2,"result":{"verdict":"deny","message":"dns name not allowed"}}
//! ```
//!
//! # Example
//!
//! ```no_run
//! use plugin::{EvaluatorConfig, EvaluatorProcess};
//!
//! # async fn example() -> plugin::Result<()> {
//! let config = EvaluatorConfig::new("allowed-dns-names", "/usr/local/bin/dns-evaluator");
//! let evaluator = EvaluatorProcess::start(config).await?;
//!
//! // register `evaluator` with a review engine, then eventually:
//! evaluator.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod process;
mod protocol;

pub use error::{Error, Result};
pub use process::{DEFAULT_TIMEOUT, EvaluatorConfig, EvaluatorProcess, MAX_OUTPUT_SIZE};
pub use protocol::{
    ClientInfo, EvaluateParams, EvaluatorInfo, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION, RequestId,
};

//! Evaluator process management (spawn, communicate, lifecycle).

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use policy::{CertificateRequest, CertificateRequestPolicy, EvaluationResponse, Evaluator};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::{
    EvaluateParams, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    RequestId,
};

/// Default timeout for a single exchange with an evaluator.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum response size (1MB).
pub const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Configuration for an evaluator process.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EvaluatorConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

struct Pipes {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Partial reply line, kept when an exchange is dropped mid-read.
    pending: Vec<u8>,
}

impl Pipes {
    /// Send a request and read replies until one is not left over from an
    /// earlier, abandoned request.
    async fn exchange(&mut self, request_json: &str, id: &RequestId) -> Result<JsonRpcResponse> {
        write_line(&mut self.stdin, request_json).await?;

        loop {
            let response = self.read_response().await?;
            if is_stale(&response.id, id) {
                debug!(stale = ?response.id, expected = ?id, "skipping reply to abandoned request");
                continue;
            }
            return Ok(response);
        }
    }

    async fn read_response(&mut self) -> Result<JsonRpcResponse> {
        let bytes_read = self.stdout.read_until(b'\n', &mut self.pending).await?;
        let line = std::mem::take(&mut self.pending);
        if bytes_read == 0 {
            return Err(Error::Exited);
        }

        if line.len() > MAX_OUTPUT_SIZE {
            return Err(Error::OutputTooLarge {
                size: line.len(),
                max: MAX_OUTPUT_SIZE,
            });
        }

        Ok(serde_json::from_slice(&line)?)
    }
}

/// Request ids only increase, so a lower numeric id answers an earlier call.
fn is_stale(got: &RequestId, expected: &RequestId) -> bool {
    matches!((got, expected), (RequestId::Number(got), RequestId::Number(expected)) if got < expected)
}

/// Handle to a running evaluator process.
///
/// Requests are exchanged one at a time; concurrent callers queue on the
/// pipes.
pub struct EvaluatorProcess {
    config: EvaluatorConfig,
    timeout: Duration,
    process: Mutex<Child>,
    pipes: Mutex<Pipes>,
    next_id: AtomicI64,
    initialized: AtomicBool,
}

impl EvaluatorProcess {
    /// Spawn an evaluator process. Call [`initialize`](Self::initialize) before evaluating.
    pub async fn spawn(config: EvaluatorConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut process = cmd.spawn().map_err(Error::Spawn)?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn(std::io::Error::other("failed to capture stdin")))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Spawn(std::io::Error::other("failed to capture stdout")))?;

        Ok(Self {
            timeout: config.timeout(),
            config,
            process: Mutex::new(process),
            pipes: Mutex::new(Pipes {
                stdin,
                stdout: BufReader::new(stdout),
                pending: Vec::new(),
            }),
            next_id: AtomicI64::new(1),
            initialized: AtomicBool::new(false),
        })
    }

    /// Spawn and initialize in one step.
    pub async fn start(config: EvaluatorConfig) -> Result<Self> {
        let process = Self::spawn(config).await?;
        process.initialize().await?;
        Ok(process)
    }

    /// Get the evaluator name from its configuration.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Perform the handshake (must be called before evaluating).
    pub async fn initialize(&self) -> Result<InitializeResult> {
        let result: InitializeResult = self
            .request("initialize", InitializeParams::default())
            .await?;
        self.initialized.store(true, Ordering::SeqCst);

        info!(
            evaluator = %self.config.name,
            reported_name = %result.evaluator_info.name,
            protocol = %result.protocol_version,
            "evaluator process initialized"
        );
        Ok(result)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Ask the process to evaluate a request against a policy.
    pub async fn call_evaluate(
        &self,
        policy: &CertificateRequestPolicy,
        request: &CertificateRequest,
    ) -> Result<EvaluationResponse> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }

        self.request("evaluate", EvaluateParams { policy, request })
            .await
    }

    /// Shut the process down.
    pub async fn shutdown(&self) -> Result<()> {
        // Best effort: the process may already be gone.
        let _ = self.notify("shutdown").await;

        let mut process = self.process.lock().await;
        let _ = process.kill().await;
        self.initialized.store(false, Ordering::SeqCst);

        Ok(())
    }

    // --- Internal methods ---

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let id = self.next_request_id();
        let request = JsonRpcRequest::new(id.clone(), method).with_params(params)?;
        let request_json = serde_json::to_string(&request)?;

        debug!(evaluator = %self.config.name, method, ?id, "sending request");

        let mut pipes = self.pipes.lock().await;
        let response = timeout(self.timeout, pipes.exchange(&request_json, &id))
            .await
            .map_err(|_| Error::Timeout)??;

        if response.id != id {
            return Err(Error::InvalidResponse(format!(
                "response ID mismatch: expected {id:?}, got {:?}",
                response.id
            )));
        }

        let result_value = response.into_result()?;
        let result: R = serde_json::from_value(result_value)?;

        Ok(result)
    }

    async fn notify(&self, method: &str) -> Result<()> {
        // Notifications have no ID
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
        });
        let notification_json = serde_json::to_string(&notification)?;

        let mut pipes = self.pipes.lock().await;
        write_line(&mut pipes.stdin, &notification_json).await
    }
}

async fn write_line(stdin: &mut ChildStdin, line: &str) -> Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await?;
    Ok(())
}

#[async_trait]
impl Evaluator for EvaluatorProcess {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn evaluate(
        &self,
        policy: &CertificateRequestPolicy,
        request: &CertificateRequest,
    ) -> policy::Result<EvaluationResponse> {
        self.call_evaluate(policy, request).await.map_err(|e| {
            policy::Error::backend(format!("evaluator process {:?}", self.config.name), e)
        })
    }
}

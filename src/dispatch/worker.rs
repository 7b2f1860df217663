//! Primary transport — short-lived worker subprocess speaking
//! newline-delimited JSON over stdio.
//!
//! One request per spawn: write a single correlation-id-tagged request line,
//! close stdin, collect stdout until exit, and select the response line
//! whose id matches. Everything that can go wrong here — missing binary,
//! non-zero exit, timeout, no matching response, an error payload — is a
//! `PrimaryTransport` failure, which the dispatcher treats as a normal
//! fallback trigger rather than an error to surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::models::{CommandResult, CredentialMap};

pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct WorkerRequest<'a> {
    id: &'a str,
    tool: &'a str,
    args: &'a Value,
    credentials: &'a CredentialMap,
}

#[derive(Deserialize)]
struct WorkerResponse {
    id: String,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

pub struct WorkerTransport {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl WorkerTransport {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    /// Extra arguments passed to the worker binary on every spawn.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub async fn call(
        &self,
        tool: &str,
        args: &Value,
        credentials: &CredentialMap,
    ) -> Result<CommandResult, GatewayError> {
        let id = Uuid::new_v4().to_string();
        self.call_with_id(&id, tool, args, credentials).await
    }

    async fn call_with_id(
        &self,
        id: &str,
        tool: &str,
        args: &Value,
        credentials: &CredentialMap,
    ) -> Result<CommandResult, GatewayError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                GatewayError::PrimaryTransport(format!(
                    "worker binary not present: {}",
                    self.program.display()
                ))
            } else {
                GatewayError::PrimaryTransport(format!("worker spawn failed: {}", err))
            }
        })?;

        let request = WorkerRequest {
            id,
            tool,
            args,
            credentials,
        };
        let mut line = serde_json::to_vec(&request)
            .map_err(|e| GatewayError::PrimaryTransport(format!("request encode failed: {}", e)))?;
        line.push(b'\n');

        if let Some(mut stdin) = child.stdin.take() {
            // A worker that exits before reading shows up as a missing
            // response below, not as a write error.
            let _ = stdin.write_all(&line).await;
            let _ = stdin.shutdown().await;
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                // kill_on_drop reaps the child when the wait future is dropped.
                GatewayError::PrimaryTransport(format!(
                    "worker timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|err| GatewayError::PrimaryTransport(format!("worker wait failed: {}", err)))?;

        if !output.status.success() {
            return Err(GatewayError::PrimaryTransport(format!(
                "worker exited with {}",
                output.status
            )));
        }

        for raw in output.stdout.split(|b| *b == b'\n') {
            if raw.is_empty() {
                continue;
            }
            // Workers may interleave log lines; skip anything unparseable.
            let Ok(response) = serde_json::from_slice::<WorkerResponse>(raw) else {
                continue;
            };
            if response.id != id {
                continue;
            }
            if let Some(error) = response.error {
                return Err(GatewayError::PrimaryTransport(format!(
                    "worker error: {}",
                    error
                )));
            }
            return Ok(CommandResult::ok(response.result.unwrap_or(Value::Null)));
        }

        Err(GatewayError::PrimaryTransport(
            "no response matching request id".into(),
        ))
    }
}

// ── Tests ──────────────────────────────────────────────────────

//! Command dispatch — primary worker transport with direct-API fallback.
//!
//! The worker subprocess offers richer vendor-tool coverage per call but is
//! not present in every deployment; the direct HTTP path is the
//! always-available, narrower guarantee. Primary failures are expected and
//! handled locally — only when both paths are exhausted does the caller see
//! a failure, and even then as a `CommandResult`, never a raised error.

pub mod worker;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::errors::GatewayError;
use crate::models::{CommandResult, CredentialMap};

pub use worker::{WorkerTransport, DEFAULT_WORKER_TIMEOUT};

/// Secondary transport: the equivalent operation issued directly against
/// the vendor's documented HTTP API.
///
/// Implementations return `Ok` with the normalized result, or
/// `Err(SecondaryTransport)` — including for tools they have no direct
/// handler for.
#[async_trait]
pub trait RestFallback: Send + Sync {
    async fn call(
        &self,
        tool: &str,
        args: &Value,
        credentials: &CredentialMap,
    ) -> Result<CommandResult, GatewayError>;
}

pub struct Dispatcher {
    primary: WorkerTransport,
    fallback: Option<Arc<dyn RestFallback>>,
}

impl Dispatcher {
    pub fn new(primary: WorkerTransport, fallback: Option<Arc<dyn RestFallback>>) -> Self {
        Self { primary, fallback }
    }

    /// Run one logical command through the fallback chain.
    pub async fn dispatch(
        &self,
        tool: &str,
        args: &Value,
        credentials: &CredentialMap,
    ) -> CommandResult {
        let primary_err = match self.primary.call(tool, args, credentials).await {
            Ok(result) => return result,
            Err(err) => err,
        };
        tracing::debug!(tool, error = %primary_err, "primary transport failed, trying direct API");

        let Some(fallback) = &self.fallback else {
            return CommandResult::fail_with_error(
                format!("command '{}' failed: no fallback transport", tool),
                primary_err.to_string(),
            );
        };

        match fallback.call(tool, args, credentials).await {
            Ok(result) => result,
            Err(secondary_err) => {
                tracing::warn!(
                    tool,
                    primary = %primary_err,
                    secondary = %secondary_err,
                    "command failed on both transports"
                );
                CommandResult::fail_with_error(
                    format!("command '{}' failed: {}", tool, secondary_err),
                    primary_err.to_string(),
                )
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

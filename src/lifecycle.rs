//! Per-service client lifecycle — lazy, idempotent initialization.
//!
//! A [`LifecycleManager`] wraps one vendor's capability surface
//! ([`ServiceSpec`]) and owns the in-memory runtime state for that client
//! instance. State is never persisted and never shared across instances.
//!
//! Concurrency contract: `initialize()` collapses concurrent callers
//! without queueing. A second caller that arrives while the first is still
//! initializing returns immediately, so callers that need strict ordering
//! must re-check state (e.g. via `credentials()`) before proceeding. The
//! side-effecting init steps can never run twice concurrently: only the
//! caller that wins the transition into `initializing` executes them.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::errors::GatewayError;
use crate::models::CredentialMap;
use crate::store::ConnectionStore;

/// Environment key checked first when resolving the optional helper client
/// used for AI-assisted fallback summaries.
const HELPER_API_KEY_ENV: &str = "HUBLINK_OPENAI_API_KEY";
/// Stored connection consulted when the environment key is absent.
const HELPER_SERVICE: &str = "openai";
const HELPER_CREDENTIAL_FIELD: &str = "api_key";

/// Capability surface a vendor client supplies to the gateway core.
/// Composition, not subclassing: the lifecycle machinery is fixed and the
/// vendor plugs in these three points.
#[async_trait]
pub trait ServiceSpec: Send + Sync {
    /// Canonical lowercase vendor key.
    fn service_type(&self) -> &str;

    /// Logical command names this client can dispatch.
    fn supported_tools(&self) -> &[&str];

    /// Extract and validate the vendor-specific fields from a stored
    /// credential blob.
    fn extract_credentials(&self, raw: &CredentialMap) -> Result<CredentialMap, GatewayError>;

    /// Optional post-initialization hook, e.g. a lightweight connectivity
    /// probe. Failures abort initialization.
    async fn post_init_probe(&self, _credentials: &CredentialMap) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[derive(Default)]
struct ClientState {
    initialized: bool,
    initializing: bool,
    credentials: CredentialMap,
    helper_key: Option<String>,
}

pub struct LifecycleManager {
    spec: Arc<dyn ServiceSpec>,
    store: ConnectionStore,
    state: Mutex<ClientState>,
}

impl LifecycleManager {
    pub fn new(spec: Arc<dyn ServiceSpec>, store: ConnectionStore) -> Self {
        Self {
            spec,
            store,
            state: Mutex::new(ClientState::default()),
        }
    }

    pub fn service_type(&self) -> &str {
        self.spec.service_type()
    }

    pub fn supports(&self, tool: &str) -> bool {
        self.spec.supported_tools().contains(&tool)
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.initialized
    }

    /// Resolved credentials. Errors with `NotConnected` until a successful
    /// `initialize()` has completed.
    pub async fn credentials(&self) -> Result<CredentialMap, GatewayError> {
        let state = self.state.lock().await;
        if !state.initialized {
            return Err(GatewayError::NotConnected {
                service: self.spec.service_type().to_string(),
            });
        }
        Ok(state.credentials.clone())
    }

    /// Helper client key, if one was resolved during initialization.
    pub async fn helper_key(&self) -> Option<String> {
        self.state.lock().await.helper_key.clone()
    }

    /// Idempotent lazy initialization.
    ///
    /// Returns immediately when already initialized or when another caller
    /// is mid-initialization. A failed attempt is not cached: the state
    /// drops back to uninitialized and a later call retries from scratch.
    pub async fn initialize(&self) -> Result<(), GatewayError> {
        {
            let mut state = self.state.lock().await;
            if state.initialized || state.initializing {
                return Ok(());
            }
            state.initializing = true;
        }

        let outcome = self.run_init().await;

        let mut state = self.state.lock().await;
        state.initializing = false;
        match outcome {
            Ok((credentials, helper_key)) => {
                state.credentials = credentials;
                state.helper_key = helper_key;
                state.initialized = true;
                tracing::info!(service = %self.spec.service_type(), "client initialized");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    service = %self.spec.service_type(),
                    error = %err,
                    "client initialization failed"
                );
                Err(err)
            }
        }
    }

    async fn run_init(&self) -> Result<(CredentialMap, Option<String>), GatewayError> {
        let service = self.spec.service_type();

        let connection = self
            .store
            .get(service)
            .await?
            .ok_or_else(|| GatewayError::NotConnected {
                service: service.to_string(),
            })?;
        if !connection.is_connected {
            return Err(GatewayError::NotConnected {
                service: service.to_string(),
            });
        }

        let credentials = self.spec.extract_credentials(&connection.credentials)?;

        let helper_key = self.resolve_helper_key().await;

        self.spec.post_init_probe(&credentials).await?;

        Ok((credentials, helper_key))
    }

    /// Environment first, then the helper service's stored connection.
    /// Absence is non-fatal.
    async fn resolve_helper_key(&self) -> Option<String> {
        match std::env::var(HELPER_API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => return Some(key),
            _ => {}
        }
        match self.store.get(HELPER_SERVICE).await {
            Ok(Some(conn)) => conn.credentials.get(HELPER_CREDENTIAL_FIELD).cloned(),
            Ok(None) => None,
            Err(err) => {
                tracing::debug!(error = %err, "helper connection lookup failed");
                None
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

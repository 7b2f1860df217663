//! Mock routing — transparent substitution of deterministic canned data.
//!
//! The router is explicit injected state, not an ambient global: tests and
//! the admin surface get their own handle and can toggle it per run. A
//! command is mocked only when the process-wide flag is on AND the
//! service's stored connection is marked `is_mock` — so flipping the flag
//! never leaks canned data for a service holding real credentials unless
//! reconciliation marked it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::GatewayError;
use crate::models::{CommandResult, ConnectionPatch, CredentialMap, NewConnection};
use crate::store::ConnectionStore;

const MOCK_STATUSES: [&str; 4] = ["active", "pending", "complete", "archived"];
const MOCK_NAMES: [&str; 6] = ["aurora", "basalt", "cedar", "delta", "ember", "flint"];

pub struct MockRouter {
    enabled: AtomicBool,
    store: ConnectionStore,
    /// Canonical keys of every service the deployment knows about, used by
    /// reconciliation when the flag flips.
    services: Vec<String>,
}

impl MockRouter {
    pub fn new(store: ConnectionStore, services: Vec<String>) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            store,
            services,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub async fn should_use_mock(&self, service_type: &str) -> bool {
        if !self.enabled() {
            return false;
        }
        match self.store.get(service_type).await {
            Ok(Some(conn)) => conn.is_mock,
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(service = service_type, error = %err, "mock check store lookup failed");
                false
            }
        }
    }

    /// Wrap one command invocation. When mocked, synthesizes a result
    /// deterministic in `(service_type, tool, args)` without touching
    /// network or lifecycle state; otherwise awaits the real path
    /// unchanged.
    pub async fn run<F>(
        &self,
        service_type: &str,
        tool: &str,
        args: &Value,
        real: F,
    ) -> CommandResult
    where
        F: Future<Output = CommandResult>,
    {
        if self.should_use_mock(service_type).await {
            tracing::debug!(service = service_type, tool, "serving mock data");
            return synthesize(service_type, tool, args);
        }
        real.await
    }

    /// Flip mock mode and reconcile stored connections.
    ///
    /// Enabling ensures every known service has a connected, mocked
    /// connection with synthetic credentials. Disabling flips every mocked
    /// connection back to disconnected/unmocked; its credentials blob is
    /// left alone (the toggle-only update path guarantees that).
    pub async fn set_enabled(&self, enabled: bool) -> Result<(), GatewayError> {
        self.enabled.store(enabled, Ordering::Release);
        tracing::info!(enabled, "mock mode toggled");

        if enabled {
            for service in &self.services {
                match self.store.get(service).await? {
                    Some(conn) => {
                        self.store
                            .update(
                                conn.id,
                                ConnectionPatch {
                                    is_connected: Some(true),
                                    is_mock: Some(true),
                                    credentials: Some(synthetic_credentials(service)),
                                    ..ConnectionPatch::default()
                                },
                            )
                            .await?;
                    }
                    None => {
                        self.store
                            .create(NewConnection {
                                name: service.clone(),
                                service_type: service.clone(),
                                is_connected: true,
                                is_mock: true,
                                credentials: synthetic_credentials(service),
                            })
                            .await?;
                    }
                }
            }
        } else {
            for conn in self.store.get_all().await? {
                if !conn.is_mock {
                    continue;
                }
                self.store
                    .update(
                        conn.id,
                        ConnectionPatch {
                            is_connected: Some(false),
                            is_mock: Some(false),
                            ..ConnectionPatch::default()
                        },
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

/// First positional element for array args, first value (key order) for
/// object args, the value itself otherwise.
fn first_arg(args: &Value) -> Value {
    match args {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        Value::Object(map) => map.values().next().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    }
}

fn synthetic_credentials(service: &str) -> CredentialMap {
    let mut credentials = CredentialMap::new();
    credentials.insert("token".into(), format!("mock-{}", service));
    credentials.insert("api_key".into(), format!("mock-{}", service));
    credentials
}

/// Deterministic canned result, keyed by `(service, tool, first argument)`:
/// the same call always yields the same payload, and calls that differ only
/// in trailing options share one.
pub fn synthesize(service_type: &str, tool: &str, args: &Value) -> CommandResult {
    let mut hasher = Sha256::new();
    hasher.update(service_type.as_bytes());
    hasher.update([0x1f]);
    hasher.update(tool.as_bytes());
    hasher.update([0x1f]);
    hasher.update(first_arg(args).to_string().as_bytes());
    let seed: [u8; 32] = hasher.finalize().into();
    let mut rng = StdRng::from_seed(seed);

    let count = rng.gen_range(1..=3);
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "id": rng.gen_range(10_000..100_000),
                "name": format!("{}-{}", MOCK_NAMES[rng.gen_range(0..MOCK_NAMES.len())], i),
                "status": MOCK_STATUSES[rng.gen_range(0..MOCK_STATUSES.len())],
            })
        })
        .collect();

    CommandResult::ok_with_message(
        json!({
            "service": service_type,
            "tool": tool,
            "items": items,
        }),
        "mock data",
    )
}

// ── Tests ──────────────────────────────────────────────────────

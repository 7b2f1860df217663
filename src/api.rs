//! Thin admin surface over the gateway core.
//!
//! The full product route table lives with the chat frontend; this exposes
//! only what operators and the route layer need from the core: health, the
//! connection inventory (credentials redacted), the mock-mode toggle, and
//! a dispatch endpoint returning the `CommandResult` contract unmodified.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::clients::GithubClient;
use crate::errors::GatewayError;
use crate::mock::MockRouter;
use crate::models::CommandResult;
use crate::store::ConnectionStore;

/// Shared application state passed to handlers.
pub struct AppState {
    pub store: ConnectionStore,
    pub mock: Arc<MockRouter>,
    pub github: Arc<GithubClient>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/connections", get(list_connections).post(create_connection))
        .route("/v1/connections/:id", axum::routing::patch(update_connection))
        .route("/v1/mock-mode", get(get_mock_mode).put(set_mock_mode))
        .route("/v1/dispatch/:service/:tool", post(dispatch))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Connection inventory entry with credentials reduced to key names.
#[derive(Debug, Serialize)]
struct ConnectionSummary {
    id: Uuid,
    name: String,
    service_type: String,
    is_connected: bool,
    is_mock: bool,
    credential_keys: Vec<String>,
    last_connected: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

async fn list_connections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ConnectionSummary>>, GatewayError> {
    let connections = state.store.get_all().await?;
    Ok(Json(connections.into_iter().map(summarize).collect()))
}

fn summarize(c: crate::models::Connection) -> ConnectionSummary {
    let mut credential_keys: Vec<String> = c.credentials.keys().cloned().collect();
    credential_keys.sort();
    ConnectionSummary {
        id: c.id,
        name: c.name,
        service_type: c.service_type,
        is_connected: c.is_connected,
        is_mock: c.is_mock,
        credential_keys,
        last_connected: c.last_connected,
        created_at: c.created_at,
    }
}

async fn create_connection(
    State(state): State<Arc<AppState>>,
    Json(new): Json<crate::models::NewConnection>,
) -> Result<Json<ConnectionSummary>, GatewayError> {
    let created = state.store.create(new).await?;
    Ok(Json(summarize(created)))
}

/// Updates go through the credential store's safe-update path, never a raw
/// row write.
async fn update_connection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(patch): Json<crate::models::ConnectionPatch>,
) -> Result<Json<ConnectionSummary>, GatewayError> {
    let updated = state.store.update(id, patch).await?;
    Ok(Json(summarize(updated)))
}

#[derive(Debug, Deserialize)]
struct MockModeBody {
    enabled: bool,
}

async fn get_mock_mode(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "enabled": state.mock.enabled() }))
}

async fn set_mock_mode(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MockModeBody>,
) -> Result<Json<Value>, GatewayError> {
    state.mock.set_enabled(body.enabled).await?;
    Ok(Json(json!({ "enabled": body.enabled })))
}

async fn dispatch(
    State(state): State<Arc<AppState>>,
    Path((service, tool)): Path<(String, String)>,
    Json(args): Json<Value>,
) -> Json<CommandResult> {
    let result = match service.as_str() {
        "github" => state.github.call(&tool, args).await,
        other => CommandResult::fail(format!("unknown service '{}'", other)),
    };
    Json(result)
}

// ── Tests ──────────────────────────────────────────────────────

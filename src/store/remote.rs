//! Remote connection backend — HTTP JSON table API.
//!
//! Speaks a minimal row-oriented REST surface:
//! `GET/POST {base}/api/tables/connections/rows`, `GET/PATCH .../rows/{id}`,
//! and `POST {base}/api/tables` for schema provisioning. Table-not-found
//! responses trigger one-time lazy provisioning followed by a single retry
//! of the original operation.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::StoreBackend;
use crate::errors::GatewayError;
use crate::models::{Connection, ConnectionPatch, NewConnection};

const TABLE: &str = "connections";

pub struct RemoteStore {
    http: Client,
    base_url: String,
    token: Option<String>,
    provisioned: AtomicBool,
    /// Serializes concurrent provisioning attempts.
    provision_lock: Mutex<()>,
}

#[derive(Debug)]
enum RemoteError {
    /// Table-not-found class response; recoverable via provisioning.
    MissingTable(String),
    Request(String),
    Status(u16, String),
    Decode(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::MissingTable(body) => write!(f, "table missing: {}", body),
            RemoteError::Request(e) => write!(f, "request failed: {}", e),
            RemoteError::Status(code, body) => write!(f, "store returned {}: {}", code, body),
            RemoteError::Decode(e) => write!(f, "invalid store response: {}", e),
        }
    }
}

#[derive(Deserialize)]
struct RowsEnvelope {
    rows: Vec<Connection>,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            provisioned: AtomicBool::new(false),
            provision_lock: Mutex::new(()),
        }
    }

    fn rows_url(&self) -> String {
        format!("{}/api/tables/{}/rows", self.base_url, TABLE)
    }

    fn row_url(&self, id: Uuid) -> String {
        format!("{}/api/tables/{}/rows/{}", self.base_url, TABLE, id)
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> Result<(StatusCode, String), RemoteError> {
        let mut req = self.http.request(method, url);
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RemoteError::Request(e.to_string()))?;
        Ok((status, text))
    }

    /// Classify a non-success response. Only a 404 whose body reads like a
    /// table-level "does not exist" is treated as missing-table
    /// (provisionable); a row-level 404 that merely names the table is the
    /// caller's concern.
    fn classify(status: StatusCode, body: String) -> RemoteError {
        if status == StatusCode::NOT_FOUND && is_missing_table(&body) {
            RemoteError::MissingTable(body)
        } else {
            RemoteError::Status(status.as_u16(), truncate(&body))
        }
    }

    /// Create the connections table. Idempotent: an already-exists conflict
    /// counts as success.
    async fn provision(&self) -> Result<(), RemoteError> {
        let _guard = self.provision_lock.lock().await;
        if self.provisioned.load(Ordering::Acquire) {
            return Ok(());
        }

        tracing::info!(table = TABLE, "provisioning remote store table");
        let schema = json!({
            "name": TABLE,
            "columns": [
                { "name": "id", "type": "uuid", "primary": true },
                { "name": "name", "type": "text" },
                { "name": "service_type", "type": "text" },
                { "name": "is_connected", "type": "boolean" },
                { "name": "is_mock", "type": "boolean" },
                { "name": "credentials", "type": "json" },
                { "name": "last_connected", "type": "timestamp" },
                { "name": "created_at", "type": "timestamp" },
            ],
        });
        let url = format!("{}/api/tables", self.base_url);
        let (status, body) = self.send(Method::POST, url, Some(&schema)).await?;
        if !status.is_success() && status != StatusCode::CONFLICT {
            return Err(RemoteError::Status(status.as_u16(), truncate(&body)));
        }

        self.provisioned.store(true, Ordering::Release);
        Ok(())
    }

    async fn try_list(&self) -> Result<Vec<Connection>, RemoteError> {
        let (status, body) = self.send(Method::GET, self.rows_url(), None).await?;
        if !status.is_success() {
            return Err(Self::classify(status, body));
        }
        let envelope: RowsEnvelope =
            serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(envelope.rows)
    }

    async fn try_get_by_id(&self, id: Uuid) -> Result<Option<Connection>, RemoteError> {
        let (status, body) = self.send(Method::GET, self.row_url(id), None).await?;
        if status == StatusCode::NOT_FOUND && !is_missing_table(&body) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::classify(status, body));
        }
        let row: Connection =
            serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Some(row))
    }

    async fn try_insert(&self, row: &Connection) -> Result<Connection, RemoteError> {
        let value = serde_json::to_value(row).map_err(|e| RemoteError::Decode(e.to_string()))?;
        let (status, body) = self
            .send(Method::POST, self.rows_url(), Some(&value))
            .await?;
        if !status.is_success() {
            return Err(Self::classify(status, body));
        }
        // Prefer the server's echo of the row; fall back to what we sent.
        Ok(serde_json::from_str::<Connection>(&body).unwrap_or_else(|_| row.clone()))
    }

    async fn try_patch(&self, id: Uuid, patch: &ConnectionPatch) -> Result<(), RemoteError> {
        let value = serde_json::to_value(patch).map_err(|e| RemoteError::Decode(e.to_string()))?;
        let (status, body) = self
            .send(Method::PATCH, self.row_url(id), Some(&value))
            .await?;
        if !status.is_success() {
            return Err(Self::classify(status, body));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreBackend for RemoteStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Connection>, GatewayError> {
        let first = self.try_get_by_id(id).await;
        let result = match first {
            Err(RemoteError::MissingTable(_)) => {
                self.provision().await.map_err(read_err)?;
                self.try_get_by_id(id).await
            }
            other => other,
        };
        result.map_err(read_err)
    }

    async fn list(&self) -> Result<Vec<Connection>, GatewayError> {
        let first = self.try_list().await;
        let result = match first {
            Err(RemoteError::MissingTable(_)) => {
                self.provision().await.map_err(read_err)?;
                self.try_list().await
            }
            other => other,
        };
        result.map_err(read_err)
    }

    async fn insert(&self, new: NewConnection) -> Result<Connection, GatewayError> {
        let row = Connection {
            id: Uuid::new_v4(),
            name: new.name,
            service_type: new.service_type,
            is_connected: new.is_connected,
            is_mock: new.is_mock,
            credentials: new.credentials,
            last_connected: None,
            created_at: chrono::Utc::now(),
        };
        let first = self.try_insert(&row).await;
        let result = match first {
            Err(RemoteError::MissingTable(_)) => {
                self.provision().await.map_err(write_err)?;
                self.try_insert(&row).await
            }
            other => other,
        };
        result.map_err(write_err)
    }

    async fn apply_patch(&self, id: Uuid, patch: &ConnectionPatch) -> Result<(), GatewayError> {
        let first = self.try_patch(id, patch).await;
        let result = match first {
            Err(RemoteError::MissingTable(_)) => {
                self.provision().await.map_err(write_err)?;
                self.try_patch(id, patch).await
            }
            other => other,
        };
        result.map_err(write_err)
    }
}

fn read_err(err: RemoteError) -> GatewayError {
    GatewayError::Store(anyhow::anyhow!("{}", err))
}

fn write_err(err: RemoteError) -> GatewayError {
    GatewayError::StoreWrite(err.to_string())
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

/// The backend has no structured error codes, so missing-table detection
/// matches its known phrasings. A body like "no row with that id in table
/// connections" must NOT match, or an absent row turns into a pointless
/// provision-and-retry cycle.
fn is_missing_table(body: &str) -> bool {
    let body = body.to_lowercase();
    body.contains("table")
        && (body.contains("does not exist")
            || body.contains("no such table")
            || body.contains("unknown table"))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn row_json(id: Uuid) -> Value {
        json!({
            "id": id,
            "name": "GitHub",
            "service_type": "github",
            "is_connected": true,
            "is_mock": false,
            "credentials": { "token": "abc" },
            "last_connected": null,
            "created_at": "2026-01-05T12:00:00Z",
        })
    }

    #[tokio::test]
    async fn test_list_rows() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/api/tables/connections/rows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rows": [row_json(id)] })))
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), None);
        let rows = store.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].credentials.get("token").map(String::as_str), Some("abc"));
    }

    #[tokio::test]
    async fn test_missing_table_provisions_then_retries_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tables/connections/rows"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string("table 'connections' does not exist"),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/tables"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tables/connections/rows"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rows": [] })))
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), None);
        let rows = store.list().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_row_not_found_is_absent_not_error() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path(format!("/api/tables/connections/rows/{}", id)))
            .respond_with(ResponseTemplate::new(404).set_body_string("row not found"))
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), None);
        assert!(store.get_by_id(id).await.unwrap().is_none());
    }

    // A row-level 404 that happens to name the table is still an absent
    // row, not a missing table: no provisioning, no retry.
    #[tokio::test]
    async fn test_row_not_found_naming_table_does_not_provision() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path(format!("/api/tables/connections/rows/{}", id)))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string("no row with that id in table connections"),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/tables"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), None);
        assert!(store.get_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_failure_is_store_write() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("PATCH"))
            .and(path(format!("/api/tables/connections/rows/{}", id)))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), None);
        let err = store
            .apply_patch(id, &ConnectionPatch::connected(false))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::StoreWrite(_)));
        assert!(err.to_string().contains("disk full"));
    }
}

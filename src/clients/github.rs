//! GitHub client — the representative fallback-chain vendor client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::{Dispatcher, RestFallback, WorkerTransport};
use crate::errors::GatewayError;
use crate::lifecycle::{LifecycleManager, ServiceSpec};
use crate::mock::MockRouter;
use crate::models::{CommandResult, CredentialMap};
use crate::store::ConnectionStore;

pub const SERVICE_TYPE: &str = "github";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const TOOLS: [&str; 3] = ["get_repository", "list_issues", "create_issue"];

pub struct GithubSpec;

#[async_trait]
impl ServiceSpec for GithubSpec {
    fn service_type(&self) -> &str {
        SERVICE_TYPE
    }

    fn supported_tools(&self) -> &[&str] {
        &TOOLS
    }

    fn extract_credentials(&self, raw: &CredentialMap) -> Result<CredentialMap, GatewayError> {
        let token = raw
            .get("token")
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::IncompleteCredentials {
                service: SERVICE_TYPE.into(),
                missing: "token".into(),
            })?;
        let mut out = CredentialMap::new();
        out.insert("token".into(), token.to_string());
        Ok(out)
    }
}

/// Direct calls against the documented GitHub REST API.
pub struct GithubRest {
    http: Client,
    base_url: String,
}

impl GithubRest {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent("hublink-gateway")
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: String, token: &str) -> Result<CommandResult, GatewayError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| GatewayError::SecondaryTransport(format!("github request failed: {}", e)))?;
        Self::into_result(resp).await
    }

    async fn post(
        &self,
        path: String,
        token: &str,
        body: Value,
    ) -> Result<CommandResult, GatewayError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::SecondaryTransport(format!("github request failed: {}", e)))?;
        Self::into_result(resp).await
    }

    async fn into_result(resp: reqwest::Response) -> Result<CommandResult, GatewayError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::SecondaryTransport(format!("github response read: {}", e)))?;
        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(GatewayError::SecondaryTransport(format!(
                "github returned {}: {}",
                status, snippet
            )));
        }
        let data: Value = serde_json::from_str(&body)
            .map_err(|e| GatewayError::SecondaryTransport(format!("github response decode: {}", e)))?;
        Ok(CommandResult::ok(data))
    }
}

fn str_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, GatewayError> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::SecondaryTransport(format!("missing argument '{}'", key)))
}

#[async_trait]
impl RestFallback for GithubRest {
    async fn call(
        &self,
        tool: &str,
        args: &Value,
        credentials: &CredentialMap,
    ) -> Result<CommandResult, GatewayError> {
        let token = credentials
            .get("token")
            .ok_or_else(|| GatewayError::SecondaryTransport("missing token".into()))?;

        match tool {
            "get_repository" => {
                let owner = str_arg(args, "owner")?;
                let repo = str_arg(args, "repo")?;
                self.get(format!("/repos/{}/{}", owner, repo), token).await
            }
            "list_issues" => {
                let owner = str_arg(args, "owner")?;
                let repo = str_arg(args, "repo")?;
                let state = args.get("state").and_then(Value::as_str).unwrap_or("open");
                self.get(
                    format!("/repos/{}/{}/issues?state={}", owner, repo, state),
                    token,
                )
                .await
            }
            "create_issue" => {
                let owner = str_arg(args, "owner")?;
                let repo = str_arg(args, "repo")?;
                let title = str_arg(args, "title")?;
                let body = args.get("body").and_then(Value::as_str).unwrap_or("");
                self.post(
                    format!("/repos/{}/{}/issues", owner, repo),
                    token,
                    json!({ "title": title, "body": body }),
                )
                .await
            }
            other => Err(GatewayError::SecondaryTransport(format!(
                "no direct API handler for tool '{}'",
                other
            ))),
        }
    }
}

/// Mock-aware GitHub entry point: mock router → lifecycle → fallback chain.
pub struct GithubClient {
    lifecycle: LifecycleManager,
    dispatcher: Dispatcher,
    mock: Arc<MockRouter>,
}

impl GithubClient {
    pub fn new(
        store: ConnectionStore,
        mock: Arc<MockRouter>,
        worker: WorkerTransport,
        api_base: impl Into<String>,
    ) -> Self {
        let rest = Arc::new(GithubRest::new(api_base));
        Self {
            lifecycle: LifecycleManager::new(Arc::new(GithubSpec), store),
            dispatcher: Dispatcher::new(worker, Some(rest)),
            mock,
        }
    }

    /// Run one logical command. Never raises: every outcome, including
    /// initialization failures, arrives as a `CommandResult`.
    pub async fn call(&self, tool: &str, args: Value) -> CommandResult {
        self.mock
            .run(SERVICE_TYPE, tool, &args, async {
                if !self.lifecycle.supports(tool) {
                    return CommandResult::fail(format!(
                        "unsupported tool '{}' for {}",
                        tool, SERVICE_TYPE
                    ));
                }
                if let Err(err) = self.lifecycle.initialize().await {
                    return CommandResult::from(err);
                }
                let credentials = match self.lifecycle.credentials().await {
                    Ok(credentials) => credentials,
                    Err(err) => return CommandResult::from(err),
                };
                self.dispatcher.dispatch(tool, &args, &credentials).await
            })
            .await
    }
}

// ── Tests ──────────────────────────────────────────────────────

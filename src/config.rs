use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Base URL of the remote connection store. Unset means the gateway
    /// runs on the in-memory store (mock-only deployments, tests).
    pub store_url: Option<String>,
    pub store_token: Option<String>,
    /// Directory holding worker binaries, one per service:
    /// `hublink-worker-{service}`. Their absence is a normal fallback
    /// trigger, not an error.
    pub worker_dir: PathBuf,
    /// Per-call worker timeout in seconds.
    pub worker_timeout_secs: u64,
    pub github_api_base: String,
}

impl Config {
    pub fn worker_binary(&self, service: &str) -> PathBuf {
        self.worker_dir.join(format!("hublink-worker-{}", service))
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    Ok(Config {
        port: std::env::var("HUBLINK_PORT")
            .unwrap_or_else(|_| "8088".into())
            .parse()
            .unwrap_or(8088),
        store_url: std::env::var("HUBLINK_STORE_URL").ok().filter(|s| !s.is_empty()),
        store_token: std::env::var("HUBLINK_STORE_TOKEN").ok(),
        worker_dir: std::env::var("HUBLINK_WORKER_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./workers")),
        worker_timeout_secs: std::env::var("HUBLINK_WORKER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15),
        github_api_base: std::env::var("HUBLINK_GITHUB_API_BASE")
            .unwrap_or_else(|_| "https://api.github.com".into()),
    })
}

// ── Tests ──────────────────────────────────────────────────────

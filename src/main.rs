use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hublink::api::{self, AppState};
use hublink::cli;
use hublink::clients::github::{GithubClient, DEFAULT_API_BASE, SERVICE_TYPE as GITHUB};
use hublink::config::{self, Config};
use hublink::dispatch::WorkerTransport;
use hublink::mock::MockRouter;
use hublink::store::{ConnectionStore, MemoryStore, RemoteStore, StoreBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "hublink=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    match args.command.unwrap_or(cli::Commands::Serve { port: None }) {
        cli::Commands::Serve { port } => {
            let state = build_state(&cfg);
            let port = port.unwrap_or(cfg.port);
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            tracing::info!(%addr, "hublink gateway listening");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, api::router(state)).await?;
        }
        cli::Commands::Connections => {
            let state = build_state(&cfg);
            for conn in state.store.get_all().await? {
                println!(
                    "{}  {:<20} {:<14} connected={:<5} mock={:<5} keys={:?}",
                    conn.id,
                    conn.name,
                    conn.service_type,
                    conn.is_connected,
                    conn.is_mock,
                    conn.credentials.keys().collect::<Vec<_>>(),
                );
            }
        }
    }

    Ok(())
}

fn build_state(cfg: &Config) -> Arc<AppState> {
    let backend: Arc<dyn StoreBackend> = match &cfg.store_url {
        Some(url) => Arc::new(RemoteStore::new(url.clone(), cfg.store_token.clone())),
        None => {
            tracing::warn!("HUBLINK_STORE_URL not set — using in-memory connection store");
            Arc::new(MemoryStore::new())
        }
    };
    let store = ConnectionStore::new(backend);

    let mock = Arc::new(MockRouter::new(store.clone(), vec![GITHUB.to_string()]));

    let api_base = if cfg.github_api_base.is_empty() {
        DEFAULT_API_BASE.to_string()
    } else {
        cfg.github_api_base.clone()
    };
    let github = Arc::new(GithubClient::new(
        store.clone(),
        mock.clone(),
        WorkerTransport::new(
            cfg.worker_binary(GITHUB),
            Duration::from_secs(cfg.worker_timeout_secs),
        ),
        api_base,
    ));

    Arc::new(AppState { store, mock, github })
}

mod config;
mod metrics;
mod routes;
mod state;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use aps_client::ApsClient;
use config::AppConfig;
use routes::build_router;
use state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("failed to load .env: {err}");
        }
    }
    init_tracing();
    metrics::init();

    let cfg = AppConfig::from_env()?;
    let client = ApsClient::new(cfg.client_config()).context("failed to build aps client")?;
    if let Err(err) = client.ensure_bucket().await {
        warn!(error = %err, bucket = %cfg.bucket(), "bucket check failed; retrying on first use");
    }

    let state = AppState::new(Arc::new(client))
        .with_limits(cfg.max_upload_bytes(), cfg.request_timeout())
        .with_static_dir(&cfg.static_dir);
    let app = build_router(state);

    let addr: SocketAddr = cfg
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address: {}", cfg.bind_addr))?;
    info!(%addr, bucket = %cfg.bucket(), "starting viewer gateway");
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

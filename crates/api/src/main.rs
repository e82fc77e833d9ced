//! HubSync - HubSpot integration service
//!
//! Main entry point for the HTTP server.

use std::sync::Arc;

use anyhow::Context;
use hubsync_api::utils::logging::{init_tracing, LogFormat};
use hubsync_api::{build_router, AppContext, BackgroundJobs};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so RUST_LOG and HUBSYNC_LOG_FORMAT can live there
    let dotenv = dotenvy::dotenv();
    init_tracing(LogFormat::from_env())?;
    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env"),
        Err(e) => tracing::debug!(error = %e, "no .env file loaded"),
    }

    let config = hubsync_infra::config::load().context("failed to load configuration")?;
    let bind_addr = config.server.bind_addr.clone();

    let ctx = Arc::new(AppContext::new(config).await.context("failed to build app context")?);
    let jobs = BackgroundJobs::start(&ctx).await.context("failed to start background jobs")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "hubsync listening");

    let served = axum::serve(listener, build_router(Arc::clone(&ctx)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    jobs.shutdown().await;
    tracing::info!("hubsync stopped");
    served.context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

use anyhow::Context;
use clap::Parser;
use modelchain::backend::OllamaClient;
use modelchain::observability::init_tracing;
use modelchain::session::CancellationRegistry;
use modelchain_server::args::Args;
use modelchain_server::{router, AppState};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let config = args.load_config().context("loading configuration")?;
    let backend = Arc::new(OllamaClient::new(&config.backend)?);
    info!(ollama = %config.backend.base_url, quality_check = config.quality_check, "Starting modelchain server");

    let state = AppState::new(config, backend)?;
    let registry = Arc::clone(state.registry());
    let app = router(state);

    let addr = args.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;
    Ok(())
}

async fn shutdown_signal(registry: Arc<CancellationRegistry>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    let cancelled = registry.cancel_all("server shutting down");
    info!(cancelled, "Shutting down");
}

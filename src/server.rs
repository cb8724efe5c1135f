use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tracing::info;

use crate::config::Config;
use crate::pipeline::MentionPipeline;
use crate::platform::webhook;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub pipeline: MentionPipeline,
}

impl AppState {
    pub fn new(config: Config, pipeline: MentionPipeline) -> Self {
        Self { config, pipeline }
    }
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", get(webhook::verify).post(webhook::receive))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve the webhook until `shutdown` resolves.
pub async fn run<F>(state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = state.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Webhook listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("Webhook server stopped");
    Ok(())
}

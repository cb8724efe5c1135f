mod config;
mod coupon;
mod graph;
mod identity;
mod ledger;
mod pipeline;
mod platform;
mod scheduler;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::graph::GraphClient;
use crate::identity::IdentityResolver;
use crate::ledger::CouponLog;
use crate::pipeline::MentionPipeline;
use crate::platform::history::HistoryFetcher;
use crate::scheduler::Scheduler;
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,couponbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.log_summary();

    let graph = Arc::new(
        GraphClient::new(&config.graph, &config.credentials.access_token)
            .context("Failed to build Graph API client")?,
    );
    let log = CouponLog::open(&config.storage.csv_path).with_context(|| {
        format!(
            "Failed to open coupon log {}",
            config.storage.csv_path.display()
        )
    })?;
    let pipeline = MentionPipeline::new(IdentityResolver::new(graph.clone()), log);
    let fetcher = Arc::new(HistoryFetcher::new(
        graph,
        pipeline.clone(),
        &config.credentials.user_id,
    ));

    if config.intake.fetch_on_startup {
        fetcher.run().await;
    }

    let mut scheduler = match &config.intake.fetch_cron {
        Some(cron_expr) => {
            let scheduler = Scheduler::new().await?;
            scheduler
                .add_periodic_fetch(cron_expr, fetcher.clone())
                .await?;
            scheduler.start().await?;
            Some(scheduler)
        }
        None => None,
    };

    let state = Arc::new(AppState::new(config, pipeline));

    info!("Service is starting...");
    let served = server::run(state, shutdown_signal()).await;

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            error!("{:#}", e);
        }
    }

    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

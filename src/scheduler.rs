use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::platform::history::HistoryFetcher;

/// Background jobs. Dropping it does not stop the jobs; call `shutdown`.
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    pub async fn new() -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        Ok(Self { inner })
    }

    /// Re-run the mentions pull on a cron schedule
    pub async fn add_periodic_fetch(
        &self,
        cron_expr: &str,
        fetcher: Arc<HistoryFetcher>,
    ) -> Result<()> {
        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let fetcher = Arc::clone(&fetcher);
            Box::pin(async move {
                info!("Running scheduled mention fetch");
                fetcher.run().await;
            })
        })
        .with_context(|| format!("Invalid fetch cron expression: {}", cron_expr))?;

        self.inner
            .add(job)
            .await
            .context("Failed to add mention fetch job")?;

        info!("Scheduled mention fetch with cron: {}", cron_expr);
        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        self.inner
            .start()
            .await
            .context("Failed to start scheduler")?;
        info!("Scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .context("Failed to shutdown scheduler")?;
        info!("Scheduler stopped");
        Ok(())
    }
}

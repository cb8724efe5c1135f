use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::graph::{GraphClient, GraphError};
use crate::pipeline::{BatchSummary, MentionOutcome, MentionPipeline};
use crate::platform::Mention;

/// Listing of past mentions of an account
#[async_trait]
pub trait MentionSource: Send + Sync {
    async fn mentions(&self, user_id: &str) -> Result<Vec<Mention>, GraphError>;
}

#[async_trait]
impl MentionSource for GraphClient {
    async fn mentions(&self, user_id: &str) -> Result<Vec<Mention>, GraphError> {
        GraphClient::mentions(self, user_id).await
    }
}

/// Pull-based intake: list mentions once and run each through the pipeline.
pub struct HistoryFetcher {
    source: Arc<dyn MentionSource>,
    pipeline: MentionPipeline,
    user_id: String,
    /// Handled ids from the most recent listing. Held for the whole
    /// fetch, so overlapping runs queue up.
    seen: Mutex<HashSet<String>>,
}

impl HistoryFetcher {
    pub fn new(source: Arc<dyn MentionSource>, pipeline: MentionPipeline, user_id: &str) -> Self {
        Self {
            source,
            pipeline,
            user_id: user_id.to_string(),
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Run one fetch. Returns `None` if the listing itself failed; records
    /// saved by earlier runs are untouched either way.
    pub async fn run(&self) -> Option<BatchSummary> {
        let mut seen = self.seen.lock().await;

        info!("Fetching mentions for account {}", self.user_id);
        let mentions = match self.source.mentions(&self.user_id).await {
            Ok(mentions) => mentions,
            Err(e) => {
                error!("Failed to fetch mentions: {}", e);
                return None;
            }
        };

        let mut summary = BatchSummary::default();
        let mut handled = HashSet::new();
        for mention in &mentions {
            if let Some(id) = &mention.id {
                if seen.contains(id) {
                    handled.insert(id.clone());
                    continue;
                }
            }

            summary.seen += 1;
            match self.pipeline.process(mention).await {
                MentionOutcome::NoCoupon => {}
                MentionOutcome::Saved(record) => {
                    summary.saved += 1;
                    debug!("Mention {:?} recorded for {}", mention.id, record.display_name);
                }
                // Left unmarked so the next run retries it
                MentionOutcome::Skipped(e) => {
                    summary.skipped += 1;
                    debug!("Mention {:?} will be retried: {}", mention.id, e);
                    continue;
                }
            }
            if let Some(id) = &mention.id {
                handled.insert(id.clone());
            }
        }
        // Ids that dropped out of the listing are forgotten
        *seen = handled;

        info!(
            "Mention fetch done: {} listed, {} new, {} saved, {} skipped",
            mentions.len(),
            summary.seen,
            summary.saved,
            summary.skipped
        );
        Some(summary)
    }
}

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::graph::{GraphClient, GraphError};

/// Display name recorded when the sender cannot be resolved.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Source of display names for sender ids
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn user_name(&self, user_id: &str) -> Result<String, GraphError>;
}

#[async_trait]
impl ProfileLookup for GraphClient {
    async fn user_name(&self, user_id: &str) -> Result<String, GraphError> {
        GraphClient::user_name(self, user_id).await
    }
}

/// Maps sender ids to display names, degrading to [`UNKNOWN_SENDER`].
#[derive(Clone)]
pub struct IdentityResolver {
    lookup: Arc<dyn ProfileLookup>,
}

impl IdentityResolver {
    pub fn new(lookup: Arc<dyn ProfileLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve a display name. Never fails: every error is logged and
    /// absorbed into the sentinel.
    pub async fn resolve(&self, sender_id: Option<&str>) -> String {
        let user_id = match sender_id.map(str::trim) {
            Some(id) if !id.is_empty() => id,
            _ => {
                warn!("Mention has no sender id, recording as {}", UNKNOWN_SENDER);
                return UNKNOWN_SENDER.to_string();
            }
        };

        match self.lookup.user_name(user_id).await {
            Ok(name) if !name.trim().is_empty() => {
                debug!("Resolved sender {} to '{}'", user_id, name);
                name
            }
            Ok(_) => {
                warn!("Sender {} has an empty display name", user_id);
                UNKNOWN_SENDER.to_string()
            }
            Err(e) => {
                error!("Failed to look up sender {}: {}", user_id, e);
                UNKNOWN_SENDER.to_string()
            }
        }
    }
}

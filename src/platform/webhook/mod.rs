pub mod envelope;
pub mod error;
pub mod signature;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::server::AppState;
use envelope::WebhookEnvelope;
pub use error::WebhookError;

/// Query string of the subscription handshake
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// `GET /webhook`: echo the challenge when the verify token matches.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<String, WebhookError> {
    let expected = state.config.credentials.verify_token.as_bytes();
    let provided = params.verify_token.as_deref().unwrap_or_default();

    if signature::constant_time_eq(provided.as_bytes(), expected) {
        info!("Webhook subscription verified");
        Ok(params.challenge.unwrap_or_default())
    } else {
        warn!("Webhook verification failed: token mismatch");
        Err(WebhookError::InvalidVerifyToken)
    }
}

/// `POST /webhook`: authenticate the raw body, then feed every message
/// through the mention pipeline.
pub async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, WebhookError> {
    let header = headers
        .get(signature::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let secret = state.config.credentials.app_secret.as_bytes();

    if !signature::verify(secret, &body, header) {
        warn!(
            "Rejected webhook delivery with invalid signature ({} bytes, header present: {})",
            body.len(),
            header.is_some()
        );
        return Err(WebhookError::InvalidSignature);
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(&body).map_err(|e| {
        error!("Failed to parse webhook payload: {}", e);
        WebhookError::InvalidPayload(e.to_string())
    })?;
    debug!("Webhook payload: {:?}", envelope);

    let mentions = envelope.mentions();
    let summary = state.pipeline.process_all(&mentions).await;
    info!(
        "Webhook delivery processed: {} mention(s), {} saved, {} skipped",
        summary.seen, summary.saved, summary.skipped
    );

    Ok(Json(json!({"status": "success"})))
}

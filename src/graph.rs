use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::GraphConfig;
use crate::platform::Mention;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Graph API request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Graph API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode Graph API response: {0}")]
    Decode(String),

    #[error("Graph API response is missing field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid Graph API base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the access token
        let err = err.without_url();
        if err.is_timeout() {
            GraphError::Timeout
        } else if err.is_decode() {
            GraphError::Decode(err.to_string())
        } else {
            GraphError::Network(err.to_string())
        }
    }
}

/// Error bodies are logged, so keep them short.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct UserProfile {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MentionsPage {
    #[serde(default)]
    data: Vec<RawMention>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawMention {
    id: Option<String>,
    from: Option<RawSender>,
    message: Option<String>,
    created_time: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawSender {
    id: Option<String>,
}

impl From<RawMention> for Mention {
    fn from(raw: RawMention) -> Self {
        Mention {
            id: raw.id,
            sender_id: raw.from.and_then(|f| f.id),
            text: raw.message.unwrap_or_default(),
            timestamp: raw.created_time.unwrap_or_default(),
        }
    }
}

/// Thin client for the two Graph API endpoints the bot needs.
pub struct GraphClient {
    client: reqwest::Client,
    base_url: Url,
    access_token: String,
}

impl GraphClient {
    pub fn new(config: &GraphConfig, access_token: &str) -> Result<Self, GraphError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GraphError::InvalidBaseUrl(config.base_url.clone()))?;

        Ok(Self {
            client,
            base_url,
            access_token: access_token.to_string(),
        })
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Look up the display name of a Graph user.
    pub async fn user_name(&self, user_id: &str) -> Result<String, GraphError> {
        let url = self.endpoint(&[user_id]);
        debug!("Fetching profile name for user {}", user_id);

        let response = self
            .client
            .get(url)
            .query(&[("fields", "name"), ("access_token", self.access_token.as_str())])
            .send()
            .await?;

        let profile: UserProfile = check_status(response).await?.json().await?;
        profile.name.ok_or(GraphError::MissingField("name"))
    }

    /// List mentions of the tracked account.
    pub async fn mentions(&self, user_id: &str) -> Result<Vec<Mention>, GraphError> {
        let url = self.endpoint(&[user_id, "mentions"]);
        debug!("Fetching mentions for account {}", user_id);

        let response = self
            .client
            .get(url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("fields", "from,message,created_time"),
            ])
            .send()
            .await?;

        let page: MentionsPage = check_status(response).await?.json().await?;
        Ok(page.data.into_iter().map(Mention::from).collect())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GraphError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    Err(GraphError::Api {
        status: status.as_u16(),
        body,
    })
}

pub mod history;
pub mod webhook;

/// A mention of the tracked account, from either intake path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mention {
    /// Graph object id, when the source provides one (the mentions listing does)
    pub id: Option<String>,
    /// Opaque id of the account that wrote the mention
    pub sender_id: Option<String>,
    /// The message text
    pub text: String,
    /// ISO-8601 timestamp as delivered by the platform
    pub timestamp: String,
}

impl Mention {
    pub fn new(
        sender_id: Option<String>,
        text: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            sender_id,
            text: text.into(),
            timestamp: timestamp.into(),
        }
    }
}

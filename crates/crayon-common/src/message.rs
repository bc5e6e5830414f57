use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message delivered by the chat platform that may warrant a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    /// The bot was mentioned directly or the message replies to one of its messages.
    pub mentions_bot: bool,
    pub timestamp: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn text(
        channel_id: impl Into<String>,
        author_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let author_id = author_id.into();
        Self {
            id: String::new(),
            channel_id: channel_id.into(),
            guild_id: None,
            author_name: author_id.clone(),
            author_id,
            content: content.into(),
            mentions_bot: false,
            timestamp: Utc::now(),
        }
    }

    pub fn mentioning_bot(mut self) -> Self {
        self.mentions_bot = true;
        self
    }
}

/// One message read back from a channel's recent history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Authored by the bot's own identity.
    pub from_self: bool,
}

use async_trait::async_trait;
use crayon_common::{ChannelMessage, IncomingMessage, Result};
use serde::{Deserialize, Serialize};

/// Lifecycle management for a chat platform connection.
#[async_trait]
pub trait ChannelLifecycle: Send {
    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Connect and serve events until the connection ends.
    async fn connect(&mut self) -> Result<()>;

    /// Gracefully disconnect from the external service.
    async fn disconnect(&mut self) -> Result<()>;

    fn status(&self) -> ChannelStatus;
}

/// Send-only interface for delivering text into a channel.
///
/// Designed to be wrapped in `Arc` and shared across pipeline tasks.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Unique identifier for this platform type.
    fn channel_type(&self) -> &str;

    /// Send one message. Callers are responsible for the platform's length limit.
    async fn send_text(&self, channel_id: &str, text: &str) -> Result<()>;
}

/// Read access to a channel's recent messages.
#[async_trait]
pub trait ChannelHistory: Send + Sync {
    /// Up to `limit` of the most recent messages, in whatever order the platform returns them.
    async fn recent_messages(&self, channel_id: &str, limit: usize) -> Result<Vec<ChannelMessage>>;
}

/// Everything the message pipeline needs from a platform.
pub trait ChatPlatform: ChannelSender + ChannelHistory {}
impl<T: ChannelSender + ChannelHistory> ChatPlatform for T {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelStatus {
    Disconnected,
    Connecting,
    Connected,
    Error(String),
}

/// Receives every platform message that is not a literal command.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, platform: std::sync::Arc<dyn ChatPlatform>, message: IncomingMessage);
}

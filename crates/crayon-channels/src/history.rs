use std::time::Duration;

use crayon_common::{ChatMessage, ConversationHistory, with_timeout};
use tracing::{debug, warn};

use crate::traits::ChannelHistory;

pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Turns a channel's recent messages into role-tagged context.
///
/// Never fails: a platform error or timeout yields an empty history so the
/// caller can still decide (and most likely stay silent).
#[derive(Debug, Clone)]
pub struct HistoryFetcher {
    window: usize,
    timeout: Duration,
}

impl HistoryFetcher {
    pub fn new(window: usize, timeout: Duration) -> Self {
        Self {
            window: window.max(1),
            timeout,
        }
    }

    pub async fn fetch<H>(&self, source: &H, channel_id: &str) -> ConversationHistory
    where
        H: ChannelHistory + ?Sized,
    {
        let fetched = with_timeout(
            "history fetch",
            self.timeout,
            source.recent_messages(channel_id, self.window),
        )
        .await;

        let mut messages = match fetched {
            Ok(messages) => messages,
            Err(e) => {
                warn!(channel = channel_id, "could not fetch channel history: {e}");
                return ConversationHistory::empty();
            }
        };

        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        // keep the newest `window` if the platform returned more than asked
        let excess = messages.len().saturating_sub(self.window);
        messages.drain(..excess);

        let history = ConversationHistory::new(
            messages
                .into_iter()
                .map(|m| {
                    if m.from_self {
                        ChatMessage::model(m.content)
                    } else {
                        ChatMessage::user(m.content)
                    }
                })
                .collect(),
        );
        debug!(channel = channel_id, turns = history.len(), "fetched history");
        history
    }
}

impl Default for HistoryFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW, Duration::from_secs(30))
    }
}

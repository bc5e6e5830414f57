use std::sync::Arc;

use async_trait::async_trait;
use crayon_common::{ChannelMessage, Error, Result};
use serenity::all::{ChannelId, GetMessages, Http, UserId};

use crate::traits::{ChannelHistory, ChannelSender};

use super::convert;

/// Discord's cap on messages per history request.
const MAX_FETCH: usize = 100;

/// Send and history access over Discord's REST API, cheap to clone per event.
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
    bot_id: UserId,
    bot_name: Arc<str>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, bot_id: UserId, bot_name: &str) -> Self {
        Self {
            http,
            bot_id,
            bot_name: bot_name.into(),
        }
    }
}

pub(crate) fn parse_channel_id(channel_id: &str) -> Result<ChannelId> {
    channel_id
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(ChannelId::new)
        .ok_or_else(|| Error::Channel(format!("invalid discord channel id: {channel_id}")))
}

#[async_trait]
impl ChannelSender for DiscordPlatform {
    fn channel_type(&self) -> &str {
        "discord"
    }

    async fn send_text(&self, channel_id: &str, text: &str) -> Result<()> {
        parse_channel_id(channel_id)?
            .say(self.http.as_ref(), text)
            .await
            .map_err(|e| Error::Channel(format!("discord send failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl ChannelHistory for DiscordPlatform {
    async fn recent_messages(&self, channel_id: &str, limit: usize) -> Result<Vec<ChannelMessage>> {
        let limit = limit.clamp(1, MAX_FETCH) as u8;
        let messages = parse_channel_id(channel_id)?
            .messages(self.http.as_ref(), GetMessages::new().limit(limit))
            .await
            .map_err(|e| Error::Channel(format!("discord history fetch failed: {e}")))?;

        Ok(messages
            .iter()
            .map(|m| convert::history_entry(m, self.bot_id, &self.bot_name))
            .collect())
    }
}

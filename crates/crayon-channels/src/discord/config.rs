use std::time::Duration;

use crayon_common::{Error, Result};
use serenity::all::GatewayIntents;

/// Discord connection settings, validated.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Bot token for authenticating with Discord.
    pub bot_token: String,

    /// Gateway intents to request from Discord.
    pub intents: GatewayIntents,

    /// Prefix for the literal text commands, usually `!`.
    pub prefix: String,

    /// Upper bound for each Discord REST call made outside the pipeline.
    pub request_timeout: Duration,
}

impl DiscordConfig {
    pub fn from_settings(bot_token: Option<&str>, prefix: &str) -> Result<Self> {
        let bot_token = bot_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Config("discord bot_token is required".into()))?
            .to_string();

        let prefix = match prefix.trim() {
            "" => "!".to_string(),
            p => p.to_string(),
        };

        // MESSAGE_CONTENT is privileged and must be enabled for the
        // application in the developer portal.
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        Ok(Self {
            bot_token,
            intents,
            prefix,
            request_timeout: Duration::from_secs(30),
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

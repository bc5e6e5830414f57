use std::sync::Arc;
use std::time::Duration;

use serenity::all::{Context, EventHandler, Message as SerenityMessage, Ready, ResumedEvent};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::traits::{ChannelSender, ChannelStatus, ChatPlatform, MessageHandler};

use super::platform::DiscordPlatform;
use super::{commands, convert};

/// Serenity event handler that routes Discord messages into Crayon.
pub struct DiscordHandler {
    router: Arc<dyn MessageHandler>,
    prefix: String,
    request_timeout: Duration,
    status: Arc<watch::Sender<ChannelStatus>>,
}

impl DiscordHandler {
    pub fn new(
        router: Arc<dyn MessageHandler>,
        prefix: String,
        request_timeout: Duration,
        status: Arc<watch::Sender<ChannelStatus>>,
    ) -> Self {
        Self {
            router,
            prefix,
            request_timeout,
            status,
        }
    }
}

/// Bots, including ourselves, and messages with nothing to read are ignored.
pub fn should_ignore(author_is_bot: bool, content: &str) -> bool {
    author_is_bot || content.trim().is_empty()
}

#[serenity::async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            "Discord bot connected as {} (guilds: {})",
            ready.user.name,
            ready.guilds.len()
        );
        self.status.send_replace(ChannelStatus::Connected);
    }

    async fn resume(&self, _ctx: Context, _: ResumedEvent) {
        info!("Discord gateway connection resumed");
        self.status.send_replace(ChannelStatus::Connected);
    }

    async fn message(&self, ctx: Context, msg: SerenityMessage) {
        if should_ignore(msg.author.bot, &msg.content) {
            return;
        }

        debug!(
            message_id = %msg.id,
            author = %msg.author.name,
            channel = %msg.channel_id,
            "received discord message"
        );

        let (bot_id, bot_name) = {
            let me = ctx.cache.current_user();
            (me.id, me.name.clone())
        };
        let platform = Arc::new(DiscordPlatform::new(ctx.http.clone(), bot_id, &bot_name));

        if let Some(command) = commands::parse(&msg.content, &self.prefix) {
            info!(channel = %msg.channel_id, ?command, "running literal command");
            let sender: Arc<dyn ChannelSender> = platform;
            commands::execute(&ctx, &msg, command, &self.prefix, &sender, self.request_timeout).await;
            return;
        }

        let incoming = convert::incoming_from_discord(&msg, bot_id, &bot_name);
        let platform: Arc<dyn ChatPlatform> = platform;
        self.router.handle(platform, incoming).await;
    }
}

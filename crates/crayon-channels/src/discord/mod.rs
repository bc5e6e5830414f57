mod commands;
mod config;
mod convert;
mod handler;
mod platform;

pub use commands::{Command, format_channel_list, parse as parse_command, send_usage};
pub use config::DiscordConfig;
pub use convert::{addresses_bot, snowflake_timestamp, name_bot_mention};
pub use handler::DiscordHandler;
pub use platform::DiscordPlatform;

use std::sync::Arc;

use async_trait::async_trait;
use crayon_common::{Error, Result};
use serenity::Client;
use serenity::gateway::ShardManager;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::traits::{ChannelLifecycle, ChannelStatus, MessageHandler};

/// The Discord gateway connection. `connect` spawns the client and returns;
/// `disconnect` shuts every shard down.
pub struct DiscordChannel {
    config: DiscordConfig,
    router: Arc<dyn MessageHandler>,
    status: Arc<watch::Sender<ChannelStatus>>,
    shard_manager: Option<Arc<ShardManager>>,
    client_task: Option<JoinHandle<()>>,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig, router: Arc<dyn MessageHandler>) -> Self {
        let (status, _) = watch::channel(ChannelStatus::Disconnected);
        Self {
            config,
            router,
            status: Arc::new(status),
            shard_manager: None,
            client_task: None,
        }
    }

    /// Watch connection status changes.
    pub fn subscribe_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.subscribe()
    }
}

#[async_trait]
impl ChannelLifecycle for DiscordChannel {
    fn display_name(&self) -> &str {
        "Discord"
    }

    async fn connect(&mut self) -> Result<()> {
        if self.client_task.is_some() {
            return Err(Error::Channel("discord channel already connected".into()));
        }
        self.status.send_replace(ChannelStatus::Connecting);

        let handler = DiscordHandler::new(
            Arc::clone(&self.router),
            self.config.prefix.clone(),
            self.config.request_timeout,
            Arc::clone(&self.status),
        );

        let mut client = Client::builder(&self.config.bot_token, self.config.intents)
            .event_handler(handler)
            .await
            .map_err(|e| {
                self.status
                    .send_replace(ChannelStatus::Error(e.to_string()));
                Error::Channel(format!("failed to build discord client: {e}"))
            })?;

        self.shard_manager = Some(Arc::clone(&client.shard_manager));

        let status = Arc::clone(&self.status);
        self.client_task = Some(tokio::spawn(async move {
            match client.start().await {
                Ok(()) => {
                    status.send_replace(ChannelStatus::Disconnected);
                }
                Err(e) => {
                    error!("discord client stopped: {e}");
                    status.send_replace(ChannelStatus::Error(e.to_string()));
                }
            }
        }));

        info!("discord client started");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(manager) = self.shard_manager.take() {
            manager.shutdown_all().await;
        }
        if let Some(task) = self.client_task.take() {
            task.await
                .map_err(|e| Error::Channel(format!("discord client task failed: {e}")))?;
        }
        self.status.send_replace(ChannelStatus::Disconnected);
        info!("discord client disconnected");
        Ok(())
    }

    fn status(&self) -> ChannelStatus {
        self.status.borrow().clone()
    }
}

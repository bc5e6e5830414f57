use std::sync::Arc;

use async_trait::async_trait;
use crayon_channels::{ChatPlatform, MessageHandler, send_chunked};
use crayon_common::IncomingMessage;
use tracing::error;

use crate::pipeline::{FAILED_TEXT, MessagePipeline, Outcome};

/// Entry point for every non-command platform message.
///
/// Each message runs in its own task; a task that panics is reported with a
/// generic apology instead of silently vanishing.
#[derive(Clone)]
pub struct IncomingMessageRouter {
    pipeline: Arc<MessagePipeline>,
}

impl IncomingMessageRouter {
    pub fn new(pipeline: Arc<MessagePipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<MessagePipeline> {
        &self.pipeline
    }

    pub async fn route(&self, platform: Arc<dyn ChatPlatform>, message: IncomingMessage) -> Outcome {
        let channel_id = message.channel_id.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let task_platform = Arc::clone(&platform);

        let task = tokio::spawn(async move {
            pipeline.process(task_platform.as_ref(), message).await
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(channel = %channel_id, "message pipeline task failed: {e}");
                let settings = self.pipeline.settings();
                send_chunked(
                    platform.as_ref(),
                    &channel_id,
                    FAILED_TEXT,
                    settings.max_message_len,
                    settings.send_timeout,
                )
                .await;
                Outcome::Failed
            }
        }
    }
}

#[async_trait]
impl MessageHandler for IncomingMessageRouter {
    async fn handle(&self, platform: Arc<dyn ChatPlatform>, message: IncomingMessage) {
        self.route(platform, message).await;
    }
}

use std::time::Duration;

use crayon_agents::{ConversationEngine, Reply, ResponseDecider, ToolContext};
use crayon_channels::{ChatPlatform, HistoryFetcher, MAX_MESSAGE_LEN, send_chunked};
use crayon_common::{ConversationHistory, IncomingMessage};
use tracing::{debug, info, instrument};

/// Sent when the pipeline itself broke down, e.g. a panicked task.
pub const FAILED_TEXT: &str = "Oops, something went wrong on my side. Please try again later.";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_message_len: usize,
    pub send_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_message_len: MAX_MESSAGE_LEN,
            send_timeout: Duration::from_secs(30),
        }
    }
}

/// Where one incoming message currently is on its way to a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Received(IncomingMessage),
    Deciding {
        message: IncomingMessage,
        history: ConversationHistory,
    },
    Responding {
        message: IncomingMessage,
        history: ConversationHistory,
    },
    Done(Outcome),
}

/// How the pipeline ended. Each outcome maps to at most one reply text.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Silent { reason: String },
    Replied(Reply),
    Failed,
}

impl Outcome {
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Silent { .. } => None,
            Self::Replied(reply) => Some(reply.text()),
            Self::Failed => Some(FAILED_TEXT.to_string()),
        }
    }

    /// Short state name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Silent { .. } => "silent",
            Self::Replied(Reply::Direct(_)) => "direct_text",
            Self::Replied(Reply::Tool(outcome)) if outcome.is_tool_error() => "tool_error",
            Self::Replied(Reply::Tool(_)) => "final_text",
            Self::Replied(Reply::ToolExpectationUnmet) => "tool_expectation_unmet",
            Self::Replied(Reply::ExchangeFailed) => "exchange_failed",
            Self::Failed => "failed",
        }
    }
}

/// Decide, converse and deliver for one message at a time. Holds only
/// immutable shared services, so any number of runs may overlap.
pub struct MessagePipeline {
    fetcher: HistoryFetcher,
    decider: ResponseDecider,
    engine: ConversationEngine,
    settings: PipelineSettings,
}

impl MessagePipeline {
    pub fn new(
        fetcher: HistoryFetcher,
        decider: ResponseDecider,
        engine: ConversationEngine,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            decider,
            engine,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run every stage, then send the reply if there is one.
    #[instrument(skip_all, fields(channel = %message.channel_id, message_id = %message.id))]
    pub async fn process(&self, platform: &dyn ChatPlatform, message: IncomingMessage) -> Outcome {
        let channel_id = message.channel_id.clone();
        let outcome = self.run(platform, message).await;
        info!(outcome = outcome.label(), "pipeline finished");

        if let Some(text) = outcome.text() {
            self.deliver(platform, &channel_id, &text).await;
        }
        outcome
    }

    /// Drive the state machine to a terminal outcome without sending anything.
    pub async fn run(&self, platform: &dyn ChatPlatform, message: IncomingMessage) -> Outcome {
        let mut stage = Stage::Received(message);
        loop {
            stage = match self.advance(platform, stage).await {
                Stage::Done(outcome) => return outcome,
                next => next,
            };
        }
    }

    pub async fn advance(&self, platform: &dyn ChatPlatform, stage: Stage) -> Stage {
        match stage {
            Stage::Received(message) => {
                let history = self.fetcher.fetch(platform, &message.channel_id).await;
                Stage::Deciding { message, history }
            }
            Stage::Deciding { message, history } => {
                if message.mentions_bot {
                    debug!("addressed directly, skipping the classifier");
                    return Stage::Responding { message, history };
                }
                let decision = self.decider.classify(&history).await;
                if decision.should_respond {
                    Stage::Responding { message, history }
                } else {
                    Stage::Done(Outcome::Silent {
                        reason: decision.reason,
                    })
                }
            }
            Stage::Responding { message, history } => {
                let context = ToolContext {
                    channel_id: message.channel_id.clone(),
                    requested_by: Some(message.author_name.clone()),
                };
                let tools = self.engine.tool_definitions();
                let declared = (!tools.is_empty()).then_some(tools.as_slice());
                let prior = history.without_trailing_utterance(&message.content);

                let reply = self
                    .engine
                    .converse(&context, &message.content, &prior, declared)
                    .await;
                Stage::Done(Outcome::Replied(reply))
            }
            done @ Stage::Done(_) => done,
        }
    }

    pub async fn deliver(&self, platform: &dyn ChatPlatform, channel_id: &str, text: &str) -> usize {
        send_chunked(
            platform,
            channel_id,
            text,
            self.settings.max_message_len,
            self.settings.send_timeout,
        )
        .await
    }
}

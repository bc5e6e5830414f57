use crayon_common::{ChatMessage, ConversationHistory};
use tracing::{info, warn};

use crate::exchange::Exchange;
use crate::prompts::synthesis_prompt;
use crate::tools::{ToolContext, ToolRegistry};

/// How a requested tool invocation ended. Each variant has exactly one
/// user-facing text.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    NotImplemented { name: String },
    ExecutionFailed { name: String, reason: String },
    Unparseable { name: String },
    /// The tool answered with a bare message (usually an error) instead of data.
    Reported(String),
    Summarized(String),
    SummaryUnavailable,
}

impl DispatchOutcome {
    pub fn text(&self) -> String {
        match self {
            Self::NotImplemented { name } => {
                format!("Sorry, I don't know how to `{name}` yet. That isn't implemented.")
            }
            Self::ExecutionFailed { name, reason } => {
                format!("I tried to use `{name}` but it failed: {reason}")
            }
            Self::Unparseable { name } => {
                format!("I received an answer from `{name}` but could not interpret it.")
            }
            Self::Reported(message) => message.clone(),
            Self::Summarized(text) => text.clone(),
            Self::SummaryUnavailable => {
                "I got the data but couldn't put it into words. Try asking again?".to_string()
            }
        }
    }

    /// True for the outcomes that end without a synthesis turn.
    pub fn is_tool_error(&self) -> bool {
        !matches!(self, Self::Summarized(_) | Self::SummaryUnavailable)
    }
}

/// Runs a tool the model asked for and turns its result into prose.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: ToolRegistry,
    exchange: Exchange,
}

impl ToolDispatcher {
    pub fn new(registry: ToolRegistry, exchange: Exchange) -> Self {
        Self { registry, exchange }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn dispatch(
        &self,
        context: &ToolContext,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
        history: &ConversationHistory,
    ) -> DispatchOutcome {
        let Some(tool) = self.registry.get(name) else {
            warn!(tool = name, "model requested an unregistered tool");
            return DispatchOutcome::NotImplemented {
                name: name.to_string(),
            };
        };

        info!(
            tool = name,
            channel = %context.channel_id,
            requested_by = context.requested_by.as_deref().unwrap_or("unknown"),
            "executing tool"
        );
        let operation = format!("tool {name}");
        let execution = crayon_common::with_timeout(
            &operation,
            self.exchange.settings().timeout,
            tool.execute(context, serde_json::Value::Object(arguments)),
        )
        .await;

        let output = match execution {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = name, "tool execution failed: {e}");
                return DispatchOutcome::ExecutionFailed {
                    name: name.to_string(),
                    reason: e.to_string(),
                };
            }
        };

        let data: serde_json::Value = match serde_json::from_str(&output.content) {
            Ok(data) => data,
            Err(e) => {
                warn!(tool = name, "tool output is not JSON: {e}");
                return DispatchOutcome::Unparseable {
                    name: name.to_string(),
                };
            }
        };

        if let serde_json::Value::String(message) = data {
            info!(tool = name, "tool reported a message instead of data");
            return DispatchOutcome::Reported(message);
        }

        self.summarize(name, &data, history).await
    }

    async fn summarize(
        &self,
        name: &str,
        data: &serde_json::Value,
        history: &ConversationHistory,
    ) -> DispatchOutcome {
        let mut messages = history.messages().to_vec();
        messages.push(ChatMessage::user(synthesis_prompt(name, data)));

        match self.exchange.send(messages, &[]).await {
            Ok(response) => {
                let text = response.text();
                if text.trim().is_empty() {
                    warn!(tool = name, "synthesis turn returned no text");
                    DispatchOutcome::SummaryUnavailable
                } else {
                    DispatchOutcome::Summarized(text)
                }
            }
            Err(e) => {
                warn!(tool = name, "synthesis exchange failed: {e}");
                DispatchOutcome::SummaryUnavailable
            }
        }
    }
}

use std::sync::Arc;

use crayon_common::{ChatMessage, ConversationHistory};
use tracing::{info, instrument, warn};

use crate::dispatcher::{DispatchOutcome, ToolDispatcher};
use crate::exchange::Exchange;
use crate::providers::{ToolDefinition, TurnResult};
use crate::tools::ToolContext;

pub const EXCHANGE_FAILED_TEXT: &str =
    "Sorry, I couldn't reach my brain just now. Please try again in a moment.";
pub const TOOL_EXPECTED_TEXT: &str =
    "I was expected to use one of my tools for that, but I didn't get anything back. Could you rephrase?";

/// The final answer of one `converse` call, tagged by how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Plain text straight from the model.
    Direct(String),
    /// The model asked for a tool; the dispatcher produced the answer.
    Tool(DispatchOutcome),
    /// Tools were offered but the model returned neither a call nor text.
    ToolExpectationUnmet,
    /// The exchange itself failed or timed out.
    ExchangeFailed,
}

impl Reply {
    pub fn text(&self) -> String {
        match self {
            Self::Direct(text) => text.clone(),
            Self::Tool(outcome) => outcome.text(),
            Self::ToolExpectationUnmet => TOOL_EXPECTED_TEXT.to_string(),
            Self::ExchangeFailed => EXCHANGE_FAILED_TEXT.to_string(),
        }
    }
}

/// Owns the turn protocol with the model. Holds no per-conversation state;
/// each call seeds a fresh exchange from the history it is given.
#[derive(Clone)]
pub struct ConversationEngine {
    exchange: Exchange,
    dispatcher: ToolDispatcher,
    system_prompt: Arc<str>,
}

impl ConversationEngine {
    pub fn new(exchange: Exchange, dispatcher: ToolDispatcher, system_prompt: impl Into<Arc<str>>) -> Self {
        Self {
            exchange,
            dispatcher,
            system_prompt: system_prompt.into(),
        }
    }

    /// Declarations for every registered tool.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.dispatcher.registry().definitions()
    }

    #[instrument(skip_all, fields(channel = %context.channel_id, turns = history.len()))]
    pub async fn converse(
        &self,
        context: &ToolContext,
        utterance: &str,
        history: &ConversationHistory,
        tools: Option<&[ToolDefinition]>,
    ) -> Reply {
        let mut messages = history.seeded_with(&self.system_prompt);
        messages.push(ChatMessage::user(utterance));

        let declared = tools.unwrap_or_default();
        let response = match self.exchange.send(messages, declared).await {
            Ok(response) => response,
            Err(e) => {
                warn!("conversation exchange failed: {e}");
                return Reply::ExchangeFailed;
            }
        };

        match response.turn_result() {
            Some(TurnResult::ToolCall { name, arguments }) => {
                info!(tool = %name, "model requested a tool");
                // the synthesis turn must see the question that led to the call
                let mut turns = history.messages().to_vec();
                turns.push(ChatMessage::user(utterance));
                let outcome = self
                    .dispatcher
                    .dispatch(context, &name, arguments, &ConversationHistory::new(turns))
                    .await;
                Reply::Tool(outcome)
            }
            Some(TurnResult::Text(text)) => Reply::Direct(text),
            None if !declared.is_empty() => {
                warn!(
                    stop_reason = ?response.stop_reason,
                    "tools were declared but the model returned neither a call nor text"
                );
                Reply::ToolExpectationUnmet
            }
            None => {
                info!(stop_reason = ?response.stop_reason, "model returned an empty reply");
                Reply::Direct(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeSettings;
    use crate::providers::{ContentBlock, LlmProvider, LlmRequest, LlmResponse};
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use crayon_common::{ChatRole, Error, Result};
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays one scripted response per call and records every request.
    struct ScriptedProvider {
        script: Mutex<Vec<Result<Vec<ContentBlock>>>>,
        seen: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Vec<ContentBlock>>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn provider_id(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
            self.seen.lock().unwrap().push(request.clone());
            let next = self.script.lock().unwrap().remove(0);
            next.map(|content| LlmResponse {
                content,
                model: "scripted".into(),
                usage: None,
                stop_reason: Some("STOP".into()),
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn engine(provider: Arc<ScriptedProvider>) -> ConversationEngine {
        let exchange = Exchange::new(provider, ExchangeSettings::default());
        let dispatcher = ToolDispatcher::new(ToolRegistry::empty(), exchange.clone());
        ConversationEngine::new(exchange, dispatcher, "You are Crayon-chan.")
    }

    fn text(t: &str) -> ContentBlock {
        ContentBlock::Text { text: t.into() }
    }

    fn weather_tool() -> ToolDefinition {
        ToolDefinition {
            name: "get_weather".into(),
            description: "weather".into(),
            input_schema: json!({ "type": "object" }),
        }
    }

    #[tokio::test]
    async fn plain_text_is_returned_directly() {
        let provider = ScriptedProvider::new(vec![Ok(vec![text("hi there!")])]);
        let engine = engine(provider.clone());
        let history = ConversationHistory::new(vec![ChatMessage::user("hello")]);

        let reply = engine
            .converse(&ToolContext::default(), "how are you?", &history, None)
            .await;
        assert_eq!(reply, Reply::Direct("hi there!".into()));

        let seen = provider.seen.lock().unwrap();
        let messages = &seen[0].messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], ChatMessage::user("You are Crayon-chan."));
        assert_eq!(messages[1].text, "hello");
        assert_eq!(messages[2], ChatMessage::user("how are you?"));
        assert!(seen[0].tools.is_empty());
    }

    #[tokio::test]
    async fn system_prompt_is_not_injected_twice() {
        let provider = ScriptedProvider::new(vec![Ok(vec![text("ok")])]);
        let engine = engine(provider.clone());
        let history = ConversationHistory::new(vec![
            ChatMessage::user("You are Crayon-chan."),
            ChatMessage::user("hello"),
        ]);

        engine
            .converse(&ToolContext::default(), "hi", &history, None)
            .await;

        let seen = provider.seen.lock().unwrap();
        let persona_turns = seen[0]
            .messages
            .iter()
            .filter(|m| m.text == "You are Crayon-chan.")
            .count();
        assert_eq!(persona_turns, 1);
    }

    #[tokio::test]
    async fn transport_failure_becomes_apology() {
        let provider = ScriptedProvider::new(vec![Err(Error::Agent(
            "Gemini request failed: connection refused".into(),
        ))]);
        let reply = engine(provider)
            .converse(&ToolContext::default(), "hi", &ConversationHistory::empty(), None)
            .await;
        assert_eq!(reply, Reply::ExchangeFailed);
        assert_eq!(reply.text(), EXCHANGE_FAILED_TEXT);
    }

    #[tokio::test]
    async fn declared_tools_without_call_or_text_is_flagged() {
        let provider = ScriptedProvider::new(vec![Ok(vec![])]);
        let tools = [weather_tool()];
        let reply = engine(provider.clone())
            .converse(
                &ToolContext::default(),
                "weather?",
                &ConversationHistory::empty(),
                Some(&tools[..]),
            )
            .await;
        assert_eq!(reply, Reply::ToolExpectationUnmet);
        assert!(reply.text().contains("expected to use"));
        assert_eq!(provider.seen.lock().unwrap()[0].tools.len(), 1);
    }

    #[tokio::test]
    async fn empty_reply_without_tools_is_empty_text() {
        let provider = ScriptedProvider::new(vec![Ok(vec![])]);
        let reply = engine(provider)
            .converse(&ToolContext::default(), "hi", &ConversationHistory::empty(), None)
            .await;
        assert_eq!(reply, Reply::Direct(String::new()));
    }

    #[tokio::test]
    async fn tool_call_is_handed_to_dispatcher() {
        let provider = ScriptedProvider::new(vec![Ok(vec![ContentBlock::ToolUse {
            name: "get_weather".into(),
            input: json!({ "city": "Fortaleza" }),
        }])]);
        let tools = [weather_tool()];
        let reply = engine(provider)
            .converse(
                &ToolContext::default(),
                "weather in Fortaleza?",
                &ConversationHistory::empty(),
                Some(&tools[..]),
            )
            .await;
        // the engine under test has an empty registry
        assert_eq!(
            reply,
            Reply::Tool(DispatchOutcome::NotImplemented {
                name: "get_weather".into()
            })
        );
    }

    struct SunnyTool;

    #[async_trait]
    impl crate::tools::Tool for SunnyTool {
        fn name(&self) -> &'static str {
            "get_weather"
        }

        fn description(&self) -> &'static str {
            "weather"
        }

        fn input_schema(&self) -> serde_json::Value {
            json!({ "type": "object" })
        }

        async fn execute(
            &self,
            _context: &ToolContext,
            _args: serde_json::Value,
        ) -> Result<crate::tools::ToolOutput> {
            Ok(crate::tools::ToolOutput::json(
                &json!({ "city": "Fortaleza", "description": "Light rain" }),
            ))
        }
    }

    #[tokio::test]
    async fn synthesis_turn_sees_the_question() {
        let provider = ScriptedProvider::new(vec![
            Ok(vec![ContentBlock::ToolUse {
                name: "get_weather".into(),
                input: json!({ "city": "Fortaleza" }),
            }]),
            Ok(vec![text("Light rain, so yes, take an umbrella!")]),
        ]);
        let exchange = Exchange::new(provider.clone(), ExchangeSettings::default());
        let registry = ToolRegistry::builder().register(Arc::new(SunnyTool)).build();
        let engine = ConversationEngine::new(
            exchange.clone(),
            ToolDispatcher::new(registry, exchange),
            "You are Crayon-chan.",
        );
        let question = "what's the weather in Fortaleza, should I bring an umbrella?";
        let history = ConversationHistory::new(vec![ChatMessage::user("morning all")]);

        let reply = engine
            .converse(&ToolContext::default(), question, &history, Some(&[weather_tool()][..]))
            .await;
        assert_eq!(reply.text(), "Light rain, so yes, take an umbrella!");

        let seen = provider.seen.lock().unwrap();
        let synthesis: Vec<_> = seen[1].messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(synthesis.len(), 3);
        assert_eq!(synthesis[0], "morning all");
        assert_eq!(synthesis[1], question);
        assert!(synthesis[2].contains("Light rain"));
    }

    #[tokio::test]
    async fn history_roles_are_preserved() {
        let provider = ScriptedProvider::new(vec![Ok(vec![text("sure")])]);
        let history = ConversationHistory::new(vec![
            ChatMessage::user("hi"),
            ChatMessage::model("hello!"),
        ]);
        engine(provider.clone())
            .converse(&ToolContext::default(), "again", &history, None)
            .await;
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].messages[2].role, ChatRole::Model);
    }
}

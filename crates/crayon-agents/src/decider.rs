use crayon_common::{ChatMessage, ConversationHistory};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::exchange::Exchange;
use crate::prompts::{DECISION_INSTRUCTION, decision_prompt};

/// Outcome of the respond / stay-silent classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub should_respond: bool,
    #[serde(default)]
    pub reason: String,
}

impl DecisionResult {
    fn silent(reason: impl Into<String>) -> Self {
        Self {
            should_respond: false,
            reason: reason.into(),
        }
    }
}

/// Decides from recent history whether the bot should speak up.
/// Every failure mode resolves to silence.
#[derive(Clone)]
pub struct ResponseDecider {
    exchange: Exchange,
}

impl ResponseDecider {
    pub fn new(exchange: Exchange) -> Self {
        Self { exchange }
    }

    pub async fn decide(&self, history: &ConversationHistory) -> bool {
        self.classify(history).await.should_respond
    }

    pub async fn classify(&self, history: &ConversationHistory) -> DecisionResult {
        if history.is_empty() {
            return DecisionResult::silent("no context available");
        }

        let prompt = decision_prompt(&history.transcript());
        let decision = match self
            .exchange
            .send_structured(
                DECISION_INSTRUCTION,
                vec![ChatMessage::user(prompt)],
                decision_schema(),
            )
            .await
        {
            Ok(response) => parse_decision(&response.text()),
            Err(e) => {
                warn!("decision exchange failed, staying silent: {e}");
                DecisionResult::silent(format!("exchange failed: {e}"))
            }
        };

        info!(
            should_respond = decision.should_respond,
            reason = %decision.reason,
            "response decision"
        );
        decision
    }
}

/// JSON shape the classifier must answer with.
pub fn decision_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "should_respond": { "type": "BOOLEAN" },
            "reason": { "type": "STRING" }
        },
        "required": ["should_respond", "reason"]
    })
}

/// Anything other than a JSON object with a boolean `should_respond` is a no.
pub fn parse_decision(payload: &str) -> DecisionResult {
    let body = strip_code_fence(payload);
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            debug!(payload, "unparseable decision payload: {e}");
            return DecisionResult::silent("unparseable classifier output");
        }
    };

    let Some(should_respond) = value.get("should_respond").and_then(|v| v.as_bool()) else {
        return DecisionResult::silent("classifier output missing should_respond");
    };

    DecisionResult {
        should_respond,
        reason: value
            .get("reason")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    }
}

fn strip_code_fence(payload: &str) -> &str {
    let trimmed = payload.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeSettings;
    use crate::providers::{ContentBlock, LlmProvider, LlmRequest, LlmResponse};
    use async_trait::async_trait;
    use crayon_common::{Error, Result};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticMockProvider {
        output: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LlmProvider for StaticMockProvider {
        fn provider_id(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(request.response_schema.is_some());
            let Some(output) = self.output else {
                return Err(Error::Agent("Gemini API error: status=503".into()));
            };
            Ok(LlmResponse {
                content: vec![ContentBlock::Text {
                    text: output.to_string(),
                }],
                model: "mock".into(),
                usage: None,
                stop_reason: None,
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn decider(output: Option<&'static str>) -> (ResponseDecider, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(StaticMockProvider {
            output,
            calls: Arc::clone(&calls),
        });
        let exchange = Exchange::new(provider, ExchangeSettings::default());
        (ResponseDecider::new(exchange), calls)
    }

    fn history() -> ConversationHistory {
        ConversationHistory::new(vec![ChatMessage::user("crayon, what's up?")])
    }

    #[tokio::test]
    async fn positive_classification_responds() {
        let (decider, calls) =
            decider(Some(r#"{"should_respond": true, "reason": "addressed by name"}"#));
        let result = decider.classify(&history()).await;
        assert!(result.should_respond);
        assert_eq!(result.reason, "addressed by name");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_output_stays_silent() {
        let (decider, _) = decider(Some("sure, go ahead!"));
        assert!(!decider.decide(&history()).await);
    }

    #[tokio::test]
    async fn missing_boolean_stays_silent() {
        let (decider, _) = decider(Some(r#"{"reason": "looks addressed"}"#));
        assert!(!decider.decide(&history()).await);
    }

    #[tokio::test]
    async fn exchange_failure_stays_silent() {
        let (decider, calls) = decider(None);
        let result = decider.classify(&history()).await;
        assert!(!result.should_respond);
        assert!(result.reason.contains("exchange failed"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_history_skips_the_exchange() {
        let (decider, calls) = decider(Some(r#"{"should_respond": true, "reason": ""}"#));
        assert!(!decider.decide(&ConversationHistory::empty()).await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fenced_json_is_accepted() {
        let result = parse_decision("```json\n{\"should_respond\": true, \"reason\": \"asked\"}\n```");
        assert!(result.should_respond);
    }

    #[test]
    fn string_boolean_is_rejected() {
        let result = parse_decision(r#"{"should_respond": "true"}"#);
        assert!(!result.should_respond);
    }

    #[test]
    fn missing_reason_defaults_to_empty() {
        let result = parse_decision(r#"{"should_respond": false}"#);
        assert_eq!(result, DecisionResult::silent(""));
    }
}

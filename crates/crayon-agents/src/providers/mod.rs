use async_trait::async_trait;
use crayon_common::{ChatMessage, Result};
use serde::{Deserialize, Serialize};

pub mod gemini;
pub use gemini::GeminiProvider;

/// Trait for hosted LLM integrations.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier (e.g. "gemini").
    fn provider_id(&self) -> &str;

    /// Send one turn and return the model's answer.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Check if the provider is reachable with the configured credentials.
    async fn health_check(&self) -> Result<bool>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub tools: Vec<ToolDefinition>,
    /// When set, the model must answer with JSON matching this schema.
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub model: String,
    pub usage: Option<Usage>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// What a single model turn amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnResult {
    Text(String),
    ToolCall {
        name: String,
        arguments: serde_json::Map<String, serde_json::Value>,
    },
}

impl LlmResponse {
    /// Concatenated text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Collapse the response into one turn result. A tool call takes precedence
    /// over any accompanying text; `None` means the turn carried nothing usable.
    pub fn turn_result(&self) -> Option<TurnResult> {
        let tool_call = self.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input } => Some((name, input)),
            _ => None,
        });

        if let Some((name, input)) = tool_call {
            let arguments = match input {
                serde_json::Value::Object(map) => map.clone(),
                _ => serde_json::Map::new(),
            };
            return Some(TurnResult::ToolCall {
                name: name.clone(),
                arguments,
            });
        }

        let text = self.text();
        if text.trim().is_empty() {
            None
        } else {
            Some(TurnResult::Text(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(content: Vec<ContentBlock>) -> LlmResponse {
        LlmResponse {
            content,
            model: "gemini-2.0-flash".into(),
            usage: None,
            stop_reason: Some("STOP".into()),
        }
    }

    #[test]
    fn tool_call_wins_over_text() {
        let resp = response(vec![
            ContentBlock::Text {
                text: "let me check".into(),
            },
            ContentBlock::ToolUse {
                name: "get_weather".into(),
                input: json!({ "city": "Fortaleza" }),
            },
        ]);
        match resp.turn_result() {
            Some(TurnResult::ToolCall { name, arguments }) => {
                assert_eq!(name, "get_weather");
                assert_eq!(arguments["city"], "Fortaleza");
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn non_object_arguments_become_empty_map() {
        let resp = response(vec![ContentBlock::ToolUse {
            name: "get_weather".into(),
            input: serde_json::Value::Null,
        }]);
        assert_eq!(
            resp.turn_result(),
            Some(TurnResult::ToolCall {
                name: "get_weather".into(),
                arguments: serde_json::Map::new(),
            })
        );
    }

    #[test]
    fn text_blocks_are_joined() {
        let resp = response(vec![
            ContentBlock::Text { text: "a".into() },
            ContentBlock::Text { text: "b".into() },
        ]);
        assert_eq!(resp.turn_result(), Some(TurnResult::Text("a\nb".into())));
    }

    #[test]
    fn blank_text_is_nothing() {
        let resp = response(vec![ContentBlock::Text { text: "  \n".into() }]);
        assert_eq!(resp.turn_result(), None);
        assert_eq!(response(vec![]).turn_result(), None);
    }
}

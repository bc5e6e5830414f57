use std::sync::Arc;
use std::time::Duration;

use crayon_common::{ChatMessage, Result, with_timeout};
use tracing::debug;

use crate::providers::{LlmProvider, LlmRequest, LlmResponse, ToolDefinition};

/// Generation settings shared by every exchange in the process.
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: Option<f64>,
    pub timeout: Duration,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_output_tokens: 4000,
            temperature: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// One-shot access to the model. Every call builds its own request from the
/// turns it is handed; nothing is remembered between calls.
#[derive(Clone)]
pub struct Exchange {
    provider: Arc<dyn LlmProvider>,
    settings: ExchangeSettings,
}

impl Exchange {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: ExchangeSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.provider_id()
    }

    pub fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }

    pub async fn send(
        &self,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        self.complete(self.request(messages, None, tools.to_vec(), None))
            .await
    }

    /// Ask for a JSON answer constrained to `schema`.
    pub async fn send_structured(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        schema: serde_json::Value,
    ) -> Result<LlmResponse> {
        self.complete(self.request(
            messages,
            Some(system.to_string()),
            Vec::new(),
            Some(schema),
        ))
        .await
    }

    pub async fn health_check(&self) -> Result<bool> {
        with_timeout(
            "llm health check",
            self.settings.timeout,
            self.provider.health_check(),
        )
        .await
    }

    fn request(
        &self,
        messages: Vec<ChatMessage>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        response_schema: Option<serde_json::Value>,
    ) -> LlmRequest {
        LlmRequest {
            model: self.settings.model.clone(),
            messages,
            system,
            max_tokens: Some(self.settings.max_output_tokens),
            temperature: self.settings.temperature,
            tools,
            response_schema,
        }
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        debug!(
            provider = self.provider.provider_id(),
            turns = request.messages.len(),
            tools = request.tools.len(),
            structured = request.response_schema.is_some(),
            "sending exchange"
        );
        let operation = format!("{} completion", self.provider.provider_id());
        let response =
            with_timeout(&operation, self.settings.timeout, self.provider.complete(&request))
                .await?;
        debug!(
            model = %response.model,
            blocks = response.content.len(),
            stop_reason = ?response.stop_reason,
            "exchange completed"
        );
        Ok(response)
    }
}

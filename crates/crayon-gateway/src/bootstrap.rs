use std::sync::Arc;

use crayon_agents::prompts::DEFAULT_SYSTEM_PROMPT;
use crayon_agents::{
    ConversationEngine, Exchange, ExchangeSettings, GeminiProvider, LlmProvider,
    ResponseDecider, ToolDispatcher, ToolRegistry, WeatherTool,
};
use crayon_channels::HistoryFetcher;
use crayon_common::{Error, Result};
use crayon_config::{AppConfig, ConfigLoader};
use tracing::{info, warn};

use crate::pipeline::{MessagePipeline, PipelineSettings};
use crate::router::IncomingMessageRouter;

/// Everything built from one `AppConfig`, shared for the life of the process.
pub struct Services {
    pub exchange: Exchange,
    pub engine: ConversationEngine,
    pub router: Arc<IncomingMessageRouter>,
}

/// Resolve the persona: the configured file if readable, else the built-in prompt.
pub fn system_prompt(config: &AppConfig) -> String {
    ConfigLoader::read_system_prompt(config).unwrap_or_else(|| {
        warn!("using the built-in system prompt");
        DEFAULT_SYSTEM_PROMPT.to_string()
    })
}

pub fn gemini_provider(config: &AppConfig) -> Result<GeminiProvider> {
    let api_key = config
        .llm
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| Error::Config("GEMINI_API_KEY is required".into()))?;

    Ok(GeminiProvider::new(api_key)
        .with_base_url(config.llm.base_url.clone())
        .with_default_model(config.llm.model.clone())
        .with_timeout(config.agent.request_timeout()))
}

pub fn build_services(config: &AppConfig) -> Result<Services> {
    let provider: Arc<dyn LlmProvider> = Arc::new(gemini_provider(config)?);
    build_services_with(config, provider, system_prompt(config))
}

/// Wire the pipeline around an already constructed provider.
pub fn build_services_with(
    config: &AppConfig,
    provider: Arc<dyn LlmProvider>,
    system_prompt: String,
) -> Result<Services> {
    config.validate_llm()?;
    let timeout = config.agent.request_timeout();

    let exchange = Exchange::new(
        provider,
        ExchangeSettings {
            model: config.llm.model.clone(),
            max_output_tokens: config.llm.max_output_tokens,
            temperature: config.llm.temperature,
            timeout,
        },
    );

    let registry = ToolRegistry::builder()
        .register(Arc::new(
            WeatherTool::new()
                .with_base_url(config.weather.base_url.clone())
                .with_timeout(timeout),
        ))
        .build();

    let dispatcher = ToolDispatcher::new(registry, exchange.clone());
    let engine = ConversationEngine::new(exchange.clone(), dispatcher, system_prompt);
    let decider = ResponseDecider::new(exchange.clone());
    let fetcher = HistoryFetcher::new(config.agent.history_window, timeout);

    let pipeline = MessagePipeline::new(
        fetcher,
        decider,
        engine.clone(),
        PipelineSettings {
            max_message_len: config.agent.max_message_len,
            send_timeout: timeout,
        },
    );

    info!(
        provider = exchange.provider_id(),
        model = %config.llm.model,
        history_window = config.agent.history_window,
        "conversation pipeline ready"
    );

    Ok(Services {
        exchange,
        engine,
        router: Arc::new(IncomingMessageRouter::new(Arc::new(pipeline))),
    })
}

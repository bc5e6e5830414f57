pub mod decider;
pub mod dispatcher;
pub mod engine;
pub mod exchange;
pub mod prompts;
pub mod providers;
pub mod tools;

pub use decider::{DecisionResult, ResponseDecider};
pub use dispatcher::{DispatchOutcome, ToolDispatcher};
pub use engine::{ConversationEngine, Reply};
pub use exchange::{Exchange, ExchangeSettings};
pub use providers::{
    ContentBlock, GeminiProvider, LlmProvider, LlmRequest, LlmResponse, ToolDefinition,
    TurnResult, Usage,
};
pub use tools::{Tool, ToolContext, ToolOutput, ToolRegistry, WeatherTool};

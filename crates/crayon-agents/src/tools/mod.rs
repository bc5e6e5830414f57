use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use crayon_common::Result;
use tracing::info;

use crate::providers::ToolDefinition;

pub mod weather;
pub use weather::WeatherTool;

/// A capability the model may ask to have executed on its behalf.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object.
    fn input_schema(&self) -> serde_json::Value;

    async fn execute(&self, context: &ToolContext, args: serde_json::Value) -> Result<ToolOutput>;
}

/// Where the request came from, for logging.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub channel_id: String,
    pub requested_by: Option<String>,
}

/// Raw result of a tool run. Expected to hold JSON, which may be either a
/// structured value or a bare string carrying an error message.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
}

impl ToolOutput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self {
            content: value.to_string(),
        }
    }

    /// An error message encoded as a JSON string.
    pub fn error_message(message: impl AsRef<str>) -> Self {
        Self::json(&serde_json::Value::String(message.as_ref().to_string()))
    }
}

/// Immutable name → tool mapping, fixed once built.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<BTreeMap<&'static str, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Declarations for one turn, built fresh on every call.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect()
    }
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        info!("registered tool: {}", tool.name());
        self.tools.insert(tool.name(), tool);
        self
    }

    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            tools: Arc::new(self.tools),
        }
    }
}

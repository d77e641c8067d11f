use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::llm::ToolDefinition;

mod notes;
mod shop;

pub use notes::{NoteStore, NoteTool, NOTE_SAVED};
pub use shop::{format_order, format_products, OrdersTool, ProductsTool};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<String>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions sorted by name so requests are stable across runs.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| {
                ToolDefinition::function(tool.name(), tool.description(), tool.parameters())
            })
            .collect();
        definitions.sort_by_key(|definition| definition.function.name);
        definitions
    }

    /// Runs a tool call and returns the text fed back to the model. Failures are
    /// reported to the model as text rather than aborting the turn.
    pub async fn dispatch(&self, name: &str, arguments: &str) -> String {
        let Some(tool) = self.tools.get(name) else {
            warn!(
                event_name = "agent.tool_unknown",
                tool = name,
                "model requested an unknown tool"
            );
            return format!("Error: unknown tool `{name}`");
        };

        let input = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            match serde_json::from_str::<Value>(arguments) {
                Ok(value) => value,
                Err(error) => return format!("Error: invalid arguments for `{name}`: {error}"),
            }
        };

        match tool.execute(input).await {
            Ok(output) => {
                info!(event_name = "agent.tool_executed", tool = name, "tool call completed");
                output
            }
            Err(error) => {
                warn!(
                    event_name = "agent.tool_failed",
                    tool = name,
                    error = %error,
                    "tool call failed"
                );
                format!("Error: {error}")
            }
        }
    }
}

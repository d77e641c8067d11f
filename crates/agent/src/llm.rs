use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storefront_core::config::LlmConfig;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry of the model-facing history, in chat-completions wire shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::Assistant, content)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: MessageRole, content: impl Into<String>) -> Self {
        Self { role, content: Some(content.into()), tool_calls: Vec::new(), tool_call_id: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments exactly as the model produced them.
    #[serde(default)]
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: FunctionDefinition,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: &'static str, description: &'static str, parameters: Value) -> Self {
        Self { kind: "function", function: FunctionDefinition { name, description, parameters } }
    }
}

fn function_kind() -> String {
    "function".to_string()
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends the history and the available tools, returning the assistant message.
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition])
        -> Result<ChatMessage>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

/// Chat-completions client for OpenAI and compatible providers.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Self::with_endpoint(
            &config.base_url,
            config.api_key.clone(),
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn with_endpoint(
        base_url: &str,
        api_key: SecretString,
        model: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("could not build llm http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            event_name = "llm.request",
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "calling chat completions"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&CompletionRequest { model: &self.model, messages, tools })
            .send()
            .await
            .context("chat completions request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("chat completions returned {status}: {}", truncate(&body, 200));
        }

        let completion: CompletionResponse =
            response.json().await.context("chat completions response was not valid JSON")?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("chat completions response had no choices"))?;

        Ok(ChatMessage {
            role: MessageRole::Assistant,
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            tool_call_id: None,
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ChatMessage, ToolCall, ToolDefinition};

    #[test]
    fn tool_result_messages_serialize_in_wire_shape() {
        let message = ChatMessage::tool_result("call_1", "saved note");

        let value = serde_json::to_value(&message).expect("serialize");

        assert_eq!(
            value,
            json!({ "role": "tool", "content": "saved note", "tool_call_id": "call_1" })
        );
    }

    #[test]
    fn plain_messages_omit_tool_fields() {
        let value = serde_json::to_value(ChatMessage::user("hi")).expect("serialize");
        assert_eq!(value, json!({ "role": "user", "content": "hi" }));
    }

    #[test]
    fn tool_calls_default_their_type() {
        let call: ToolCall = serde_json::from_value(json!({
            "id": "call_9",
            "function": { "name": "shopify_orders", "arguments": "{\"order_id\":\"1001\"}" }
        }))
        .expect("deserialize");

        assert_eq!(call.kind, "function");
        assert_eq!(call.function.name, "shopify_orders");
    }

    #[test]
    fn tool_definitions_use_function_envelope() {
        let definition =
            ToolDefinition::function("note_saver", "Save a note", json!({ "type": "object" }));

        let value = serde_json::to_value(definition).expect("serialize");

        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "note_saver");
        assert_eq!(value["function"]["parameters"]["type"], "object");
    }
}

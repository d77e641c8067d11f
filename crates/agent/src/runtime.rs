use std::sync::Arc;

use storefront_core::ApplicationError;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, LlmClient};
use crate::session::SessionContext;
use crate::tools::ToolRegistry;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("language model request failed: {0:#}")]
    Llm(anyhow::Error),
    #[error("agent did not produce an answer within {max_steps} steps")]
    StepLimit { max_steps: u32 },
}

impl From<AgentError> for ApplicationError {
    fn from(error: AgentError) -> Self {
        match error {
            AgentError::Llm(_) => ApplicationError::LlmUnavailable(error.to_string()),
            AgentError::StepLimit { .. } => ApplicationError::TurnFailed(error.to_string()),
        }
    }
}

/// Tool-calling loop over one session's model history.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    max_steps: u32,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, max_steps: u32) -> Self {
        Self { llm, tools, max_steps: max_steps.max(1) }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Runs one user turn to completion and returns the assistant's reply text.
    ///
    /// Each step sends the history to the model. A reply without tool calls ends
    /// the turn; otherwise every call is dispatched and its output appended
    /// before the next step. On failure the history is rolled back to where it
    /// was before the turn, so a retried turn starts clean.
    pub async fn handle_turn(
        &self,
        session: &mut SessionContext,
        prompt: &str,
    ) -> Result<String, AgentError> {
        let conversation = session.conversation_mut();
        let checkpoint = conversation.len();
        conversation.push(ChatMessage::user(prompt));
        let definitions = self.tools.definitions();

        for step in 1..=self.max_steps {
            let reply = match self.llm.chat(conversation.messages(), &definitions).await {
                Ok(reply) => reply,
                Err(error) => {
                    conversation.rollback(checkpoint);
                    return Err(AgentError::Llm(error));
                }
            };
            conversation.push(reply.clone());

            if reply.tool_calls.is_empty() {
                debug!(
                    event_name = "agent.turn_completed",
                    steps = step,
                    "agent produced an answer"
                );
                return Ok(reply.content.unwrap_or_default());
            }

            for call in &reply.tool_calls {
                let output =
                    self.tools.dispatch(&call.function.name, &call.function.arguments).await;
                conversation.push(ChatMessage::tool_result(call.id.clone(), output));
            }
        }

        warn!(
            event_name = "agent.step_limit",
            max_steps = self.max_steps,
            "agent stopped before producing an answer"
        );
        conversation.rollback(checkpoint);
        Err(AgentError::StepLimit { max_steps: self.max_steps })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use storefront_core::ApplicationError;

    use super::{AgentError, AgentRuntime};
    use crate::llm::{ChatMessage, FunctionCall, LlmClient, MessageRole, ToolCall, ToolDefinition};
    use crate::session::{SessionContext, SessionId};
    use crate::tools::{Tool, ToolRegistry};

    /// Replays scripted replies and records what it was sent.
    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<ChatMessage>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<ChatMessage>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into()), seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<ChatMessage> {
            self.seen.lock().expect("lock").push(messages.to_vec());
            self.replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Ok(tool_call("lookup", "{}")))
        }
    }

    struct Lookup;

    #[async_trait]
    impl Tool for Lookup {
        fn name(&self) -> &'static str {
            "lookup"
        }

        fn description(&self) -> &'static str {
            "Look something up"
        }

        fn parameters(&self) -> Value {
            json!({ "type": "object" })
        }

        async fn execute(&self, _input: Value) -> Result<String> {
            Ok("Product: Blue Mug".to_string())
        }
    }

    fn tool_call(name: &str, arguments: &str) -> ChatMessage {
        ChatMessage {
            role: MessageRole::Assistant,
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                kind: "function".to_string(),
                function: FunctionCall { name: name.to_string(), arguments: arguments.to_string() },
            }],
            tool_call_id: None,
        }
    }

    fn runtime(llm: Arc<ScriptedLlm>, max_steps: u32) -> AgentRuntime {
        let mut tools = ToolRegistry::default();
        tools.register(Lookup);
        AgentRuntime::new(llm, tools, max_steps)
    }

    fn session() -> SessionContext {
        SessionContext::new(SessionId::new(), "system prompt")
    }

    #[tokio::test]
    async fn plain_answer_ends_the_turn() {
        let llm = ScriptedLlm::new(vec![Ok(ChatMessage::assistant("Hello!"))]);
        let mut session = session();

        let reply = runtime(llm, 8).handle_turn(&mut session, "hi").await.expect("answer");

        assert_eq!(reply, "Hello!");
        assert_eq!(session.conversation().len(), 3);
    }

    #[tokio::test]
    async fn tool_results_are_fed_back_before_the_answer() {
        let llm = ScriptedLlm::new(vec![
            Ok(tool_call("lookup", "{}")),
            Ok(ChatMessage::assistant("<h3>Blue Mug</h3>")),
        ]);
        let mut session = session();

        let reply =
            runtime(llm.clone(), 8).handle_turn(&mut session, "mugs?").await.expect("answer");

        assert_eq!(reply, "<h3>Blue Mug</h3>");
        let seen = llm.seen.lock().expect("lock");
        let second_request = &seen[1];
        let tool_message = second_request.last().expect("tool result");
        assert_eq!(tool_message.role, MessageRole::Tool);
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(tool_message.content.as_deref(), Some("Product: Blue Mug"));
    }

    #[tokio::test]
    async fn step_limit_aborts_and_rolls_back_history() {
        let llm = ScriptedLlm::new(vec![]);
        let mut session = session();

        let error = runtime(llm, 3).handle_turn(&mut session, "loop").await.expect_err("limit");

        assert!(matches!(error, AgentError::StepLimit { max_steps: 3 }));
        assert_eq!(session.conversation().len(), 1);
        assert!(matches!(ApplicationError::from(error), ApplicationError::TurnFailed(_)));
    }

    #[tokio::test]
    async fn llm_failure_maps_to_unavailable() {
        let llm = ScriptedLlm::new(vec![Err(anyhow!("connection refused"))]);
        let mut session = session();

        let error = runtime(llm, 8).handle_turn(&mut session, "hi").await.expect_err("failure");
        let mapped = ApplicationError::from(error);

        assert!(matches!(mapped, ApplicationError::LlmUnavailable(ref message)
            if message.contains("connection refused")));
        assert_eq!(session.conversation().len(), 1);
    }

    #[tokio::test]
    async fn history_carries_across_turns() {
        let llm = ScriptedLlm::new(vec![
            Ok(ChatMessage::assistant("first")),
            Ok(ChatMessage::assistant("second")),
        ]);
        let runtime = runtime(llm.clone(), 8);
        let mut session = session();

        runtime.handle_turn(&mut session, "one").await.expect("first turn");
        runtime.handle_turn(&mut session, "two").await.expect("second turn");

        let seen = llm.seen.lock().expect("lock");
        let contents: Vec<Option<&str>> =
            seen[1].iter().map(|message| message.content.as_deref()).collect();
        assert_eq!(contents, vec![Some("system prompt"), Some("one"), Some("first"), Some("two")]);
    }
}

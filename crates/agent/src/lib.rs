//! Agent runtime for the storefront assistant.
//!
//! The agent answers shoppers through a tool-calling loop:
//! 1. **Conversation** (`conversation`) - system prompt and the LLM-facing history
//! 2. **Model calls** (`llm`) - OpenAI-compatible chat completions with tool definitions
//! 3. **Tool execution** (`tools`) - product listing, order lookup and note saving
//! 4. **Turn handling** (`assistant`) - transcript bookkeeping and product-card enhancement
//!
//! The model only writes prose. Product cards are rendered from catalog data by
//! the core enhancer after the reply is produced.

pub mod assistant;
pub mod conversation;
pub mod llm;
pub mod runtime;
pub mod session;
pub mod tools;

pub use assistant::{Assistant, TurnError, TurnReply};
pub use conversation::{system_prompt, Conversation};
pub use llm::{ChatMessage, LlmClient, MessageRole, OpenAiClient, ToolCall, ToolDefinition};
pub use runtime::{AgentError, AgentRuntime};
pub use session::{SessionContext, SessionHandle, SessionId, SessionStore};
pub use tools::{NoteStore, NoteTool, OrdersTool, ProductsTool, Tool, ToolRegistry};

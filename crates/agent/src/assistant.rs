use storefront_core::{ApplicationError, ChatRecord, EnhanceOutcome, Enhancer};
use thiserror::Error;
use tracing::{info, warn};

use crate::runtime::AgentRuntime;
use crate::session::{SessionId, SessionStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    pub session_id: SessionId,
    /// Assistant reply after product cards were spliced in.
    pub reply: String,
    pub outcome: EnhanceOutcome,
}

impl TurnReply {
    pub fn enhanced(&self) -> bool {
        matches!(self.outcome, EnhanceOutcome::Enhanced { .. })
    }
}

#[derive(Debug, Error)]
#[error("turn failed in session {session_id}: {error}")]
pub struct TurnError {
    pub session_id: SessionId,
    #[source]
    pub error: ApplicationError,
}

/// Serves chat turns: records the shopper message, runs the agent, enhances the
/// reply with product cards and records it.
pub struct Assistant {
    runtime: AgentRuntime,
    enhancer: Enhancer,
    sessions: SessionStore,
}

impl Assistant {
    pub fn new(runtime: AgentRuntime, enhancer: Enhancer, sessions: SessionStore) -> Self {
        Self { runtime, enhancer, sessions }
    }

    pub fn runtime(&self) -> &AgentRuntime {
        &self.runtime
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn enhancer(&self) -> &Enhancer {
        &self.enhancer
    }

    /// A failed agent run leaves the shopper's message in the transcript and the
    /// session usable for the next turn.
    pub async fn handle_turn(
        &self,
        session_id: Option<SessionId>,
        message: &str,
    ) -> Result<TurnReply, TurnError> {
        let prompt = message.trim();
        if prompt.is_empty() {
            return Err(TurnError {
                session_id: session_id.unwrap_or_default(),
                error: ApplicationError::InvalidInput("message must not be empty".to_string()),
            });
        }

        let (session_id, handle) = self.sessions.open(session_id);
        let mut session = handle.lock().await;
        session.record(ChatRecord::user(prompt));

        let reply = match self.runtime.handle_turn(&mut session, prompt).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(
                    event_name = "chat.turn_failed",
                    session_id = %session_id,
                    error = %error,
                    "agent turn aborted"
                );
                return Err(TurnError { session_id, error: error.into() });
            }
        };

        let enhancement = self.enhancer.enhance_with_report(&reply).await;
        session.record(ChatRecord::assistant(enhancement.text.clone()));
        info!(
            event_name = "chat.turn_completed",
            session_id = %session_id,
            outcome = ?enhancement.outcome,
            "assistant replied"
        );

        Ok(TurnReply { session_id, reply: enhancement.text, outcome: enhancement.outcome })
    }

    pub async fn transcript(&self, session_id: SessionId) -> Option<Vec<ChatRecord>> {
        let handle = self.sessions.get(session_id)?;
        let session = handle.lock().await;
        Some(session.transcript().to_vec())
    }
}

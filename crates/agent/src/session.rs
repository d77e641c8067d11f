use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use storefront_core::ChatRecord;
use uuid::Uuid;

use crate::conversation::Conversation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

/// Everything one chat session accumulates: the transcript shown to the shopper
/// and the history sent to the model.
#[derive(Clone, Debug)]
pub struct SessionContext {
    id: SessionId,
    transcript: Vec<ChatRecord>,
    conversation: Conversation,
}

impl SessionContext {
    pub fn new(id: SessionId, system_prompt: impl Into<String>) -> Self {
        Self { id, transcript: Vec::new(), conversation: Conversation::new(system_prompt) }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn transcript(&self) -> &[ChatRecord] {
        &self.transcript
    }

    pub fn record(&mut self, record: ChatRecord) {
        self.transcript.push(record);
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }
}

pub type SessionHandle = Arc<tokio::sync::Mutex<SessionContext>>;

/// In-memory sessions, created on first use and kept for the life of the process.
///
/// The outer map lock is only held to look up or insert a handle. Turns lock the
/// per-session handle, so one session is served one turn at a time while other
/// sessions proceed.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
    system_prompt: String,
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), system_prompt: system_prompt.into() }
    }

    /// Returns the session for `id`, creating it when absent. `None` always opens
    /// a fresh session.
    pub fn open(&self, id: Option<SessionId>) -> (SessionId, SessionHandle) {
        let id = id.unwrap_or_default();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = sessions
            .entry(id)
            .or_insert_with(|| {
                let context = SessionContext::new(id, self.system_prompt.clone());
                Arc::new(tokio::sync::Mutex::new(context))
            })
            .clone();
        (id, handle)
    }

    pub fn get(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storefront_core::ChatRecord;

    use super::{SessionId, SessionStore};

    #[tokio::test]
    async fn open_creates_once_and_reuses() {
        let store = SessionStore::new("prompt");

        let (id, first) = store.open(None);
        first.lock().await.record(ChatRecord::user("hi"));
        let (same_id, second) = store.open(Some(id));

        assert_eq!(id, same_id);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().await.transcript().len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_id_is_adopted() {
        let store = SessionStore::new("prompt");
        let requested = SessionId::new();

        let (id, handle) = store.open(Some(requested));

        assert_eq!(id, requested);
        assert_eq!(handle.lock().await.id(), requested);
        assert!(store.get(requested).is_some());
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new("prompt");

        let (first, _) = store.open(None);
        let (second, _) = store.open(None);

        assert_ne!(first, second);
        assert!(store.get(SessionId::new()).is_none());
    }

    #[test]
    fn session_ids_parse_from_strings() {
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().expect("parse"), id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}

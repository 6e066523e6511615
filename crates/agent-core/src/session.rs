//! Session Management
//!
//! Officer-owned, multi-turn chat sessions. Messages are append-only and
//! strictly ordered; a session id never changes once issued.
//!
//! Writers serialize per session through [`SessionStore::lock`]: a chat
//! turn holds the guard from loading history until its reply is appended,
//! so two concurrent turns on one session never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};

/// Maximum characters of the first message used as a session title
const TITLE_MAX_CHARS: usize = 80;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A complete agent session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    id: SessionId,

    /// Officer who exclusively owns this session
    pub owner: String,

    /// Title, derived from the first message
    pub title: String,

    /// Conversation history
    pub conversation: Conversation,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,

    /// Whether session is active
    pub active: bool,
}

impl Session {
    /// Create a new session owned by `owner`, titled from its first message
    pub fn new(owner: impl Into<String>, first_message: &str) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            owner: owner.into(),
            title: Self::title_from(first_message),
            conversation: Conversation::new(),
            created_at: now,
            updated_at: now,
            active: true,
        }
    }

    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// First characters of a message, used as the session title
    pub fn title_from(message: &str) -> String {
        message.trim().chars().take(TITLE_MAX_CHARS).collect()
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Append a message, preserving insertion order
    pub fn append(&mut self, message: Message) {
        self.conversation.push(message);
        self.touch();
    }

    /// End the session
    pub fn end(&mut self) {
        self.active = false;
        self.touch();
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    /// Whether `officer` owns this session
    pub fn is_owned_by(&self, officer: &str) -> bool {
        self.owner == officer
    }
}

/// Exclusive right to write to one session
pub type SessionGuard = OwnedMutexGuard<()>;

/// Per-session write locks, created on first use
#[derive(Default)]
pub struct SessionLocks {
    locks: std::sync::Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`
    pub async fn acquire(&self, id: &SessionId) -> SessionGuard {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            // Holders and waiters keep a clone, so a lone entry is idle
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Session store trait for persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new session with a freshly generated id
    async fn create(&self, owner: &str, first_message: &str) -> Result<Session>;

    /// Load a session, only if `owner` owns it
    async fn get(&self, id: &SessionId, owner: &str) -> Result<Option<Session>>;

    /// Append one message to the end of a session
    async fn append(&self, id: &SessionId, message: Message) -> Result<()>;

    /// All messages of a session in insertion order
    async fn messages(&self, id: &SessionId) -> Result<Vec<Message>>;

    /// Sessions owned by `owner`, most recently updated first
    async fn list(&self, owner: &str, limit: usize) -> Result<Vec<Session>>;

    /// Mark a session inactive. Returns false if not found for `owner`.
    async fn deactivate(&self, id: &SessionId, owner: &str) -> Result<bool>;

    /// Serialize writers on one session
    async fn lock(&self, id: &SessionId) -> SessionGuard;
}

/// In-memory session store (for development/testing)
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    locks: SessionLocks,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, owner: &str, first_message: &str) -> Result<Session> {
        let mut sessions = self.sessions.write().await;

        let mut session = Session::new(owner, first_message);
        while sessions.contains_key(session.id()) {
            session.id = SessionId::new();
        }

        sessions.insert(session.id.clone(), session.clone());
        tracing::debug!(session_id = %session.id, owner, "Created session");
        Ok(session)
    }

    async fn get(&self, id: &SessionId, owner: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).filter(|s| s.is_owned_by(owner)).cloned())
    }

    async fn append(&self, id: &SessionId, message: Message) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))?;
        session.append(message);
        Ok(())
    }

    async fn messages(&self, id: &SessionId) -> Result<Vec<Message>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .map(|s| s.conversation.messages().to_vec())
            .ok_or_else(|| AgentError::SessionNotFound(id.to_string()))
    }

    async fn list(&self, owner: &str, limit: usize) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut result: Vec<_> = sessions
            .values()
            .filter(|s| s.is_owned_by(owner))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }

    async fn deactivate(&self, id: &SessionId, owner: &str) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id).filter(|s| s.is_owned_by(owner)) {
            Some(session) => {
                session.end();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn lock(&self, id: &SessionId) -> SessionGuard {
        self.locks.acquire(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use std::time::Duration;

    #[test]
    fn test_session_creation() {
        let session = Session::new("officer-1", "What are the most common crimes in Kampala?");
        assert!(session.active);
        assert_eq!(session.message_count(), 0);
        assert_eq!(session.title, "What are the most common crimes in Kampala?");
    }

    #[test]
    fn test_title_is_truncated_to_80_chars() {
        let long = "x".repeat(200);
        assert_eq!(Session::title_from(&long).chars().count(), 80);
    }

    #[tokio::test]
    async fn test_append_and_read_back_in_order() {
        let store = MemorySessionStore::new();
        let session = store.create("officer-1", "first").await.unwrap();

        for i in 0..20 {
            let msg = if i % 2 == 0 {
                Message::user(format!("question {i}"))
            } else {
                Message::assistant(format!("answer {i}"))
            };
            store.append(session.id(), msg).await.unwrap();
        }

        let messages = store.messages(session.id()).await.unwrap();
        assert_eq!(messages.len(), 20);
        for (i, msg) in messages.iter().enumerate() {
            let expected_role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(msg.role, expected_role);
            assert!(msg.content.ends_with(&i.to_string()));
        }
    }

    #[tokio::test]
    async fn test_sessions_are_owner_scoped() {
        let store = MemorySessionStore::new();
        let session = store.create("officer-1", "hello").await.unwrap();

        assert!(store.get(session.id(), "officer-1").await.unwrap().is_some());
        assert!(store.get(session.id(), "officer-2").await.unwrap().is_none());
        assert!(store.list("officer-2", 10).await.unwrap().is_empty());
        assert!(!store.deactivate(session.id(), "officer-2").await.unwrap());
        assert!(store.deactivate(session.id(), "officer-1").await.unwrap());

        let ended = store.get(session.id(), "officer-1").await.unwrap().unwrap();
        assert!(!ended.active);
    }

    #[tokio::test]
    async fn test_session_ids_are_unique() {
        let store = MemorySessionStore::new();
        let a = store.create("o", "a").await.unwrap();
        let b = store.create("o", "b").await.unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_append_to_unknown_session_fails() {
        let store = MemorySessionStore::new();
        let result = store
            .append(&SessionId::from_string("missing"), Message::user("hi"))
            .await;
        assert!(matches!(result, Err(AgentError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_idle_session_locks_are_pruned() {
        let locks = SessionLocks::new();
        let (a, b, c) = (SessionId::new(), SessionId::new(), SessionId::new());

        drop(locks.acquire(&a).await);
        let held = locks.acquire(&b).await;
        assert_eq!(locks.tracked(), 1);

        let _other = locks.acquire(&c).await;
        assert_eq!(locks.tracked(), 2);

        // A held lock survives pruning and still excludes
        let waiter = tokio::time::timeout(Duration::from_millis(20), locks.acquire(&b)).await;
        assert!(waiter.is_err());
        drop(held);
        let _again = locks.acquire(&b).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_locked_turns_do_not_interleave() {
        let store = Arc::new(MemorySessionStore::new());
        let session = store.create("o", "start").await.unwrap();
        let id = session.id().clone();

        let mut handles = Vec::new();
        for turn in 0..8 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let _guard = store.lock(&id).await;
                store.append(&id, Message::user(format!("q{turn}"))).await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
                store.append(&id, Message::assistant(format!("a{turn}"))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let messages = store.messages(&id).await.unwrap();
        assert_eq!(messages.len(), 16);
        for pair in messages.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }
}

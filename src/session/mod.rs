//! Session module - conversation state for one agent run
//!
//! A [`Session`] owns the conversation history, the [`Coordinator`] for its
//! extension points, an iteration counter and the [`EventLog`] of every
//! event emitted while it ran. Sessions are independent: forking copies the
//! history but nothing else.
//!
//! # Example
//!
//! ```
//! use agentkernel::session::{MemorySessionStore, Message, Session, SessionStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemorySessionStore::new();
//!     let mut session = Session::new();
//!     session.history.push(Message::user("Hello!"));
//!
//!     store.save(&session.snapshot()).await.unwrap();
//!     let loaded = store.load(session.id()).await.unwrap();
//!     assert_eq!(loaded.history.len(), 1);
//! }
//! ```

mod event_log;
pub mod types;

pub use event_log::{EventLog, EventRecord};
pub use types::{Message, Role, ToolCall};

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::HooksConfig;
use crate::coordinator::Coordinator;
use crate::error::{KernelError, Result};
use crate::hooks::events;

/// One agent run's state.
#[derive(Debug)]
pub struct Session {
    id: String,
    parent_id: Option<String>,
    /// Conversation history, oldest first.
    pub history: Vec<Message>,
    coordinator: Coordinator,
    hooks_config: HooksConfig,
    /// Completion requests made so far.
    pub iteration: u32,
    created_at: DateTime<Utc>,
    event_log: EventLog,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a session with default hook settings.
    pub fn new() -> Self {
        Self::with_config(&HooksConfig::default())
    }

    pub fn with_config(hooks_config: &HooksConfig) -> Self {
        Self::build(uuid::Uuid::new_v4().to_string(), None, Vec::new(), hooks_config, EventLog::new())
    }

    fn build(
        id: String,
        parent_id: Option<String>,
        history: Vec<Message>,
        hooks_config: &HooksConfig,
        event_log: EventLog,
    ) -> Self {
        let coordinator = Coordinator::new(&id, hooks_config, event_log.clone());
        Self {
            id,
            parent_id,
            history,
            coordinator,
            hooks_config: hooks_config.clone(),
            iteration: 0,
            created_at: Utc::now(),
            event_log,
        }
    }

    /// Rebuild a session from a snapshot. Hooks must be mounted again.
    pub fn restore(snapshot: SessionSnapshot, hooks_config: &HooksConfig) -> Self {
        let mut session = Self::build(
            snapshot.id,
            snapshot.parent_id,
            snapshot.history,
            hooks_config,
            EventLog::from_records(snapshot.events),
        );
        session.iteration = snapshot.iteration;
        session.created_at = snapshot.created_at;
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Request cooperative cancellation of whatever this session is running.
    pub fn cancel(&self) -> bool {
        self.coordinator.cancellation().cancel()
    }

    /// Start a child session with a copy of this session's history.
    ///
    /// The child gets a fresh id, hook registry, cancellation token and
    /// event log. Emits `session:fork` on the parent.
    pub async fn fork(&self) -> Session {
        let child = Self::build(
            uuid::Uuid::new_v4().to_string(),
            Some(self.id.clone()),
            self.history.clone(),
            &self.hooks_config,
            EventLog::new(),
        );
        info!(parent = %self.id, child = %child.id, "Forked session");
        self.coordinator
            .hooks()
            .notify(
                events::SESSION_FORK,
                json!({
                    "session_id": self.id,
                    "child_session_id": child.id,
                    "message_count": child.history.len(),
                }),
            )
            .await;
        child
    }

    /// Serializable copy of the session's persisted state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            parent_id: self.parent_id.clone(),
            history: self.history.clone(),
            events: self.event_log.snapshot(),
            iteration: self.iteration,
            created_at: self.created_at,
        }
    }
}

/// Persisted form of a [`Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub parent_id: Option<String>,
    pub history: Vec<Message>,
    pub events: Vec<EventRecord>,
    pub iteration: u32,
    pub created_at: DateTime<Utc>,
}

/// Storage for session snapshots.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;

    /// # Errors
    /// Returns [`KernelError::NotFound`] for an unknown id.
    async fn load(&self, id: &str) -> Result<SessionSnapshot>;

    async fn delete(&self, id: &str) -> Result<bool>;

    /// Stored session ids, sorted.
    async fn list(&self) -> Result<Vec<String>>;
}

/// In-memory [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionSnapshot>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<SessionSnapshot> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| KernelError::NotFound(format!("session '{}'", id)))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

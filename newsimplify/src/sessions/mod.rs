use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::llm::{ChatMessage, Role};
use crate::search::SearchResult;
use crate::tools::detect_tool_call;

pub mod conversation;

pub use conversation::{Conversation, TurnOutcome};

/// One user's conversation: the transcript plus the articles currently on offer.
/// Nothing here is persisted; a session lives as long as its owner keeps it.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
    offered: Vec<SearchResult>,
}

/// How a user input relates to the offered articles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Not a bare number, or nothing is on offer
    NotASelection,
    /// 0-based index into the offered articles
    Article(usize),
    OutOfRange,
}

/// Message as shown to the user
#[derive(Debug, Clone, Serialize)]
pub struct VisibleMessage {
    pub role: Role,
    pub content: String,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            messages: vec![ChatMessage::system(system_prompt)],
            offered: Vec::new(),
        }
    }

    /// Full transcript, in order, as replayed to the model
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn offered_articles(&self) -> &[SearchResult] {
        &self.offered
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub(crate) fn replace_offered(&mut self, articles: Vec<SearchResult>) {
        self.offered = articles;
    }

    /// Resolve a 1-based numeric selection against the offered articles
    pub fn resolve_selection(&self, input: &str) -> Selection {
        if self.offered.is_empty() || input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
            return Selection::NotASelection;
        }

        match input.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
            Some(idx) if idx < self.offered.len() => Selection::Article(idx),
            _ => Selection::OutOfRange,
        }
    }

    /// User and assistant messages, without assistant messages that carry a tool call
    pub fn visible_messages(&self) -> Vec<VisibleMessage> {
        self.messages
            .iter()
            .filter(|m| match m.role {
                Role::User => true,
                Role::Assistant => detect_tool_call(&m.content).is_none(),
                Role::System | Role::Function => false,
            })
            .map(|m| VisibleMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }
}

/// Default idle lifetime of a session
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

struct RegistryEntry {
    session: Arc<Mutex<Session>>,
    last_active: Instant,
}

/// In-memory sessions keyed by id. Each session has its own lock, so turns of
/// different sessions never contend. Sessions idle for longer than the idle
/// timeout are swept whenever a new session is inserted.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, RegistryEntry>>>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    pub async fn insert(&self, session: Session) -> Uuid {
        let id = session.id;
        let mut sessions = self.sessions.write().await;
        Self::sweep(&mut sessions, self.idle_timeout);
        sessions.insert(
            id,
            RegistryEntry {
                session: Arc::new(Mutex::new(session)),
                last_active: Instant::now(),
            },
        );
        id
    }

    /// Look up a session and mark it active
    pub async fn get(&self, id: &Uuid) -> Option<Arc<Mutex<Session>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_active = Instant::now();
        Some(entry.session.clone())
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Drop every session idle for longer than the idle timeout; returns how many went
    pub async fn evict_idle(&self) -> usize {
        Self::sweep(&mut *self.sessions.write().await, self.idle_timeout)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn sweep(sessions: &mut HashMap<Uuid, RegistryEntry>, idle_timeout: Duration) -> usize {
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = entry.last_active.elapsed() < idle_timeout;
            if !keep {
                debug!(session_id = %id, "session: evicted after idle timeout");
            }
            keep
        });
        before - sessions.len()
    }
}

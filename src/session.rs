use std::sync::Arc;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::record_store::RecordStore;

pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged turn of a session's conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

/// Per-client conversation state: an optional ingested flight log and the
/// accumulated chat history.
#[derive(Debug, Default)]
pub struct Session {
    pub flight_data: Option<RecordStore>,
    pub history: Vec<ChatTurn>,
}

impl Session {
    pub fn append_turn(&mut self, turn: ChatTurn) {
        self.history.push(turn);
    }

    /// Full accumulated history, in turn order, including any turn just
    /// appended. This is what the next completion request carries.
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }
}

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_active: DateTime<Utc>,
}

/// Sessions keyed by an opaque client-supplied id, created on first access.
///
/// Each session sits behind its own lock so two requests against the same
/// session serialize while distinct sessions never contend. The store is
/// size-bounded: creating a session past `max_sessions` evicts the least
/// recently active one.
pub struct SessionStore {
    sessions: RwLock<FxHashMap<String, SessionEntry>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(FxHashMap::default()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Fetch a session, creating it on first use and marking it active.
    pub async fn session(&self, id: &str) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.write().await;

        if !sessions.contains_key(id) && sessions.len() >= self.max_sessions {
            self.evict_oldest(&mut sessions);
        }

        let entry = sessions.entry(id.to_string()).or_insert_with(|| {
            debug!("Creating session {}", id);
            SessionEntry {
                session: Arc::new(Mutex::new(Session::default())),
                last_active: Utc::now(),
            }
        });
        entry.last_active = Utc::now();
        entry.session.clone()
    }

    /// Attach ingested flight data to a session, replacing any previous log.
    pub async fn set_flight_data(&self, id: &str, store: RecordStore) {
        let session = self.session(id).await;
        session.lock().await.flight_data = Some(store);
    }

    /// Snapshot of a session's flight data, if it has any. `None` both for
    /// unknown sessions and for sessions that never uploaded a log.
    pub async fn flight_data(&self, id: &str) -> Option<RecordStore> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(id)?;
        let session = entry.session.clone();
        drop(sessions);
        let data = session.lock().await.flight_data.clone();
        data
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn evict_oldest(&self, sessions: &mut FxHashMap<String, SessionEntry>) {
        let oldest = sessions
            .iter()
            .min_by_key(|(_, entry)| entry.last_active)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            debug!("Evicting least recently active session {}", id);
            sessions.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_created_on_first_use() {
        let store = SessionStore::new(8);
        assert_eq!(store.session_count().await, 0);

        let session = store.session("alpha").await;
        session.lock().await.append_turn(ChatTurn::user("hello"));

        assert_eq!(store.session_count().await, 1);
        let again = store.session("alpha").await;
        assert_eq!(again.lock().await.history.len(), 1);
    }

    #[tokio::test]
    async fn test_history_keeps_turn_order() {
        let store = SessionStore::new(8);
        let session = store.session("alpha").await;
        {
            let mut guard = session.lock().await;
            guard.append_turn(ChatTurn::user("first"));
            guard.append_turn(ChatTurn::assistant("second"));
            guard.append_turn(ChatTurn::user("third"));
        }

        let guard = session.lock().await;
        let contents: Vec<&str> = guard.history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_flight_data_roundtrip() {
        let store = SessionStore::new(8);
        assert!(store.flight_data("alpha").await.is_none());

        store.set_flight_data("alpha", RecordStore::new()).await;
        assert!(store.flight_data("alpha").await.is_some());
        // A session with history only still reports no flight data.
        store.session("beta").await;
        assert!(store.flight_data("beta").await.is_none());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_active() {
        let store = SessionStore::new(2);
        store
            .session("a")
            .await
            .lock()
            .await
            .append_turn(ChatTurn::user("kept"));
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store
            .session("b")
            .await
            .lock()
            .await
            .append_turn(ChatTurn::user("dropped"));
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        // Touch "a" so "b" becomes the eviction candidate.
        store.session("a").await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        store.session("c").await;
        assert_eq!(store.session_count().await, 2);

        // "a" survived with its history; "b" comes back empty.
        assert_eq!(store.session("a").await.lock().await.history.len(), 1);
        assert!(store.session("b").await.lock().await.history.is_empty());
    }

    #[test]
    fn test_turn_serialization() {
        let turn = ChatTurn::user("what happened at t=10?");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "what happened at t=10?");
    }
}

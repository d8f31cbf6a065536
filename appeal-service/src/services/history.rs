//! In-memory conversation histories keyed by session id.

use crate::models::{Conversation, ConversationTurn};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Session used when a request does not name one.
pub const DEFAULT_SESSION: &str = "default";

/// Per-session conversation histories.
///
/// Each session has its own async mutex. Holding the guard across an
/// upstream call serializes asks on that session, while other sessions
/// proceed independently. A clear waits for an in-flight ask to finish.
#[derive(Clone, Default)]
pub struct HistoryStore {
    sessions: Arc<DashMap<String, Arc<Mutex<Conversation>>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, session_id: &str) -> Arc<Mutex<Conversation>> {
        // The map shard lock is released before the caller awaits
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Exclusive access to a session's conversation, creating it if needed.
    pub async fn session(&self, session_id: &str) -> OwnedMutexGuard<Conversation> {
        self.entry(session_id).lock_owned().await
    }

    /// Reset a session to empty and forget it.
    ///
    /// The entry survives only while another request is already waiting
    /// on the same session; that request then sees the emptied history.
    pub async fn clear(&self, session_id: &str) {
        let session = self.sessions.get(session_id).map(|s| s.value().clone());
        if let Some(session) = session {
            let mut conversation = session.lock().await;
            conversation.clear();
            // Map plus our clone: nobody else holds the session
            self.sessions.remove_if(session_id, |_, current| {
                Arc::ptr_eq(current, &session) && Arc::strong_count(current) == 2
            });
            drop(conversation);
        }
        tracing::debug!(session_id, "Conversation history cleared");
    }

    /// Copy of a session's turns; empty for unknown sessions.
    pub async fn snapshot(&self, session_id: &str) -> Vec<ConversationTurn> {
        let session = self.sessions.get(session_id).map(|s| s.value().clone());
        match session {
            Some(session) => session.lock().await.turns().to_vec(),
            None => Vec::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = HistoryStore::new();
        store.session("a").await.record_exchange("q-a", "r-a");
        store.session("b").await.record_exchange("q-b", "r-b");

        assert_eq!(
            store.snapshot("a").await,
            vec![
                ConversationTurn::user("q-a"),
                ConversationTurn::assistant("r-a")
            ]
        );
        assert_eq!(store.snapshot("b").await.len(), 2);
        assert_eq!(store.session_count(), 2);
    }

    #[tokio::test]
    async fn clear_only_affects_one_session() {
        let store = HistoryStore::new();
        store.session("a").await.record_exchange("q", "r");
        store.session(DEFAULT_SESSION).await.record_exchange("q", "r");

        store.clear(DEFAULT_SESSION).await;

        assert!(store.snapshot(DEFAULT_SESSION).await.is_empty());
        assert_eq!(store.snapshot("a").await.len(), 2);
    }

    #[tokio::test]
    async fn cleared_sessions_are_released() {
        let store = HistoryStore::new();
        for i in 0..1000 {
            let id = format!("session-{}", i);
            store.session(&id).await.record_exchange("q", "r");
            store.clear(&id).await;
        }

        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn clear_keeps_session_another_ask_is_waiting_on() {
        let store = HistoryStore::new();
        let guard = store.session("a").await;

        let clearing = {
            let store = store.clone();
            tokio::spawn(async move { store.clear("a").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Queued behind the clear on the same session
        let waiting = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut conversation = store.session("a").await;
                conversation.record_exchange("after clear", "answer");
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        clearing.await.unwrap();
        waiting.await.unwrap();

        assert_eq!(store.snapshot("a").await.len(), 2);
    }

    #[tokio::test]
    async fn clearing_unknown_session_is_a_no_op() {
        let store = HistoryStore::new();
        store.clear("missing").await;
        assert!(store.snapshot("missing").await.is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn clear_waits_for_held_session() {
        let store = HistoryStore::new();
        let mut guard = store.session("a").await;

        let clearing = {
            let store = store.clone();
            tokio::spawn(async move { store.clear("a").await })
        };

        // The clear cannot run while the guard is held
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!clearing.is_finished());

        guard.record_exchange("q", "r");
        drop(guard);
        clearing.await.unwrap();

        assert!(store.snapshot("a").await.is_empty());
    }
}

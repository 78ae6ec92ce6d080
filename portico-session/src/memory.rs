//! In-memory session store (single process, development and tests)

use crate::error::SessionResult;
use crate::traits::{Session, SessionStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Saves between two sweeps of expired sessions
pub const DEFAULT_PRUNE_INTERVAL: usize = 64;

/// Session store keeping every session in a shared map.
///
/// Expired sessions are evicted when looked up, and every
/// `prune_interval`-th save sweeps the whole map.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    saves: Arc<AtomicUsize>,
    prune_interval: usize,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            saves: Arc::new(AtomicUsize::new(0)),
            prune_interval: DEFAULT_PRUNE_INTERVAL,
        }
    }
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweep expired sessions every `interval` saves (at least every save)
    pub fn with_prune_interval(mut self, interval: usize) -> Self {
        self.prune_interval = interval.max(1);
        self
    }

    /// Remove every session
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str) -> SessionResult<Option<Session>> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                Some(session) if session.is_expired() => {}
                Some(session) => return Ok(Some(session.clone())),
                None => return Ok(None),
            }
        }

        let mut sessions = self.sessions.write().await;
        if sessions.get(session_id).is_some_and(Session::is_expired) {
            sessions.remove(session_id);
            trace!(session_id, "Evicted expired session");
        }
        Ok(None)
    }

    async fn save(&self, session: &Session) -> SessionResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        trace!(session_id = %session.id, "Session saved");

        let saves = self.saves.fetch_add(1, Ordering::Relaxed) + 1;
        if saves % self.prune_interval == 0 {
            let before = sessions.len();
            sessions.retain(|_, s| !s.is_expired());
            let pruned = before - sessions.len();
            if pruned > 0 {
                debug!(pruned, "Pruned expired sessions");
            }
        }
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> SessionResult<()> {
        if self.sessions.write().await.remove(session_id).is_some() {
            debug!(session_id, "Session deleted");
        }
        Ok(())
    }

    async fn count(&self) -> SessionResult<usize> {
        Ok(self.sessions.read().await.len())
    }

    async fn cleanup_expired(&self) -> SessionResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_save_get_delete() {
        let store = MemorySessionStore::new();
        let mut session = Session::new("s-1", Duration::from_secs(60));
        session.set("user", "alice").unwrap();

        store.save(&session).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let loaded = store.get("s-1").await.unwrap().unwrap();
        assert_eq!(loaded.get::<String>("user"), Some("alice".to_string()));

        store.delete("s-1").await.unwrap();
        assert!(store.get("s-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_hidden_and_cleaned() {
        let store = MemorySessionStore::new();
        store
            .save(&Session::new("gone", Duration::ZERO))
            .await
            .unwrap();
        store
            .save(&Session::new("live", Duration::from_secs(60)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(store.get("gone").await.unwrap().is_none());
        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_evicted_on_lookup() {
        let store = MemorySessionStore::new();
        store
            .save(&Session::new("gone", Duration::ZERO))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.count().await.unwrap(), 1);

        assert!(store.get("gone").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_saves_prune_expired_sessions() {
        let store = MemorySessionStore::new().with_prune_interval(3);
        for id in ["a", "b"] {
            store.save(&Session::new(id, Duration::ZERO)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.count().await.unwrap(), 2);

        // The third save sweeps the two abandoned sessions
        store
            .save(&Session::new("live", Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.get("live").await.unwrap().is_some());
    }
}

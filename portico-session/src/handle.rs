//! Per-request session access.
//!
//! A [`SessionScope`] is created for every request. It holds the session
//! loaded from the store (if the client sent a known id) and lazily creates
//! one when a handler asks for it. Handlers and the authorization gate only
//! ever see a [`SessionHandle`], a cheap clonable view offering
//! `get`/`set`/`remove`/`invalidate`. After the handler returns, the scope
//! writes changes back with [`SessionScope::commit`].

use crate::error::{SessionError, SessionResult};
use crate::traits::{Session, SessionStore, generate_session_id};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

struct HandleState {
    session: Session,
    dirty: bool,
    invalidated: bool,
    created: bool,
}

/// Capability view over one session.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<HandleState>>,
}

impl SessionHandle {
    fn new(session: Session, created: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HandleState {
                session,
                dirty: created,
                invalidated: false,
                created,
            })),
        }
    }

    /// Build a handle around an existing session, detached from any store.
    pub fn detached(session: Session) -> Self {
        Self::new(session, false)
    }

    /// Session id.
    pub fn id(&self) -> String {
        self.inner.lock().session.id.clone()
    }

    /// Read an attribute. Always `None` once the session is invalidated.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let state = self.inner.lock();
        if state.invalidated {
            return None;
        }
        state.session.attribute(key).cloned()
    }

    /// Read an attribute as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Add or replace an attribute.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> SessionResult<()> {
        let mut state = self.inner.lock();
        if state.invalidated {
            return Err(SessionError::Invalidated(state.session.id.clone()));
        }
        state.session.set(key, value)?;
        state.dirty = true;
        Ok(())
    }

    /// Remove an attribute, returning the previous value.
    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        let mut state = self.inner.lock();
        if state.invalidated {
            return None;
        }
        let previous = state.session.remove(key);
        if previous.is_some() {
            state.dirty = true;
        }
        previous
    }

    /// Discard the whole session. It is deleted from the store on commit.
    pub fn invalidate(&self) {
        let mut state = self.inner.lock();
        state.invalidated = true;
        state.session.data.clear();
        debug!(session_id = %state.session.id, "Session invalidated");
    }

    /// Whether `invalidate()` was called.
    pub fn is_invalidated(&self) -> bool {
        self.inner.lock().invalidated
    }

    /// Whether the session was created during the current request.
    pub fn is_new(&self) -> bool {
        self.inner.lock().created
    }

    /// Copy of the underlying session.
    pub fn snapshot(&self) -> Session {
        self.inner.lock().session.clone()
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.id() == other.id()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("SessionHandle")
            .field("id", &state.session.id)
            .field("invalidated", &state.invalidated)
            .field("created", &state.created)
            .finish()
    }
}

/// What [`SessionScope::commit`] did with the request's session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCommit {
    /// Id of a session created during the request; the client must be told.
    pub issued: Option<String>,
    /// The session the client presented was invalidated and no replacement exists.
    pub revoked: bool,
}

#[derive(Default)]
struct ScopeState {
    current: Option<SessionHandle>,
    retired: Vec<SessionHandle>,
}

/// Session state owned by one request.
pub struct SessionScope {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    state: Mutex<ScopeState>,
}

impl SessionScope {
    /// Scope without a session; one is created on first `get_or_create`.
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            state: Mutex::new(ScopeState::default()),
        }
    }

    /// Load the session named by `session_id`, if the store knows it.
    pub async fn load(
        store: Arc<dyn SessionStore>,
        session_id: Option<&str>,
        ttl: Duration,
    ) -> SessionResult<Self> {
        let scope = Self::new(store, ttl);
        if let Some(id) = session_id {
            if let Some(mut session) = scope.store.get(id).await? {
                session.touch();
                trace!(session_id = id, "Session loaded");
                scope.state.lock().current = Some(SessionHandle::new(session, false));
            }
        }
        Ok(scope)
    }

    /// The live session, without creating one.
    pub fn current(&self) -> Option<SessionHandle> {
        self.state
            .lock()
            .current
            .as_ref()
            .filter(|handle| !handle.is_invalidated())
            .cloned()
    }

    /// The live session, creating a fresh one when absent or invalidated.
    pub fn get_or_create(&self) -> SessionHandle {
        let mut state = self.state.lock();
        if let Some(handle) = state.current.as_ref() {
            if !handle.is_invalidated() {
                return handle.clone();
            }
        }
        if let Some(old) = state.current.take() {
            state.retired.push(old);
        }
        let handle = SessionHandle::new(Session::new(generate_session_id(), self.ttl), true);
        debug!(session_id = %handle.id(), "Session created");
        state.current = Some(handle.clone());
        handle
    }

    /// Persist changes made during the request.
    pub async fn commit(&self) -> SessionResult<SessionCommit> {
        let (current, retired) = {
            let mut state = self.state.lock();
            (state.current.clone(), std::mem::take(&mut state.retired))
        };

        let mut commit = SessionCommit::default();
        for handle in retired {
            self.store.delete(&handle.id()).await?;
            commit.revoked = true;
        }

        if let Some(handle) = current {
            if handle.is_invalidated() {
                self.store.delete(&handle.id()).await?;
                commit.revoked = true;
            } else {
                let (snapshot, dirty, created) = {
                    let state = handle.inner.lock();
                    (state.session.clone(), state.dirty, state.created)
                };
                if dirty || created {
                    self.store.save(&snapshot).await?;
                }
                if created {
                    commit.issued = Some(snapshot.id);
                    commit.revoked = false;
                }
            }
        }
        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySessionStore;

    fn store() -> Arc<MemorySessionStore> {
        Arc::new(MemorySessionStore::new())
    }

    #[tokio::test]
    async fn test_scope_without_cookie_has_no_session() {
        let scope = SessionScope::load(store(), None, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(scope.current().is_none());
        assert_eq!(scope.commit().await.unwrap(), SessionCommit::default());
    }

    #[tokio::test]
    async fn test_created_session_is_saved_and_issued() {
        let store = store();
        let scope = SessionScope::new(store.clone(), Duration::from_secs(60));

        let handle = scope.get_or_create();
        handle.set("authenticated", true).unwrap();
        assert_eq!(scope.current(), Some(handle.clone()));

        let commit = scope.commit().await.unwrap();
        assert_eq!(commit.issued, Some(handle.id()));

        let stored = store.get(&handle.id()).await.unwrap().unwrap();
        assert_eq!(stored.get::<bool>("authenticated"), Some(true));
    }

    #[tokio::test]
    async fn test_loaded_session_round_trip() {
        let store = store();
        let mut session = Session::new("known", Duration::from_secs(60));
        session.set("role", "admin").unwrap();
        store.save(&session).await.unwrap();

        let scope = SessionScope::load(store.clone(), Some("known"), Duration::from_secs(60))
            .await
            .unwrap();
        let handle = scope.current().unwrap();
        assert_eq!(handle.get_as::<String>("role"), Some("admin".to_string()));
        assert!(!handle.is_new());

        handle.remove("role");
        let commit = scope.commit().await.unwrap();
        assert!(commit.issued.is_none());
        assert!(!commit.revoked);
        assert!(store.get("known").await.unwrap().unwrap().attribute("role").is_none());
    }

    #[tokio::test]
    async fn test_invalidate_deletes_on_commit() {
        let store = store();
        store
            .save(&Session::new("bye", Duration::from_secs(60)))
            .await
            .unwrap();

        let scope = SessionScope::load(store.clone(), Some("bye"), Duration::from_secs(60))
            .await
            .unwrap();
        let handle = scope.current().unwrap();
        handle.invalidate();

        assert!(handle.get("anything").is_none());
        assert!(handle.set("k", 1).is_err());
        assert!(scope.current().is_none());

        let commit = scope.commit().await.unwrap();
        assert!(commit.revoked);
        assert!(store.get("bye").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_or_create_after_invalidate_replaces_session() {
        let store = store();
        store
            .save(&Session::new("old", Duration::from_secs(60)))
            .await
            .unwrap();
        let scope = SessionScope::load(store.clone(), Some("old"), Duration::from_secs(60))
            .await
            .unwrap();

        scope.current().unwrap().invalidate();
        let fresh = scope.get_or_create();
        assert_ne!(fresh.id(), "old");

        let commit = scope.commit().await.unwrap();
        assert_eq!(commit.issued, Some(fresh.id()));
        assert!(!commit.revoked);
        assert!(store.get("old").await.unwrap().is_none());
    }
}

//! Session store trait definition.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Session data structure.
///
/// Attributes are stored as JSON values so any serializable type can be
/// placed in a session and read back without the store knowing about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: String,
    /// Session attributes
    pub data: HashMap<String, serde_json::Value>,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last access timestamp
    pub last_accessed_at: DateTime<Utc>,
    /// Session expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session with the given ID and TTL.
    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            data: HashMap::new(),
            created_at: now,
            last_accessed_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
        }
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Raw attribute value.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Typed attribute value; `None` when absent or of another shape.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set an attribute.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let json_value =
            serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.data.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Remove an attribute.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Update the last accessed timestamp.
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }
}

/// Storage backend for sessions.
///
/// The dispatcher never talks to a store directly. A
/// [`SessionScope`](crate::SessionScope) loads the session before the
/// handler runs and writes it back afterwards.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get a session by ID.
    ///
    /// Returns `Ok(None)` if the session is unknown or expired.
    async fn get(&self, session_id: &str) -> SessionResult<Option<Session>>;

    /// Insert or replace a session.
    async fn save(&self, session: &Session) -> SessionResult<()>;

    /// Delete a session. Deleting an unknown session is not an error.
    async fn delete(&self, session_id: &str) -> SessionResult<()>;

    /// Number of stored sessions.
    async fn count(&self) -> SessionResult<usize>;

    /// Drop expired sessions, returning how many were removed.
    async fn cleanup_expired(&self) -> SessionResult<usize>;
}

/// Generate a new unique session ID.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

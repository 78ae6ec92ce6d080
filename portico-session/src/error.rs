//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A value could not be converted into session data
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored session data could not be read back
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Session not found
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The handle was used after `invalidate()`
    #[error("Session invalidated: {0}")]
    Invalidated(String),

    /// Backing store failure
    #[error("Session store error: {0}")]
    Store(String),
}

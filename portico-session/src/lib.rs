//! Session support for the Portico framework.
//!
//! The request pipeline owns session storage; handlers only receive a
//! [`SessionHandle`] with `get`, `set`, `remove` and `invalidate`.
//!
//! # Examples
//!
//! ```no_run
//! use portico_session::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), SessionError> {
//! let store = Arc::new(MemorySessionStore::new());
//!
//! // One scope per request; `None` means the client sent no session cookie.
//! let scope = SessionScope::load(store.clone(), None, Duration::from_secs(1800)).await?;
//!
//! let session = scope.get_or_create();
//! session.set("authenticated", true)?;
//! session.set("role", "admin")?;
//!
//! let commit = scope.commit().await?;
//! assert!(commit.issued.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handle;
pub mod memory;
pub mod traits;

pub use config::{DEFAULT_COOKIE_NAME, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use handle::{SessionCommit, SessionHandle, SessionScope};
pub use memory::MemorySessionStore;
pub use traits::{Session, SessionStore, generate_session_id};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::handle::{SessionHandle, SessionScope};
    pub use crate::memory::MemorySessionStore;
    pub use crate::traits::{Session, SessionStore};
}

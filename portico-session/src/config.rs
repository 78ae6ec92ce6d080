//! Session configuration.

use std::time::Duration;

/// Default name of the cookie carrying the session id.
pub const DEFAULT_COOKIE_NAME: &str = "PORTICO_SESSION";

/// Session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Cookie used to carry the session id between requests
    pub cookie_name: String,
    /// Lifetime given to newly created sessions
    pub default_ttl: Duration,
    /// Upper bound for any session lifetime
    pub max_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            default_ttl: Duration::from_secs(1800),
            max_ttl: Duration::from_secs(86400),
        }
    }
}

impl SessionConfig {
    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the default TTL, clamped to `max_ttl`.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl.min(self.max_ttl);
        self
    }

    /// Set the maximum TTL.
    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        if self.default_ttl > ttl {
            self.default_ttl = ttl;
        }
        self
    }
}

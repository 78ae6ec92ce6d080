// Guards for route protection

use crate::route_registry::{AuthRequirement, RouteDescriptor};
use async_trait::async_trait;
use portico_session::SessionHandle;
use tracing::debug;

/// Session attribute names consulted by [`SessionAuthGuard`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthKeys {
    pub authenticated_key: String,
    pub role_key: String,
}

impl Default for AuthKeys {
    fn default() -> Self {
        Self {
            authenticated_key: "authenticated".to_string(),
            role_key: "role".to_string(),
        }
    }
}

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Denied(String),
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allowed)
    }
}

/// Execution context for guards
pub struct GuardContext<'a> {
    pub route: &'a RouteDescriptor,
    /// The caller's live session, if any. Guards never create one.
    pub session: Option<&'a SessionHandle>,
}

impl<'a> GuardContext<'a> {
    pub fn new(route: &'a RouteDescriptor, session: Option<&'a SessionHandle>) -> Self {
        Self { route, session }
    }
}

/// Guard trait for protecting routes
#[async_trait]
pub trait Guard: Send + Sync {
    /// Decide whether the request may reach the handler
    async fn can_activate(&self, context: &GuardContext<'_>) -> AuthDecision;
}

/// Enforces a route's [`AuthRequirement`] against session attributes.
///
/// Authentication requires the flag attribute to be boolean `true`. A role
/// requirement compares the role attribute as text, case-sensitively. Both
/// checks deny when there is no session.
#[derive(Debug, Clone, Default)]
pub struct SessionAuthGuard {
    keys: AuthKeys,
}

impl SessionAuthGuard {
    pub fn new(keys: AuthKeys) -> Self {
        Self { keys }
    }

    pub fn check(&self, requirement: &AuthRequirement, session: Option<&SessionHandle>) -> AuthDecision {
        if requirement.authenticated {
            let authenticated = session
                .and_then(|s| s.get(&self.keys.authenticated_key))
                .is_some_and(|flag| flag == serde_json::Value::Bool(true));
            if !authenticated {
                return AuthDecision::Denied("authentication required".to_string());
            }
        }

        if let Some(role) = requirement.role.as_deref().filter(|r| !r.is_empty()) {
            let actual = session
                .and_then(|s| s.get(&self.keys.role_key))
                .and_then(|value| match value {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                });
            if actual.as_deref() != Some(role) {
                return AuthDecision::Denied(format!("role `{}` required", role));
            }
        }

        AuthDecision::Allowed
    }
}

#[async_trait]
impl Guard for SessionAuthGuard {
    async fn can_activate(&self, context: &GuardContext<'_>) -> AuthDecision {
        let Some(requirement) = &context.route.auth else {
            return AuthDecision::Allowed;
        };
        let decision = self.check(requirement, context.session);
        if let AuthDecision::Denied(reason) = &decision {
            debug!(route = %context.route.qualified_name(), reason = %reason, "Access denied");
        }
        decision
    }
}

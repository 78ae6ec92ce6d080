//! Route descriptor store.
//!
//! Controllers contribute [`RouteDescriptor`]s through an explicit builder at
//! startup. The resulting [`RouteStore`] is read-only and shared by every
//! request.

use crate::arguments::Arguments;
use crate::kind::FieldKind;
use crate::render::HandlerOutput;
use crate::routing::UrlPattern;
use crate::traits::Controller;
use crate::{Error, HttpMethod};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

/// Boxed future returned by a handler
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HandlerOutput, Error>> + Send>>;

/// Type alias for async route handler functions
pub type HandlerFn = Arc<dyn Fn(Arguments) -> HandlerFuture + Send + Sync>;

/// Method restriction plus pattern. `method: None` matches any method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMapping {
    pub method: Option<HttpMethod>,
    pub pattern: UrlPattern,
}

/// Where a parameter's value is expected to come from.
///
/// Fixed when the route is built: session and mapping kinds always carry
/// their own hint, and the argument resolver dispatches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingHint {
    None,
    /// Must name a variable of at least one of the route's patterns
    PathVariable,
    /// Read the named request parameter instead of the parameter's own name
    Query(String),
    SessionHandle,
    RawParameterMap,
}

impl BindingHint {
    /// Hint implied by `kind` alone
    fn implied_by(kind: &FieldKind) -> Option<Self> {
        match kind {
            FieldKind::Session => Some(BindingHint::SessionHandle),
            FieldKind::Mapping => Some(BindingHint::RawParameterMap),
            _ => None,
        }
    }
}

/// One declared handler parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: FieldKind,
    pub hint: BindingHint,
}

/// Authorization declared on a route. No requirement means unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRequirement {
    pub authenticated: bool,
    pub role: Option<String>,
}

impl AuthRequirement {
    /// Require an authenticated session
    pub fn authenticated() -> Self {
        Self {
            authenticated: true,
            role: None,
        }
    }

    /// Require a session whose role attribute equals `role`
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            role: Some(role.into()),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// A handler with its mappings, parameters and authorization
#[derive(Clone)]
pub struct RouteDescriptor {
    pub owner: String,
    pub handler_name: String,
    pub mappings: Vec<RequestMapping>,
    pub parameters: Vec<ParameterSpec>,
    pub auth: Option<AuthRequirement>,
    /// Render the return value inside the JSON envelope
    pub json: bool,
    pub handler: HandlerFn,
}

impl RouteDescriptor {
    pub fn builder(owner: impl Into<String>, handler_name: impl Into<String>) -> RouteBuilder {
        RouteBuilder {
            owner: owner.into(),
            handler_name: handler_name.into(),
            mappings: Vec::new(),
            parameters: Vec::new(),
            auth: None,
            json: false,
            handler: None,
        }
    }

    /// `Owner::handler` label used in logs
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.owner, self.handler_name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("owner", &self.owner)
            .field("handler_name", &self.handler_name)
            .field("mappings", &self.mappings)
            .field("parameters", &self.parameters)
            .field("auth", &self.auth)
            .field("json", &self.json)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RouteDescriptor`]
pub struct RouteBuilder {
    owner: String,
    handler_name: String,
    mappings: Vec<RequestMapping>,
    parameters: Vec<ParameterSpec>,
    auth: Option<AuthRequirement>,
    json: bool,
    handler: Option<HandlerFn>,
}

impl RouteBuilder {
    /// Method-agnostic mapping
    pub fn url(self, pattern: &str) -> Self {
        self.mapping(None, pattern)
    }

    pub fn get(self, pattern: &str) -> Self {
        self.mapping(Some(HttpMethod::GET), pattern)
    }

    pub fn post(self, pattern: &str) -> Self {
        self.mapping(Some(HttpMethod::POST), pattern)
    }

    pub fn mapping(mut self, method: Option<HttpMethod>, pattern: &str) -> Self {
        self.mappings.push(RequestMapping {
            method,
            pattern: UrlPattern::parse(pattern),
        });
        self
    }

    /// Declare a parameter; `BindingHint::None` is replaced by the hint its kind implies
    pub fn parameter(mut self, name: impl Into<String>, kind: FieldKind, hint: BindingHint) -> Self {
        let hint = match hint {
            BindingHint::None => BindingHint::implied_by(&kind).unwrap_or(BindingHint::None),
            explicit => explicit,
        };
        self.parameters.push(ParameterSpec {
            name: name.into(),
            kind,
            hint,
        });
        self
    }

    /// Parameter resolved from whatever source carries its name
    pub fn param(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.parameter(name, kind, BindingHint::None)
    }

    pub fn path_var(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.parameter(name, kind, BindingHint::PathVariable)
    }

    /// Parameter read from the request parameter `key`
    pub fn query_param(
        self,
        name: impl Into<String>,
        key: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        self.parameter(name, kind, BindingHint::Query(key.into()))
    }

    pub fn session(self, name: impl Into<String>) -> Self {
        self.parameter(name, FieldKind::Session, BindingHint::SessionHandle)
    }

    pub fn params_map(self, name: impl Into<String>) -> Self {
        self.parameter(name, FieldKind::Mapping, BindingHint::RawParameterMap)
    }

    pub fn file(self, name: impl Into<String>) -> Self {
        self.param(name, FieldKind::FilePart)
    }

    pub fn files(self, name: impl Into<String>) -> Self {
        self.param(name, FieldKind::sequence_of(FieldKind::FilePart))
    }

    pub fn auth(mut self, requirement: AuthRequirement) -> Self {
        self.auth = Some(requirement);
        self
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerOutput, Error>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |args| -> HandlerFuture { Box::pin(handler(args)) });
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<RouteDescriptor, Error> {
        let label = format!("{}::{}", self.owner, self.handler_name);

        if self.mappings.is_empty() {
            return Err(Error::InvalidRoute(format!("{} declares no mapping", label)));
        }
        let Some(handler) = self.handler else {
            return Err(Error::InvalidRoute(format!("{} has no handler", label)));
        };

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(Error::InvalidRoute(format!(
                    "{} declares parameter `{}` twice",
                    label, param.name
                )));
            }
            let expected = BindingHint::implied_by(&param.kind);
            let consistent = match &param.hint {
                BindingHint::SessionHandle | BindingHint::RawParameterMap => {
                    expected.as_ref() == Some(&param.hint)
                }
                _ => expected.is_none(),
            };
            if !consistent {
                return Err(Error::InvalidRoute(format!(
                    "{} parameter `{}` of kind {} cannot use hint {:?}",
                    label,
                    param.name,
                    param.kind.label(),
                    param.hint
                )));
            }
            if param.hint == BindingHint::PathVariable
                && !self
                    .mappings
                    .iter()
                    .any(|m| m.pattern.variable_names().any(|v| v == param.name))
            {
                return Err(Error::InvalidRoute(format!(
                    "{} binds path variable `{}` that no pattern declares",
                    label, param.name
                )));
            }
        }

        Ok(RouteDescriptor {
            owner: self.owner,
            handler_name: self.handler_name,
            mappings: self.mappings,
            parameters: self.parameters,
            auth: self.auth,
            json: self.json,
            handler,
        })
    }
}

/// The routes contributed by one controller, in declaration order
#[derive(Debug, Clone)]
pub struct ControllerDescriptor {
    pub name: String,
    pub routes: Vec<Arc<RouteDescriptor>>,
}

impl ControllerDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
        }
    }

    pub fn route(mut self, route: RouteDescriptor) -> Self {
        self.routes.push(Arc::new(route));
        self
    }
}

/// Read-only collection of controllers in discovery order
#[derive(Debug, Clone, Default)]
pub struct RouteStore {
    controllers: Vec<ControllerDescriptor>,
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_controller(&mut self, descriptor: ControllerDescriptor) {
        info!(
            controller = %descriptor.name,
            routes = descriptor.routes.len(),
            "Registered controller"
        );
        self.controllers.push(descriptor);
    }

    /// Collect a controller's routes
    pub fn register<C: Controller>(&mut self, controller: &C) -> Result<(), Error> {
        let mut descriptor = ControllerDescriptor::new(controller.name());
        for route in controller.routes()? {
            descriptor = descriptor.route(route);
        }
        self.add_controller(descriptor);
        Ok(())
    }

    pub fn controllers(&self) -> &[ControllerDescriptor] {
        &self.controllers
    }

    pub fn route_count(&self) -> usize {
        self.controllers.iter().map(|c| c.routes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(builder: RouteBuilder) -> RouteBuilder {
        builder.handler(|_| async { Ok(HandlerOutput::text("ok")) })
    }

    #[test]
    fn test_build_route() {
        let route = noop(
            RouteDescriptor::builder("UserController", "show")
                .get("/user/{id}")
                .path_var("id", FieldKind::Integer)
                .session("session")
                .auth(AuthRequirement::authenticated().with_role("admin"))
                .json(),
        )
        .build()
        .unwrap();

        assert_eq!(route.qualified_name(), "UserController::show");
        assert_eq!(route.mappings[0].method, Some(HttpMethod::GET));
        assert!(route.mappings[0].pattern.is_dynamic());
        assert_eq!(route.parameter("session").unwrap().kind, FieldKind::Session);
        assert_eq!(
            route.auth,
            Some(AuthRequirement {
                authenticated: true,
                role: Some("admin".into())
            })
        );
        assert!(route.json);
    }

    #[test]
    fn test_route_without_mapping_is_rejected() {
        let err = noop(RouteDescriptor::builder("C", "h")).build().unwrap_err();
        assert!(matches!(err, Error::InvalidRoute(_)));
    }

    #[test]
    fn test_route_without_handler_is_rejected() {
        let err = RouteDescriptor::builder("C", "h").url("/x").build().unwrap_err();
        assert!(err.to_string().contains("no handler"));
    }

    #[test]
    fn test_unknown_path_variable_is_rejected() {
        let err = noop(
            RouteDescriptor::builder("C", "h")
                .get("/user/{id}")
                .path_var("user_id", FieldKind::Integer),
        )
        .build()
        .unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn test_duplicate_parameter_is_rejected() {
        let err = noop(
            RouteDescriptor::builder("C", "h")
                .url("/x")
                .param("a", FieldKind::Text)
                .param("a", FieldKind::Integer),
        )
        .build()
        .unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn test_hint_follows_kind() {
        let route = noop(
            RouteDescriptor::builder("C", "h")
                .url("/x")
                .param("s", FieldKind::Session)
                .param("all", FieldKind::Mapping)
                .param("n", FieldKind::Integer),
        )
        .build()
        .unwrap();
        assert_eq!(route.parameter("s").unwrap().hint, BindingHint::SessionHandle);
        assert_eq!(route.parameter("all").unwrap().hint, BindingHint::RawParameterMap);
        assert_eq!(route.parameter("n").unwrap().hint, BindingHint::None);
    }

    #[test]
    fn test_inconsistent_hint_is_rejected() {
        let err = noop(
            RouteDescriptor::builder("C", "h")
                .url("/x")
                .parameter("s", FieldKind::Text, BindingHint::SessionHandle),
        )
        .build()
        .unwrap_err();
        assert!(err.to_string().contains("cannot use hint"));

        let err = noop(
            RouteDescriptor::builder("C", "h")
                .get("/x/{all}")
                .parameter("all", FieldKind::Mapping, BindingHint::PathVariable),
        )
        .build()
        .unwrap_err();
        assert!(matches!(err, Error::InvalidRoute(_)));
    }

    struct Pages;

    impl Controller for Pages {
        fn name(&self) -> &str {
            "Pages"
        }

        fn routes(&self) -> Result<Vec<RouteDescriptor>, Error> {
            Ok(vec![
                noop(RouteDescriptor::builder("Pages", "home").url("/")).build()?,
                noop(RouteDescriptor::builder("Pages", "about").get("/about")).build()?,
            ])
        }
    }

    #[test]
    fn test_register_controller() {
        let mut store = RouteStore::new();
        store.register(&Pages).unwrap();
        store.add_controller(ControllerDescriptor::new("Empty"));

        assert_eq!(store.controllers().len(), 2);
        assert_eq!(store.controllers()[0].name, "Pages");
        assert_eq!(store.route_count(), 2);
    }
}

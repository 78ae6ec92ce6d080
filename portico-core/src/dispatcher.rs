//! Front controller.
//!
//! [`Dispatcher::dispatch`] runs one request through resolution,
//! authorization, argument resolution, the handler and rendering. It never
//! fails: every error becomes a JSON error response with the error's status.

use crate::arguments::{RequestContext, resolve_arguments};
use crate::config::DispatcherConfig;
use crate::form::{MultipartPayload, UploadStore};
use crate::guard::{AuthDecision, Guard, GuardContext, SessionAuthGuard};
use crate::render::{Rendered, ResponseRenderer};
use crate::resolver;
use crate::route_registry::RouteStore;
use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use portico_session::SessionScope;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct Dispatcher {
    routes: Arc<RouteStore>,
    config: DispatcherConfig,
    guard: Arc<dyn Guard>,
    uploads: UploadStore,
    renderer: ResponseRenderer,
}

impl Dispatcher {
    pub fn new(routes: RouteStore, config: DispatcherConfig) -> Self {
        let guard = Arc::new(SessionAuthGuard::new(config.auth.clone()));
        let uploads = UploadStore::new(config.uploads_dir.clone(), config.persist_uploads);
        let renderer = ResponseRenderer::new(config.text_content_type.clone(), config.view_prefix.clone());
        Self {
            routes: Arc::new(routes),
            config,
            guard,
            uploads,
            renderer,
        }
    }

    /// Replace the session-attribute guard
    pub fn with_guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guard = guard;
        self
    }

    pub fn routes(&self) -> &RouteStore {
        &self.routes
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Handle one request against the caller's session scope
    pub async fn dispatch(&self, request: &HttpRequest, session: &SessionScope) -> Rendered {
        match self.try_dispatch(request, session).await {
            Ok(rendered) => rendered,
            Err(err) => {
                match &err {
                    Error::RouteNotFound(_) | Error::Forbidden(_) | Error::Binding(_) => {
                        warn!(method = %request.method, path = %request.path, error = %err, "Request rejected");
                    }
                    _ if err.is_server_error() => {
                        error!(method = %request.method, path = %request.path, error = %err, "Request failed");
                    }
                    _ => {
                        debug!(method = %request.method, path = %request.path, error = %err, "Request failed");
                    }
                }
                Rendered::Response(HttpResponse::from_error(&err))
            }
        }
    }

    async fn try_dispatch(&self, request: &HttpRequest, session: &SessionScope) -> Result<Rendered, Error> {
        let path = self.config.dispatch_path(&request.path);
        let method = HttpMethod::from_str(&request.method);
        debug!(method = %request.method, path = %path, "Dispatching");

        let resolved = resolver::resolve(&self.routes, method, &path)
            .ok_or_else(|| Error::RouteNotFound(path.clone()))?;
        let route = &resolved.route;

        let current = session.current();
        let context = GuardContext::new(route, current.as_ref());
        if let AuthDecision::Denied(reason) = self.guard.can_activate(&context).await {
            return Err(Error::Forbidden(reason));
        }

        let mut params = request.parameters()?;
        let multipart = if request.is_multipart() {
            let payload = MultipartPayload::read(request, &self.uploads).await?;
            for (name, value) in &payload.texts {
                params.append(name.clone(), value.clone());
            }
            Some(payload)
        } else {
            None
        };

        let ctx = RequestContext {
            params: &params,
            variables: &resolved.variables,
            multipart: multipart.as_ref(),
            session,
            max_sequence_len: self.config.max_sequence_len,
        };
        let args = resolve_arguments(route, &ctx)?;
        let snapshot = args.to_json_map();

        let output = (route.handler)(args).await?;
        self.renderer.render(output, route.json, &snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::FieldKind;
    use crate::render::HandlerOutput;
    use crate::route_registry::{AuthRequirement, ControllerDescriptor, RouteDescriptor};
    use portico_session::MemorySessionStore;
    use std::time::Duration;

    fn dispatcher() -> Dispatcher {
        let controller = ControllerDescriptor::new("Users")
            .route(
                RouteDescriptor::builder("Users", "show")
                    .get("/user/{id}")
                    .path_var("id", FieldKind::Integer)
                    .handler(|args| async move {
                        Ok(HandlerOutput::text(format!("user {}", args.integer("id").unwrap_or(-1))))
                    })
                    .build()
                    .unwrap(),
            )
            .route(
                RouteDescriptor::builder("Users", "admin")
                    .get("/admin")
                    .auth(AuthRequirement::authenticated())
                    .handler(|_| async { Ok(HandlerOutput::text("secret")) })
                    .build()
                    .unwrap(),
            )
            .route(
                RouteDescriptor::builder("Users", "fails")
                    .get("/fails")
                    .handler(|_| async { Err(Error::Internal("boom".into())) })
                    .build()
                    .unwrap(),
            );
        let mut store = RouteStore::new();
        store.add_controller(controller);
        Dispatcher::new(store, DispatcherConfig::default().with_context_path("/app"))
    }

    fn scope() -> SessionScope {
        SessionScope::new(Arc::new(MemorySessionStore::new()), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_dispatch_under_context_path() {
        let rendered = dispatcher()
            .dispatch(&HttpRequest::new("GET", "/app/user/45"), &scope())
            .await;
        assert_eq!(rendered.response().unwrap().body_string(), "user 45");
    }

    #[tokio::test]
    async fn test_not_found_is_reported() {
        let rendered = dispatcher()
            .dispatch(&HttpRequest::new("GET", "/app/nothing/here/at/all"), &scope())
            .await;
        let response = rendered.response().unwrap();
        assert_eq!(response.status, 404);
        assert!(response.body_string().contains("/nothing/here/at/all"));
    }

    #[tokio::test]
    async fn test_forbidden_without_session() {
        let rendered = dispatcher()
            .dispatch(&HttpRequest::new("GET", "/app/admin"), &scope())
            .await;
        assert_eq!(rendered.status(), 403);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_response() {
        let rendered = dispatcher()
            .dispatch(&HttpRequest::new("GET", "/app/fails"), &scope())
            .await;
        let response = rendered.response().unwrap();
        assert_eq!(response.status, 500);
        assert!(response.body_string().contains("boom"));
    }
}

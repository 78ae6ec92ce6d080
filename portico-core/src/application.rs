// Application wiring and HTTP server

use crate::config::DispatcherConfig;
use crate::dispatcher::Dispatcher;
use crate::guard::Guard;
use crate::render::{Forward, Rendered};
use crate::route_registry::RouteStore;
use crate::traits::ViewRenderer;
use crate::{Error, HttpRequest, HttpResponse};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{COOKIE, HeaderName, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use portico_session::{MemorySessionStore, SessionScope, SessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Result of dispatching one request, before any view is rendered
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub outcome: Rendered,
    /// `Set-Cookie` value for a session issued or revoked during the request
    pub set_cookie: Option<String>,
}

/// A dispatcher bound to a session store and an optional view renderer
pub struct Application {
    dispatcher: Dispatcher,
    sessions: Arc<dyn SessionStore>,
    views: Option<Arc<dyn ViewRenderer>>,
}

impl Application {
    /// Application with in-memory sessions and no view renderer
    pub fn new(routes: RouteStore, config: DispatcherConfig) -> Self {
        info!(
            controllers = routes.controllers().len(),
            routes = routes.route_count(),
            context_path = %config.context_path,
            "Application created"
        );
        Self {
            dispatcher: Dispatcher::new(routes, config),
            sessions: Arc::new(MemorySessionStore::new()),
            views: None,
        }
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = store;
        self
    }

    pub fn with_views(mut self, views: Arc<dyn ViewRenderer>) -> Self {
        self.views = Some(views);
        self
    }

    pub fn with_guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.dispatcher = self.dispatcher.with_guard(guard);
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Load the caller's session, dispatch, then persist session changes
    pub async fn exchange(&self, request: &HttpRequest) -> Exchange {
        let config = self.dispatcher.config();
        let session_id = request.cookie(&config.session.cookie_name);

        let scope = match SessionScope::load(self.sessions.clone(), session_id, config.session.default_ttl).await {
            Ok(scope) => scope,
            Err(e) => {
                error!(error = %e, "Failed to load session");
                return Exchange {
                    outcome: Rendered::Response(HttpResponse::from_error(&Error::from(e))),
                    set_cookie: None,
                };
            }
        };

        let outcome = self.dispatcher.dispatch(request, &scope).await;

        match scope.commit().await {
            Ok(commit) => {
                let set_cookie = if let Some(id) = commit.issued {
                    Some(self.session_cookie(&id))
                } else if commit.revoked {
                    Some(self.expired_cookie())
                } else {
                    None
                };
                Exchange { outcome, set_cookie }
            }
            Err(e) => {
                error!(error = %e, "Failed to persist session");
                Exchange {
                    outcome: Rendered::Response(HttpResponse::from_error(&Error::from(e))),
                    set_cookie: None,
                }
            }
        }
    }

    /// Dispatch and render forwards into a complete response
    pub async fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let exchange = self.exchange(request).await;
        let response = match exchange.outcome {
            Rendered::Response(response) => response,
            Rendered::Forward(forward) => self.render_view(&forward).await,
        };
        match exchange.set_cookie {
            Some(cookie) => response.with_header("Set-Cookie".to_string(), cookie),
            None => response,
        }
    }

    async fn render_view(&self, forward: &Forward) -> HttpResponse {
        let result = match &self.views {
            Some(views) => views.render(forward).await,
            None => Err(Error::ViewNotFound(forward.path.clone())),
        };
        result.unwrap_or_else(|e| {
            warn!(view = %forward.view, error = %e, "View rendering failed");
            HttpResponse::from_error(&e)
        })
    }

    fn cookie_path(&self) -> &str {
        let context = self.dispatcher.config().context_path.trim_end_matches('/');
        if context.is_empty() { "/" } else { context }
    }

    fn session_cookie(&self, id: &str) -> String {
        format!(
            "{}={}; Path={}; HttpOnly",
            self.dispatcher.config().session.cookie_name,
            id,
            self.cookie_path()
        )
    }

    fn expired_cookie(&self) -> String {
        format!(
            "{}=; Path={}; Max-Age=0; HttpOnly",
            self.dispatcher.config().session.cookie_name,
            self.cookie_path()
        )
    }

    /// Start the HTTP server on all interfaces
    pub async fn listen(self, port: u16) -> Result<(), Error> {
        self.listen_on(SocketAddr::from(([0, 0, 0, 0], port))).await
    }

    pub async fn listen_on(self, addr: SocketAddr) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        info!(address = %addr, "Server listening");

        let app = Arc::new(self);
        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let app = app.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let app = app.clone();
                    async move { handle_request(req, app).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer, error = %err, "Error serving connection");
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<IncomingBody>,
    app: Arc<Application>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path());
    let mut request = HttpRequest::new(parts.method.as_str(), target);

    for (name, value) in &parts.headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let separator = if name == COOKIE { "; " } else { ", " };
        request
            .headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(separator);
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    request.body = body.collect().await?.to_bytes();

    let response = app.handle(&request).await;
    Ok(into_hyper(response))
}

fn into_hyper(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut out = Response::new(Full::new(Bytes::from(response.body)));
    *out.status_mut() = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    for (key, value) in response.headers {
        match (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(&value)) {
            (Ok(name), Ok(value)) => {
                out.headers_mut().append(name, value);
            }
            _ => warn!(header = %key, "Dropping invalid response header"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{HandlerOutput, ModelView};
    use crate::route_registry::{AuthRequirement, ControllerDescriptor, RouteDescriptor};
    use serde_json::json;

    fn app() -> Application {
        let controller = ControllerDescriptor::new("Account")
            .route(
                RouteDescriptor::builder("Account", "login")
                    .get("/login")
                    .session("session")
                    .handler(|args| async move {
                        let session = args.session("session").ok_or_else(|| Error::Internal("no session".into()))?;
                        session.set("authenticated", json!(true))?;
                        Ok(HandlerOutput::text("welcome"))
                    })
                    .build()
                    .unwrap(),
            )
            .route(
                RouteDescriptor::builder("Account", "logout")
                    .get("/logout")
                    .session("session")
                    .handler(|args| async move {
                        if let Some(session) = args.session("session") {
                            session.invalidate();
                        }
                        Ok(HandlerOutput::text("bye"))
                    })
                    .build()
                    .unwrap(),
            )
            .route(
                RouteDescriptor::builder("Account", "home")
                    .get("/home")
                    .auth(AuthRequirement::authenticated())
                    .handler(|_| async { Ok(HandlerOutput::view(ModelView::new("home.html"))) })
                    .build()
                    .unwrap(),
            );
        let mut store = RouteStore::new();
        store.add_controller(controller);
        Application::new(store, DispatcherConfig::default())
    }

    fn session_id(cookie: &str) -> &str {
        cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, id)| id)
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_issues_cookie_and_session_persists() {
        let app = app();

        let denied = app.exchange(&HttpRequest::new("GET", "/home")).await;
        assert_eq!(denied.outcome.status(), 403);
        assert!(denied.set_cookie.is_none());

        let login = app.exchange(&HttpRequest::new("GET", "/login")).await;
        let cookie = login.set_cookie.unwrap();
        assert!(cookie.starts_with("PORTICO_SESSION="));
        assert!(cookie.contains("HttpOnly"));

        let request = HttpRequest::new("GET", "/home")
            .with_header("Cookie", format!("PORTICO_SESSION={}", session_id(&cookie)));
        let home = app.exchange(&request).await;
        assert_eq!(home.outcome.forward().unwrap().path, "/views/home.html");
        assert!(home.set_cookie.is_none());
    }

    #[tokio::test]
    async fn test_logout_revokes_cookie() {
        let app = app();
        let login = app.exchange(&HttpRequest::new("GET", "/login")).await;
        let cookie = format!("PORTICO_SESSION={}", session_id(&login.set_cookie.unwrap()));

        let logout = app
            .exchange(&HttpRequest::new("GET", "/logout").with_header("Cookie", cookie.clone()))
            .await;
        assert!(logout.set_cookie.unwrap().contains("Max-Age=0"));

        let after = app
            .exchange(&HttpRequest::new("GET", "/home").with_header("Cookie", cookie))
            .await;
        assert_eq!(after.outcome.status(), 403);
    }

    #[tokio::test]
    async fn test_forward_without_views_is_not_found() {
        let app = app();
        let login = app.handle(&HttpRequest::new("GET", "/login")).await;
        let cookie = format!(
            "PORTICO_SESSION={}",
            session_id(login.header("set-cookie").unwrap())
        );

        let response = app
            .handle(&HttpRequest::new("GET", "/home").with_header("Cookie", cookie))
            .await;
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_into_hyper_keeps_status_and_headers() {
        let response = HttpResponse::new(201)
            .with_text("made", "text/plain")
            .with_header("X-Trace".to_string(), "abc".to_string());
        let hyper_response = into_hyper(response);
        assert_eq!(hyper_response.status(), StatusCode::CREATED);
        assert_eq!(hyper_response.headers()["x-trace"], "abc");
        assert_eq!(hyper_response.headers()["content-type"], "text/plain");
    }
}

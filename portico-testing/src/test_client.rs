// In-process test client

use crate::multipart::MultipartBody;
use parking_lot::Mutex;
use portico_core::{Application, Forward, HttpMethod, HttpRequest, HttpResponse, Rendered};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Drives an [`Application`] without a socket, keeping cookies between requests
pub struct TestClient {
    app: Arc<Application>,
    cookies: Mutex<BTreeMap<String, String>>,
}

impl TestClient {
    pub fn new(app: Application) -> Self {
        Self::from_arc(Arc::new(app))
    }

    /// Share one application between several clients
    pub fn from_arc(app: Arc<Application>) -> Self {
        Self {
            app,
            cookies: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn app(&self) -> &Arc<Application> {
        &self.app
    }

    pub async fn get(&self, target: &str) -> TestResponse {
        self.request(HttpRequest::new(HttpMethod::GET.as_str(), target)).await
    }

    /// POST `fields` as `application/x-www-form-urlencoded`
    pub async fn post_form(&self, target: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = serde_urlencoded::to_string(fields).unwrap_or_default();
        let request = HttpRequest::new(HttpMethod::POST.as_str(), target)
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(body);
        self.request(request).await
    }

    pub async fn post_multipart(&self, target: &str, body: MultipartBody) -> TestResponse {
        let request = HttpRequest::new(HttpMethod::POST.as_str(), target)
            .with_header("Content-Type", body.content_type())
            .with_body(body.to_bytes());
        self.request(request).await
    }

    /// Send any request; stored cookies are added unless it carries its own `Cookie` header
    pub async fn request(&self, mut request: HttpRequest) -> TestResponse {
        if request.header("cookie").is_none() {
            if let Some(header) = self.cookie_header() {
                request = request.with_header("Cookie", header);
            }
        }

        let exchange = self.app.exchange(&request).await;
        if let Some(set_cookie) = &exchange.set_cookie {
            self.store_cookie(set_cookie);
        }

        match exchange.outcome {
            Rendered::Response(response) => TestResponse::from_response(response),
            Rendered::Forward(forward) => TestResponse::from_forward(forward),
        }
    }

    /// Value of a stored cookie
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).cloned()
    }

    /// Id of the session the client currently holds
    pub fn session_id(&self) -> Option<String> {
        self.cookie(&self.app.dispatcher().config().session.cookie_name)
    }

    pub fn clear_cookies(&self) {
        self.cookies.lock().clear();
    }

    fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookies.lock();
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn store_cookie(&self, set_cookie: &str) {
        let mut attributes = set_cookie.split(';').map(str::trim);
        let Some((name, value)) = attributes.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let expired = attributes.any(|attr| attr.eq_ignore_ascii_case("Max-Age=0"));

        let mut cookies = self.cookies.lock();
        if expired {
            cookies.remove(name);
        } else {
            cookies.insert(name.to_string(), value.to_string());
        }
    }
}

/// What the application produced for one request
#[derive(Debug, Clone)]
pub struct TestResponse {
    status: u16,
    response: Option<HttpResponse>,
    forward: Option<Forward>,
}

impl TestResponse {
    fn from_response(response: HttpResponse) -> Self {
        Self {
            status: response.status,
            response: Some(response),
            forward: None,
        }
    }

    fn from_forward(forward: Forward) -> Self {
        Self {
            status: 200,
            response: None,
            forward: Some(forward),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Body text; empty for forwards
    pub fn body_string(&self) -> String {
        self.response
            .as_ref()
            .map(HttpResponse::body_string)
            .unwrap_or_default()
    }

    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, String> {
        let body = self.response.as_ref().map(|r| r.body.as_slice()).unwrap_or_default();
        serde_json::from_slice(body).map_err(|e| format!("Invalid JSON body: {}", e))
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.response.as_ref().and_then(|r| r.header(key))
    }

    /// Set when the handler returned a view on a non-JSON route
    pub fn forward(&self) -> Option<&Forward> {
        self.forward.as_ref()
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::prelude::*;
    use serde_json::json;

    fn client() -> TestClient {
        let controller = ControllerDescriptor::new("Session")
            .route(
                RouteDescriptor::builder("Session", "login")
                    .post("/login")
                    .param("user", FieldKind::Text)
                    .session("session")
                    .handler(|args| async move {
                        if let Some(session) = args.session("session") {
                            session.set("user", args.text("user").unwrap_or("anon"))?;
                        }
                        Ok(HandlerOutput::text("ok"))
                    })
                    .build()
                    .unwrap(),
            )
            .route(
                RouteDescriptor::builder("Session", "whoami")
                    .get("/whoami")
                    .session("session")
                    .json()
                    .handler(|args| async move {
                        let user = args.session("session").and_then(|s| s.get("user"));
                        Ok(HandlerOutput::Data(user.unwrap_or_default()))
                    })
                    .build()
                    .unwrap(),
            )
            .route(
                RouteDescriptor::builder("Session", "logout")
                    .get("/logout")
                    .session("session")
                    .handler(|args| async move {
                        if let Some(session) = args.session("session") {
                            session.invalidate();
                        }
                        Ok(HandlerOutput::view(ModelView::new("bye.html")))
                    })
                    .build()
                    .unwrap(),
            );
        let mut routes = RouteStore::new();
        routes.add_controller(controller);
        TestClient::new(Application::new(routes, DispatcherConfig::default()))
    }

    #[tokio::test]
    async fn test_cookie_jar_keeps_session() {
        let client = client();
        assert!(client.session_id().is_none());

        let response = client.post_form("/login", &[("user", "alice")]).await;
        assert_eq!(response.status(), 200);
        assert!(client.session_id().is_some());

        let response = client.get("/whoami").await;
        let body: serde_json::Value = response.body_json().unwrap();
        assert_eq!(body["data"], json!("alice"));
    }

    #[tokio::test]
    async fn test_invalidation_clears_cookie() {
        let client = client();
        client.post_form("/login", &[("user", "bob")]).await;

        let response = client.get("/logout").await;
        assert_eq!(response.forward().unwrap().path, "/views/bye.html");
        assert!(response.body_string().is_empty());
        assert!(client.session_id().is_none());
    }
}

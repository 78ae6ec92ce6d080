//! Testing utilities for Portico applications.
//!
//! [`TestClient`] sends requests straight into an [`Application`] and keeps
//! the session cookie between calls, so login flows, authorization and
//! session-handle parameters can be tested end to end without a socket.
//!
//! ```no_run
//! use portico_core::prelude::*;
//! use portico_testing::*;
//!
//! # async fn demo() -> Result<(), Error> {
//! let controller = ControllerDescriptor::new("Hello").route(
//!     RouteDescriptor::builder("Hello", "greet")
//!         .get("/hello/{name}")
//!         .path_var("name", FieldKind::Text)
//!         .handler(|args| async move {
//!             Ok(HandlerOutput::text(format!("Hello, {}!", args.text("name").unwrap_or("?"))))
//!         })
//!         .build()?,
//! );
//! let mut routes = RouteStore::new();
//! routes.add_controller(controller);
//!
//! let client = TestClient::new(Application::new(routes, DispatcherConfig::default()));
//! let response = client.get("/hello/Ada").await;
//! assert_status(&response, 200);
//! assert_eq!(response.body_string(), "Hello, Ada!");
//! # Ok(())
//! # }
//! ```
//!
//! [`Application`]: portico_core::Application

mod assertions;
mod multipart;
mod test_client;

pub use assertions::{
    assert_body_contains, assert_envelope, assert_forwarded_to, assert_header, assert_http_status, assert_json,
    assert_status,
};
pub use multipart::MultipartBody;
pub use test_client::{TestClient, TestResponse};

// Core library for the Portico front-controller framework
// Route resolution, data binding, authorization and rendering

pub mod application;
pub mod arguments;
pub mod binder;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod form;
pub mod guard;
pub mod http;
pub mod kind;
pub mod logging;
pub mod params;
pub mod render;
pub mod resolver;
pub mod route_registry;
pub mod routing;
pub mod status;
pub mod traits;
pub mod value;

// Re-export commonly used types
pub use application::{Application, Exchange};
pub use arguments::{Arguments, RequestContext, resolve_arguments};
pub use binder::{BindError, bind};
pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use error::*;
pub use form::{MultipartField, MultipartParser, MultipartPayload, UploadStore, UploadedFile};
pub use guard::{AuthDecision, AuthKeys, Guard, GuardContext, SessionAuthGuard};
pub use http::*;
pub use kind::{FieldKind, FieldSpec, ObjectSchema, ObjectSchemaBuilder};
pub use params::ParameterMap;
pub use render::{FileViewRenderer, Forward, HandlerOutput, ModelView, Rendered, ResponseRenderer};
pub use resolver::{ResolvedRoute, resolve};
pub use route_registry::{
    AuthRequirement, BindingHint, ControllerDescriptor, HandlerFn, HandlerFuture, ParameterSpec,
    RequestMapping, RouteBuilder, RouteDescriptor, RouteStore,
};
pub use routing::{MatchResult, Segment, UrlPattern, match_path};
pub use status::*;
pub use traits::*;
pub use value::{BoundObject, Value};

pub use async_trait::async_trait;
pub use portico_session::{SessionConfig, SessionHandle, SessionScope, SessionStore};

/// Everything a controller module usually needs
pub mod prelude {
    pub use crate::application::Application;
    pub use crate::arguments::Arguments;
    pub use crate::config::DispatcherConfig;
    pub use crate::error::Error;
    pub use crate::http::{HttpRequest, HttpResponse};
    pub use crate::kind::{FieldKind, ObjectSchema};
    pub use crate::render::{HandlerOutput, ModelView};
    pub use crate::route_registry::{AuthRequirement, ControllerDescriptor, RouteDescriptor, RouteStore};
    pub use crate::traits::{Controller, HttpMethod, ViewRenderer};
    pub use crate::value::{BoundObject, Value};
    pub use portico_session::SessionHandle;
}

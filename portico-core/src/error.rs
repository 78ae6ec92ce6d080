// Error types for the Portico framework

use crate::HttpStatus;
use crate::binder::BindError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No mapping matched the request method and path
    #[error("No handler mapped for URL: {0}")]
    RouteNotFound(String),

    /// The route's authorization requirement was not met
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A nested object graph could not be built from the request parameters
    #[error("Internal binding error: {0}")]
    Binding(#[from] BindError),

    /// The handler returned something the route cannot render
    #[error("Unsupported return type: {0}")]
    UnsupportedReturnType(String),

    /// A route or controller was registered with inconsistent metadata
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    /// A forwarded view does not exist
    #[error("View not found: {0}")]
    ViewNotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Writing an uploaded file failed
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session error: {0}")]
    Session(#[from] portico_session::SessionError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        match self {
            Error::RouteNotFound(_) | Error::ViewNotFound(_) => HttpStatus::NotFound,
            Error::Forbidden(_) => HttpStatus::Forbidden,
            Error::BadRequest(_)
            | Error::Deserialization(_)
            | Error::Binding(BindError::SequenceTooLong { .. }) => HttpStatus::BadRequest,
            _ => HttpStatus::InternalServerError,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }
}

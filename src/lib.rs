// Portico - a front-controller web framework for Rust
//
// Controllers register routes through an explicit builder; the dispatcher
// resolves them, binds request parameters, checks session authorization and
// renders text, views or JSON envelopes.

// Re-export core functionality
pub use portico_core::*;

pub use portico_session as session;

// Re-export optional crates
#[cfg(feature = "config")]
pub use portico_config;

#[cfg(feature = "testing")]
pub use portico_testing;

// Re-export common dependencies
pub use async_trait;
pub use serde;
pub use serde_json;
pub use tokio;

// Dispatcher configuration

use crate::binder::DEFAULT_MAX_SEQUENCE_LEN;
use crate::guard::AuthKeys;
use portico_session::SessionConfig;
use std::path::PathBuf;

/// Settings the dispatcher reads on every request
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Prefix removed from request paths before resolution, e.g. `/app`
    pub context_path: String,
    /// Directory uploads are written to, relative to the working directory
    pub uploads_dir: PathBuf,
    /// Write uploads to `uploads_dir`; when false they are kept in memory only
    pub persist_uploads: bool,
    /// Prepended to a view name to form the forward path
    pub view_prefix: String,
    pub auth: AuthKeys,
    pub session: SessionConfig,
    /// Content type of plain text responses
    pub text_content_type: String,
    /// Upper bound on the length of any sequence bound from `name[i]` keys
    pub max_sequence_len: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            context_path: String::new(),
            uploads_dir: PathBuf::from("uploads"),
            persist_uploads: true,
            view_prefix: "/views/".to_string(),
            auth: AuthKeys::default(),
            session: SessionConfig::default(),
            text_content_type: "text/html; charset=UTF-8".to_string(),
            max_sequence_len: DEFAULT_MAX_SEQUENCE_LEN,
        }
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into();
        self
    }

    pub fn with_uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.uploads_dir = dir.into();
        self
    }

    pub fn with_persist_uploads(mut self, persist: bool) -> Self {
        self.persist_uploads = persist;
        self
    }

    pub fn with_view_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.view_prefix = prefix.into();
        self
    }

    pub fn with_auth_keys(mut self, keys: AuthKeys) -> Self {
        self.auth = keys;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_text_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.text_content_type = content_type.into();
        self
    }

    pub fn with_max_sequence_len(mut self, max_len: usize) -> Self {
        self.max_sequence_len = max_len;
        self
    }

    /// Path used for route resolution: the request path with the context path removed.
    ///
    /// The path stays percent-encoded; path variables are decoded after matching.
    pub fn dispatch_path(&self, request_path: &str) -> String {
        let context = self.context_path.trim_end_matches('/');
        let stripped = if context.is_empty() {
            request_path
        } else {
            match request_path.strip_prefix(context) {
                Some(rest) if rest.is_empty() => "/",
                Some(rest) if rest.starts_with('/') => rest,
                _ => request_path,
            }
        };
        stripped.to_string()
    }
}

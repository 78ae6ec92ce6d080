//! Typed application settings.

use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use portico_core::guard::AuthKeys;
use portico_core::logging::{LogConfig, LogFormat, LogLevel};
use portico_core::DispatcherConfig;
use portico_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "warning", "error"];
const LOG_FORMATS: [&str; 5] = ["json", "plain", "text", "pretty", "compact"];

/// Everything a Portico server reads at startup.
///
/// Keys are flat so the same names work in files and as
/// `PORTICO_<KEY>` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PorticoSettings {
    pub host: String,
    pub port: u16,
    pub context_path: String,
    pub uploads_dir: PathBuf,
    pub persist_uploads: bool,
    pub view_prefix: String,
    pub authenticated_key: String,
    pub role_key: String,
    pub session_cookie: String,
    pub session_ttl_secs: u64,
    pub session_max_ttl_secs: u64,
    pub max_sequence_len: usize,
    pub log_level: String,
    pub log_format: String,
    /// Directive string; overrides `log_level` when set
    pub log_filter: Option<String>,
}

impl Default for PorticoSettings {
    fn default() -> Self {
        let dispatcher = DispatcherConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            context_path: dispatcher.context_path,
            uploads_dir: dispatcher.uploads_dir,
            persist_uploads: dispatcher.persist_uploads,
            view_prefix: dispatcher.view_prefix,
            authenticated_key: dispatcher.auth.authenticated_key,
            role_key: dispatcher.auth.role_key,
            session_cookie: dispatcher.session.cookie_name,
            session_ttl_secs: dispatcher.session.default_ttl.as_secs(),
            session_max_ttl_secs: dispatcher.session.max_ttl.as_secs(),
            max_sequence_len: dispatcher.max_sequence_len,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            log_filter: None,
        }
    }
}

impl Validate for PorticoSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.host, "host")?;
        ConfigValidator::is_port(self.port, "port")?;
        ConfigValidator::is_context_path(&self.context_path, "context_path")?;
        ConfigValidator::not_empty(&self.uploads_dir.to_string_lossy(), "uploads_dir")?;
        ConfigValidator::is_directory_prefix(&self.view_prefix, "view_prefix")?;
        ConfigValidator::not_empty(&self.authenticated_key, "authenticated_key")?;
        ConfigValidator::not_empty(&self.role_key, "role_key")?;
        ConfigValidator::is_cookie_name(&self.session_cookie, "session_cookie")?;
        ConfigValidator::in_range(self.session_max_ttl_secs, 1, u64::MAX, "session_max_ttl_secs")?;
        ConfigValidator::in_range(self.session_ttl_secs, 1, self.session_max_ttl_secs, "session_ttl_secs")?;
        ConfigValidator::in_range(self.max_sequence_len, 1, 1 << 20, "max_sequence_len")?;
        ConfigValidator::one_of(&self.log_level, &LOG_LEVELS, "log_level")?;
        ConfigValidator::one_of(&self.log_format, &LOG_FORMATS, "log_format")?;
        self.socket_addr().map(|_| ())
    }
}

impl PorticoSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::ValidationError(format!("host is not an IP address: `{}`", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn to_dispatcher_config(&self) -> DispatcherConfig {
        let session = SessionConfig::default()
            .with_cookie_name(self.session_cookie.clone())
            .with_max_ttl(Duration::from_secs(self.session_max_ttl_secs))
            .with_default_ttl(Duration::from_secs(self.session_ttl_secs));

        DispatcherConfig::default()
            .with_context_path(self.context_path.clone())
            .with_uploads_dir(self.uploads_dir.clone())
            .with_persist_uploads(self.persist_uploads)
            .with_view_prefix(self.view_prefix.clone())
            .with_auth_keys(AuthKeys {
                authenticated_key: self.authenticated_key.clone(),
                role_key: self.role_key.clone(),
            })
            .with_session(session)
            .with_max_sequence_len(self.max_sequence_len)
    }

    pub fn to_log_config(&self) -> Result<LogConfig> {
        let level = LogLevel::parse(&self.log_level)
            .ok_or_else(|| ConfigError::ValidationError(format!("unknown log level `{}`", self.log_level)))?;
        let format = LogFormat::parse(&self.log_format)
            .ok_or_else(|| ConfigError::ValidationError(format!("unknown log format `{}`", self.log_format)))?;

        let config = LogConfig::new().level(level).format(format);
        Ok(match &self.log_filter {
            Some(filter) => config.with_env_filter(filter.clone()),
            None => config,
        })
    }
}

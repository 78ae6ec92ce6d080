// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::env;

/// Prefix used when none is given
pub const DEFAULT_PREFIX: &str = "PORTICO";

/// Reads `PREFIX_KEY` variables as lower-cased `key` entries
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Every matching variable, prefix removed
    pub fn load(&self) -> HashMap<String, Value> {
        self.collect(env::vars())
    }

    fn collect(&self, vars: impl Iterator<Item = (String, String)>) -> HashMap<String, Value> {
        vars.filter_map(|(key, value)| {
            let name = match &self.prefix {
                Some(prefix) => key.strip_prefix(prefix.as_str())?.strip_prefix('_')?,
                None => key.as_str(),
            };
            (!name.is_empty()).then(|| (name.to_lowercase(), coerce(&value)))
        })
        .collect()
    }

    /// One variable by its unprefixed name
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(Some(DEFAULT_PREFIX.to_string()))
    }
}

/// Booleans and numbers become typed values; everything else stays text
pub(crate) fn coerce(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => trimmed
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| trimmed.parse::<f64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

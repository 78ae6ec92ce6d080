// Configuration validation

use crate::{ConfigError, Result};

/// Checks a deserialized configuration before it is used
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable field checks
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(invalid(format!("{} cannot be empty", field)));
        }
        Ok(())
    }

    pub fn in_range<T: PartialOrd + std::fmt::Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(invalid(format!(
                "{} must be between {} and {}, got {}",
                field, min, max, value
            )));
        }
        Ok(())
    }

    pub fn one_of(value: &str, allowed: &[&str], field: &str) -> Result<()> {
        if !allowed.iter().any(|a| a.eq_ignore_ascii_case(value)) {
            return Err(invalid(format!(
                "{} must be one of {}, got `{}`",
                field,
                allowed.join(", "),
                value
            )));
        }
        Ok(())
    }

    pub fn is_port(value: u16, field: &str) -> Result<()> {
        if value == 0 {
            return Err(invalid(format!("{} must be a valid port number", field)));
        }
        Ok(())
    }

    /// Empty, or an absolute path without a trailing slash (`/app`)
    pub fn is_context_path(value: &str, field: &str) -> Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        if !value.starts_with('/') || value.ends_with('/') {
            return Err(invalid(format!(
                "{} must start with `/` and not end with one, got `{}`",
                field, value
            )));
        }
        Ok(())
    }

    /// Absolute path ending in `/` (`/views/`)
    pub fn is_directory_prefix(value: &str, field: &str) -> Result<()> {
        if !value.starts_with('/') || !value.ends_with('/') {
            return Err(invalid(format!(
                "{} must start and end with `/`, got `{}`",
                field, value
            )));
        }
        Ok(())
    }

    /// Cookie names are HTTP tokens
    pub fn is_cookie_name(value: &str, field: &str) -> Result<()> {
        let valid = !value.is_empty()
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
        if !valid {
            return Err(invalid(format!("{} is not a valid cookie name: `{}`", field, value)));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::ValidationError(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("  ", "field").is_err());
    }

    #[test]
    fn test_range_validation() {
        assert!(ConfigValidator::in_range(5, 1, 10, "field").is_ok());
        assert!(ConfigValidator::in_range(0, 1, 10, "field").is_err());

        let err = ConfigValidator::in_range(11, 1, 10, "ttl").unwrap_err();
        assert_eq!(err.to_string(), "Invalid configuration: ttl must be between 1 and 10, got 11");
    }

    #[test]
    fn test_one_of_validation() {
        let allowed = ["json", "pretty"];
        assert!(ConfigValidator::one_of("JSON", &allowed, "format").is_ok());
        assert!(ConfigValidator::one_of("xml", &allowed, "format").is_err());
    }

    #[test]
    fn test_port_validation() {
        assert!(ConfigValidator::is_port(8080, "port").is_ok());
        assert!(ConfigValidator::is_port(0, "port").is_err());
    }

    #[test]
    fn test_path_shapes() {
        assert!(ConfigValidator::is_context_path("", "context_path").is_ok());
        assert!(ConfigValidator::is_context_path("/app", "context_path").is_ok());
        assert!(ConfigValidator::is_context_path("app", "context_path").is_err());
        assert!(ConfigValidator::is_context_path("/app/", "context_path").is_err());

        assert!(ConfigValidator::is_directory_prefix("/views/", "view_prefix").is_ok());
        assert!(ConfigValidator::is_directory_prefix("/views", "view_prefix").is_err());
    }

    #[test]
    fn test_cookie_name() {
        assert!(ConfigValidator::is_cookie_name("PORTICO_SESSION", "cookie").is_ok());
        assert!(ConfigValidator::is_cookie_name("bad name", "cookie").is_err());
        assert!(ConfigValidator::is_cookie_name("", "cookie").is_err());
    }
}

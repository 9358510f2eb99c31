//! Configuration validation
//!
//! Common validation checks shared by the cache and transport configuration.

use std::time::Duration;

/// Configuration validation result type
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid timeout value: {0}")]
    InvalidTimeout(String),

    #[error("Invalid store name: {0}")]
    InvalidStoreName(String),

    #[error("Invalid configuration parameter: {0}")]
    InvalidParameter(String),

    #[error("Malformed configuration document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Configuration validation trait
pub trait Validator {
    /// Validates the configuration settings
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` variant if any validation fails:
    /// - `InvalidTimeout` - if timeout or interval values are zero or exceed limits
    /// - `InvalidStoreName` - if the store namespace cannot be used as a directory name
    /// - `InvalidParameter` - if parameters are outside valid ranges
    fn validate(&self) -> ConfigResult<()>;
}

/// Common configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate timeout duration
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidTimeout` if:
    /// - The timeout duration is zero
    /// - The timeout duration exceeds 1 hour (3600 seconds)
    pub fn validate_timeout(timeout: Duration, name: &str) -> ConfigResult<()> {
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot be zero"
            )));
        }

        if timeout.as_secs() > 3600 {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot exceed 1 hour"
            )));
        }

        Ok(())
    }

    /// Validate a store namespace
    ///
    /// Store names end up as directory names for disk-backed stores, so only
    /// ASCII alphanumerics, `-`, `_` and `.` are accepted, and the name may not
    /// be `.` or `..`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidStoreName` on any other input.
    pub fn validate_store_name(name: &str) -> ConfigResult<()> {
        if name.is_empty() {
            return Err(ConfigurationError::InvalidStoreName(
                "store name cannot be empty".to_string(),
            ));
        }

        if name.len() > 128 {
            return Err(ConfigurationError::InvalidStoreName(format!(
                "{name} exceeds 128 characters"
            )));
        }

        if name == "." || name == ".." {
            return Err(ConfigurationError::InvalidStoreName(format!(
                "{name} is a reserved path component"
            )));
        }

        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(ConfigurationError::InvalidStoreName(format!(
                "{name} contains unsupported character {bad:?}"
            )));
        }

        Ok(())
    }

    /// Validate numeric range
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidParameter` if the value is outside
    /// the specified range [min, max] (inclusive).
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> ConfigResult<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(ConfigurationError::InvalidParameter(format!(
                "{name} must be between {min} and {max}, got {value}"
            )));
        }

        Ok(())
    }
}

/// Common configuration defaults
pub struct ConfigDefaults;

impl ConfigDefaults {
    pub const DEFAULT_STORE_NAME: &'static str = "fetchcache";
    pub const DEFAULT_SIZE_CEILING_BYTES: u64 = 50 * 1024 * 1024;
    pub const DEFAULT_DEBOUNCE_INTERVAL_MS: u64 = 1_000;
    pub const DEFAULT_MAX_AGE_SECS: u64 = 300;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_USER_AGENT: &'static str = "fetchcache/0.1";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_names() {
        assert!(ConfigValidator::validate_store_name("bvFetchCache").is_ok());
        assert!(ConfigValidator::validate_store_name("api-v2.cache_1").is_ok());
        assert!(ConfigValidator::validate_store_name("").is_err());
        assert!(ConfigValidator::validate_store_name("..").is_err());
        assert!(ConfigValidator::validate_store_name("a/b").is_err());
        assert!(ConfigValidator::validate_store_name("with space").is_err());
    }

    #[test]
    fn timeouts() {
        assert!(ConfigValidator::validate_timeout(Duration::from_millis(1), "t").is_ok());
        assert!(ConfigValidator::validate_timeout(Duration::ZERO, "t").is_err());
        assert!(ConfigValidator::validate_timeout(Duration::from_secs(3601), "t").is_err());
    }
}

//! Cache and transport configuration
//!
//! `CacheConfig` carries the recognised cache options (`storeName`,
//! `sizeCeilingBytes`, `debounceIntervalMs`) plus the freshness fallback.
//! It deserializes from the camelCase JSON form those options are usually
//! written in; missing fields take their defaults.

pub mod validation;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use validation::{ConfigDefaults, ConfigResult, ConfigValidator, ConfigurationError, Validator};

/// Cache configuration and limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Persistent namespace the cache reads and writes
    pub store_name: String,
    /// Total cached body bytes tolerated before budget eviction kicks in
    pub size_ceiling_bytes: u64,
    /// Minimum spacing between a write and the eviction sweep it triggers
    pub debounce_interval_ms: u64,
    /// Freshness lifetime for responses that carry neither `max-age` nor `Expires`
    pub default_max_age_secs: u64,
    /// Responses with a larger body are never admitted
    pub max_entry_bytes: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store_name: ConfigDefaults::DEFAULT_STORE_NAME.to_string(),
            size_ceiling_bytes: ConfigDefaults::DEFAULT_SIZE_CEILING_BYTES, // 50MB
            debounce_interval_ms: ConfigDefaults::DEFAULT_DEBOUNCE_INTERVAL_MS,
            default_max_age_secs: ConfigDefaults::DEFAULT_MAX_AGE_SECS, // 5 minutes
            max_entry_bytes: None,
        }
    }
}

impl CacheConfig {
    /// Create aggressive caching configuration
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            size_ceiling_bytes: 500 * 1024 * 1024, // 500MB
            debounce_interval_ms: 5_000,
            default_max_age_secs: 3600, // 1 hour
            ..Self::default()
        }
    }

    /// Create conservative caching configuration
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            size_ceiling_bytes: 20 * 1024 * 1024, // 20MB
            debounce_interval_ms: 250,
            default_max_age_secs: 60, // 1 minute
            max_entry_bytes: Some(2 * 1024 * 1024),
            ..Self::default()
        }
    }

    /// Configuration that keeps nothing: zero ceiling and zero lifetime
    #[must_use]
    pub fn no_cache() -> Self {
        Self {
            size_ceiling_bytes: 0,
            default_max_age_secs: 0,
            ..Self::default()
        }
    }

    /// Parse a JSON configuration document and validate it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Malformed` for unparseable JSON and the
    /// usual validation errors for out-of-range values.
    pub fn from_json(document: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = store_name.into();
        self
    }

    #[must_use]
    pub fn with_size_ceiling(mut self, bytes: u64) -> Self {
        self.size_ceiling_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_debounce_interval(mut self, interval: Duration) -> Self {
        self.debounce_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_default_max_age(mut self, max_age: Duration) -> Self {
        self.default_max_age_secs = max_age.as_secs();
        self
    }

    #[must_use]
    pub fn with_max_entry_bytes(mut self, bytes: Option<u64>) -> Self {
        self.max_entry_bytes = bytes;
        self
    }

    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_interval_ms)
    }

    pub fn default_max_age(&self) -> Duration {
        Duration::from_secs(self.default_max_age_secs)
    }
}

impl Validator for CacheConfig {
    fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate_store_name(&self.store_name)?;
        ConfigValidator::validate_timeout(self.debounce_interval(), "debounceIntervalMs")?;
        if let Some(max_entry_bytes) = self.max_entry_bytes {
            ConfigValidator::validate_range(max_entry_bytes, 1, u64::MAX, "maxEntryBytes")?;
        }
        Ok(())
    }
}

/// Settings for the bundled hyper transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Limit on TCP connection establishment
    pub connect_timeout: Duration,
    /// Limit on the whole exchange, body included
    pub request_timeout: Duration,
    /// Sent when the request does not set its own `User-Agent`
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: ConfigDefaults::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: ConfigDefaults::DEFAULT_REQUEST_TIMEOUT,
            user_agent: ConfigDefaults::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Validator for TransportConfig {
    fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate_timeout(self.connect_timeout, "connect_timeout")?;
        ConfigValidator::validate_timeout(self.request_timeout, "request_timeout")?;
        if self.user_agent.is_empty() {
            return Err(ConfigurationError::InvalidParameter(
                "user agent cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_options_load_from_camel_case_json() {
        let config = CacheConfig::from_json(
            r#"{ "storeName": "bvFetchCache", "sizeCeilingBytes": 10485760, "debounceIntervalMs": 250 }"#,
        )
        .expect("valid config");

        assert_eq!(config.store_name, "bvFetchCache");
        assert_eq!(config.size_ceiling_bytes, 10 * 1024 * 1024);
        assert_eq!(config.debounce_interval(), Duration::from_millis(250));
        assert_eq!(config.default_max_age_secs, ConfigDefaults::DEFAULT_MAX_AGE_SECS);
        assert_eq!(config.max_entry_bytes, None);
    }

    #[test]
    fn invalid_documents_are_rejected() {
        assert!(matches!(
            CacheConfig::from_json("{ not json"),
            Err(ConfigurationError::Malformed(_))
        ));
        assert!(matches!(
            CacheConfig::from_json(r#"{ "storeName": "../escape" }"#),
            Err(ConfigurationError::InvalidStoreName(_))
        ));
        assert!(matches!(
            CacheConfig::from_json(r#"{ "debounceIntervalMs": 0 }"#),
            Err(ConfigurationError::InvalidTimeout(_))
        ));
        assert!(matches!(
            CacheConfig::from_json(r#"{ "maxEntryBytes": 0 }"#),
            Err(ConfigurationError::InvalidParameter(_))
        ));
    }

    #[test]
    fn presets_are_valid() {
        for config in [
            CacheConfig::default(),
            CacheConfig::aggressive(),
            CacheConfig::conservative(),
            CacheConfig::no_cache(),
        ] {
            assert!(config.validate().is_ok());
        }
        assert!(TransportConfig::default().validate().is_ok());
    }
}

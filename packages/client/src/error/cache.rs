//! Errors of the caching layer itself.
//!
//! None of these ever reach a caller of `fetch`: store failures degrade to a
//! miss or a no-op, admission failures degrade to "do not cache", and a
//! duplicate registration is a bug in the orchestrator's control flow.

use crate::cache::CacheKey;

/// Failure of a `PersistentStore` operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode or decode entry {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("entry {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// The entry is present but can never be read back.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::Serialization { .. })
    }
}

/// Failure while evaluating an admission policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("admission policy panicked: {0}")]
    Panicked(String),

    #[error("response body not understood by admission policy: {0}")]
    InvalidBody(String),

    #[error("admission policy failed: {0}")]
    Failed(String),
}

/// Misuse of the pending request registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a pending request is already registered for key {0}")]
    DuplicateRegistration(CacheKey),
}

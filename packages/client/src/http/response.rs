//! Fully buffered HTTP response

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;

/// Where a response handed to a caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Produced by the transport during this fetch (possibly shared by
    /// several coalesced callers)
    Network,
    /// Reconstructed from a fresh persisted entry
    Cache,
}

/// Response carrying status, headers and the complete body.
///
/// Cloning is cheap: the body is reference counted and never mutated, so
/// every coalesced caller gets its own independent value.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl FetchResponse {
    /// A response produced by the network.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            source: ResponseSource::Network,
        }
    }

    /// Check if the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if the status is a client or server error
    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    pub fn is_cached(&self) -> bool {
        self.source == ResponseSource::Cache
    }

    /// First value of a header, if present.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns the UTF-8 error if the body is not valid text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_body_decodes() {
        let response = FetchResponse::new(StatusCode::OK, HeaderMap::new(), r#"{"count":3}"#);
        let value: serde_json::Value = response.json().expect("json body");
        assert_eq!(value["count"], 3);
        assert!(response.is_success());
        assert!(!response.is_cached());
    }

    #[test]
    fn error_statuses() {
        let response = FetchResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), "");
        assert!(response.is_error());
        assert!(!response.is_success());
    }
}

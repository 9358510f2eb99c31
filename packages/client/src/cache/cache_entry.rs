//! Persisted cache entries and their freshness metadata
//!
//! Every entry carries three metadata headers written atomically with the
//! body: `cache-control` with a `max-age` directive, `x-cached-time` (Unix
//! millis on the store clock) and `x-cache-size` (body length). An entry is
//! stale once `now - cached_at >= max_age`; stale entries read as absent but
//! stay in the store until an eviction sweep removes them.

use std::time::Duration;

use bytes::Bytes;
use http::header::{CACHE_CONTROL, EXPIRES};
use http::{HeaderMap, HeaderValue, StatusCode};

use super::cache_key::CacheKey;
use super::http_date;
use crate::http::{FetchResponse, ResponseSource};

/// Header holding the cached-at timestamp in Unix milliseconds.
pub const X_CACHED_TIME: &str = "x-cached-time";
/// Header holding the body size recorded at write time.
pub const X_CACHE_SIZE: &str = "x-cache-size";

/// Cached response entry with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub status: StatusCode,
    /// Response headers plus the freshness metadata
    pub metadata: HeaderMap,
    pub body: Bytes,
    /// Byte length of `body`, recorded at write time
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Stamp a network response for persistence.
    ///
    /// The freshness lifetime comes from the response's `max-age`, else from
    /// `Expires` relative to `cached_at_millis`, else `default_max_age`.
    pub fn from_response(
        key: CacheKey,
        response: &FetchResponse,
        cached_at_millis: u64,
        default_max_age: Duration,
    ) -> Self {
        let size_bytes = response.body.len() as u64;
        let mut metadata = response.headers.clone();

        if parse_max_age(&metadata).is_none() {
            let max_age_secs = expires_lifetime(&metadata, cached_at_millis)
                .unwrap_or_else(|| default_max_age.as_secs());
            if let Ok(directive) = HeaderValue::from_str(&format!("max-age={max_age_secs}")) {
                metadata.append(CACHE_CONTROL, directive);
            }
        }

        metadata.insert(X_CACHED_TIME, HeaderValue::from(cached_at_millis));
        metadata.insert(X_CACHE_SIZE, HeaderValue::from(size_bytes));

        Self {
            key,
            status: response.status,
            metadata,
            body: response.body.clone(),
            size_bytes,
        }
    }

    /// Freshness lifetime from the `max-age` directive.
    pub fn max_age(&self) -> Option<Duration> {
        parse_max_age(&self.metadata).map(Duration::from_secs)
    }

    /// Cached-at stamp in Unix milliseconds.
    pub fn cached_at_millis(&self) -> Option<u64> {
        header_u64(&self.metadata, X_CACHED_TIME)
    }

    /// Expiry instant in Unix milliseconds.
    pub fn expires_at_millis(&self) -> Option<u64> {
        let max_age = u64::try_from(self.max_age()?.as_millis()).unwrap_or(u64::MAX);
        Some(self.cached_at_millis()?.saturating_add(max_age))
    }

    /// Whether the entry must be treated as absent at `now_millis`.
    ///
    /// Entries missing either mandatory stamp are always stale.
    pub fn is_stale(&self, now_millis: u64) -> bool {
        match self.expires_at_millis() {
            Some(expires_at) => now_millis >= expires_at,
            None => true,
        }
    }

    /// Rebuild the response a caller sees on a cache hit.
    pub fn to_response(&self) -> FetchResponse {
        FetchResponse {
            status: self.status,
            headers: self.metadata.clone(),
            body: self.body.clone(),
            source: ResponseSource::Cache,
        }
    }
}

/// Parse the first `max-age` value across all `Cache-Control` headers.
pub(crate) fn parse_max_age(headers: &HeaderMap) -> Option<u64> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|directive| {
            let directive = directive.trim();
            let (name, value) = directive.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("max-age") {
                value.trim().trim_matches('"').parse::<u64>().ok()
            } else {
                None
            }
        })
}

fn expires_lifetime(headers: &HeaderMap, cached_at_millis: u64) -> Option<u64> {
    let expires = headers.get(EXPIRES)?.to_str().ok()?;
    match http_date::parse_http_date(expires) {
        Ok(expires_at) => Some(expires_at.saturating_sub(cached_at_millis) / 1000),
        // An unparseable Expires means "already expired" (RFC 9111 5.3).
        Err(_) => Some(0),
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKeyBuilder;

    const T: u64 = 1_700_000_000_000;

    fn response(headers: &[(&'static str, &str)]) -> FetchResponse {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(*name, HeaderValue::from_str(value).expect("header value"));
        }
        FetchResponse::new(StatusCode::OK, map, "Mock Data")
    }

    fn entry_for(headers: &[(&'static str, &str)]) -> CacheEntry {
        CacheEntry::from_response(
            CacheKeyBuilder::build("/data", None),
            &response(headers),
            T,
            Duration::from_secs(300),
        )
    }

    #[test]
    fn stamps_mandatory_metadata() {
        let entry = entry_for(&[("cache-control", "public, max-age=10")]);

        assert_eq!(entry.max_age(), Some(Duration::from_secs(10)));
        assert_eq!(entry.cached_at_millis(), Some(T));
        assert_eq!(entry.size_bytes, 9);
        assert_eq!(
            entry.metadata.get(X_CACHE_SIZE).and_then(|v| v.to_str().ok()),
            Some("9")
        );
        assert_eq!(entry.expires_at_millis(), Some(T + 10_000));
    }

    #[test]
    fn freshness_boundary() {
        let entry = entry_for(&[("cache-control", "max-age=10")]);

        assert!(!entry.is_stale(T));
        assert!(!entry.is_stale(T + 5_000));
        assert!(!entry.is_stale(T + 9_999));
        assert!(entry.is_stale(T + 10_000));
        assert!(entry.is_stale(T + 15_000));
    }

    #[test]
    fn falls_back_to_expires_then_default() {
        let expires = http_date::fmt_http_date(T + 60_000);
        let entry = entry_for(&[("expires", expires.as_str()), ("cache-control", "public")]);
        assert_eq!(entry.max_age(), Some(Duration::from_secs(60)));
        assert_eq!(
            entry.metadata.get_all(CACHE_CONTROL).iter().count(),
            2,
            "upstream directives are preserved"
        );

        let entry = entry_for(&[("expires", "not a date")]);
        assert_eq!(entry.max_age(), Some(Duration::ZERO));
        assert!(entry.is_stale(T));

        let entry = entry_for(&[]);
        assert_eq!(entry.max_age(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn missing_metadata_reads_as_stale() {
        let mut entry = entry_for(&[("cache-control", "max-age=3600")]);
        entry.metadata.remove(X_CACHED_TIME);
        assert!(entry.is_stale(T));
    }

    #[test]
    fn hit_rebuilds_the_response() {
        let entry = entry_for(&[("cache-control", "max-age=3600"), ("content-type", "text/plain")]);
        let hit = entry.to_response();

        assert!(hit.is_cached());
        assert_eq!(hit.status, StatusCode::OK);
        assert_eq!(hit.text(), Ok("Mock Data"));
        assert_eq!(
            hit.header("content-type").and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );
    }
}

//! Request description handed to the transport and to the key builder

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

/// Options that accompany a target.
///
/// `RequestOptions::default()` (GET, no headers, no body) is equivalent to
/// passing no options at all; the key builder treats both identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Append a header value; repeated names keep every value in order.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// True when these options carry nothing beyond the defaults.
    pub fn is_empty(&self) -> bool {
        self.method.as_str().eq_ignore_ascii_case("GET")
            && self.headers.is_empty()
            && self.body.as_ref().is_none_or(Bytes::is_empty)
    }
}

/// A logical request: target identifier plus options.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub target: String,
    pub options: RequestOptions,
}

impl FetchRequest {
    pub fn new(target: impl Into<String>, options: RequestOptions) -> Self {
        Self {
            target: target.into(),
            options,
        }
    }

    /// The target as a URL, when it is one.
    pub fn url(&self) -> Option<Url> {
        Url::parse(&self.target).ok()
    }

    /// Path component of the target, or the raw target if it does not parse.
    pub fn path(&self) -> String {
        self.url()
            .map(|url| url.path().to_string())
            .unwrap_or_else(|| self.target.clone())
    }
}

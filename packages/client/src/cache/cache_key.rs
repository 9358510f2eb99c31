//! Cache key generation for logical requests
//!
//! A key is a SHA-256 fingerprint over a canonical encoding of the target and
//! the request options. The encoding is length-prefixed so no two distinct
//! field sequences share a byte stream, and it is normalised so that
//! semantically identical requests (absent vs empty options, header order,
//! header name case, method case) collapse to the same key.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use ring::digest;
use url::Url;

use crate::http::RequestOptions;

/// Stable, opaque identity of a logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// Length of the hex digest backing every key.
    pub const DIGEST_LEN: usize = 64;

    /// Re-create a key from its persisted digest form.
    ///
    /// Returns `None` unless `digest` is exactly 64 lowercase hex characters.
    pub fn from_digest(digest: &str) -> Option<Self> {
        let valid = digest.len() == Self::DIGEST_LEN
            && digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(Arc::from(digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives `CacheKey`s from targets and options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Build the key for `target` with optional `options`.
    ///
    /// Pure and deterministic. A target that parses as a URL is normalised
    /// through `url::Url` first; anything else is hashed verbatim, so a
    /// malformed target simply yields a key nothing else will match.
    pub fn build(target: &str, options: Option<&RequestOptions>) -> CacheKey {
        let mut ctx = digest::Context::new(&digest::SHA256);

        write_field(&mut ctx, b"target", normalize_target(target).as_bytes());

        if let Some(options) = options.filter(|options| !options.is_empty()) {
            let method = options.method.as_str().to_ascii_uppercase();
            write_field(&mut ctx, b"method", method.as_bytes());

            // HeaderMap names are already lowercase; a stable sort keeps the
            // relative order of repeated values for the same name.
            let mut headers: Vec<(&str, &[u8])> = options
                .headers
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_bytes()))
                .collect();
            headers.sort_by(|a, b| a.0.cmp(b.0));

            for (name, value) in headers {
                write_field(&mut ctx, b"header-name", name.as_bytes());
                write_field(&mut ctx, b"header-value", value);
            }

            if let Some(body) = options.body.as_ref().filter(|body| !body.is_empty()) {
                write_field(&mut ctx, b"body", body);
            }
        }

        CacheKey(Arc::from(hex::encode(ctx.finish().as_ref())))
    }
}

fn normalize_target(target: &str) -> Cow<'_, str> {
    match Url::parse(target) {
        Ok(url) => Cow::Owned(String::from(url)),
        Err(_) => Cow::Borrowed(target),
    }
}

fn write_field(ctx: &mut digest::Context, tag: &[u8], value: &[u8]) {
    ctx.update(&(tag.len() as u64).to_be_bytes());
    ctx.update(tag);
    ctx.update(&(value.len() as u64).to_be_bytes());
    ctx.update(value);
}

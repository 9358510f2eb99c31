//! Admission policies
//!
//! A policy decides, once per successful network response and before any
//! write, whether the response may be persisted. Evaluation fails closed: an
//! `Err` or a panic inside the policy means "do not cache", and the live
//! response is still returned to every waiter.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use http::header::{CACHE_CONTROL, PRAGMA};

use crate::cache::cache_entry::parse_max_age;
use crate::error::AdmissionError;
use crate::http::{FetchRequest, FetchResponse};

pub trait AdmissionPolicy: Send + Sync + 'static {
    /// Whether `response`, produced for `request`, may be cached.
    ///
    /// # Errors
    ///
    /// Any `AdmissionError` is treated as a refusal.
    fn should_cache(
        &self,
        request: &FetchRequest,
        response: &FetchResponse,
    ) -> Result<bool, AdmissionError>;
}

/// Evaluate `policy`, converting a panic into `AdmissionError::Panicked`.
pub fn evaluate(
    policy: &dyn AdmissionPolicy,
    request: &FetchRequest,
    response: &FetchResponse,
) -> Result<bool, AdmissionError> {
    match panic::catch_unwind(AssertUnwindSafe(|| policy.should_cache(request, response))) {
        Ok(decision) => decision,
        Err(payload) => Err(AdmissionError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Admits every response. Used when no policy is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct AdmitAll;

impl AdmissionPolicy for AdmitAll {
    fn should_cache(&self, _: &FetchRequest, _: &FetchResponse) -> Result<bool, AdmissionError> {
        Ok(true)
    }
}

/// Policy backed by a plain predicate over the response.
pub struct FnAdmission<F>(F);

/// Wrap `predicate` as an `AdmissionPolicy`.
pub fn from_fn<F>(predicate: F) -> FnAdmission<F>
where
    F: Fn(&FetchResponse) -> bool + Send + Sync + 'static,
{
    FnAdmission(predicate)
}

impl<F> AdmissionPolicy for FnAdmission<F>
where
    F: Fn(&FetchResponse) -> bool + Send + Sync + 'static,
{
    fn should_cache(&self, _: &FetchRequest, response: &FetchResponse) -> Result<bool, AdmissionError> {
        Ok((self.0)(response))
    }
}

impl<F> fmt::Debug for FnAdmission<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnAdmission")
    }
}

/// Policy that parses the body as JSON and hands the value, together with
/// the request path, to a predicate.
///
/// A body that is not JSON is an `AdmissionError::InvalidBody`, so such
/// responses are never cached.
pub struct JsonAdmission<F>(F);

impl<F> JsonAdmission<F>
where
    F: Fn(&serde_json::Value, &str) -> bool + Send + Sync + 'static,
{
    pub fn new(predicate: F) -> Self {
        Self(predicate)
    }
}

impl<F> AdmissionPolicy for JsonAdmission<F>
where
    F: Fn(&serde_json::Value, &str) -> bool + Send + Sync + 'static,
{
    fn should_cache(
        &self,
        request: &FetchRequest,
        response: &FetchResponse,
    ) -> Result<bool, AdmissionError> {
        let value: serde_json::Value = response
            .json()
            .map_err(|e| AdmissionError::InvalidBody(e.to_string()))?;
        Ok((self.0)(&value, &request.path()))
    }
}

impl<F> fmt::Debug for JsonAdmission<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonAdmission")
    }
}

/// Honours the response's own caching directives.
///
/// Refuses error statuses, `Cache-Control: no-store | no-cache | private`,
/// `max-age=0` and `Pragma: no-cache`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpSemantics;

impl AdmissionPolicy for HttpSemantics {
    fn should_cache(&self, _: &FetchRequest, response: &FetchResponse) -> Result<bool, AdmissionError> {
        if response.is_error() {
            return Ok(false);
        }

        let forbidden = response
            .headers
            .get_all(CACHE_CONTROL)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|directive| directive.trim().to_ascii_lowercase())
            .any(|directive| matches!(directive.as_str(), "no-cache" | "no-store" | "private"));
        if forbidden {
            tracing::debug!(
                target: "fetchcache::cache::admission",
                status = %response.status,
                "Response marked as not cacheable by Cache-Control header"
            );
            return Ok(false);
        }

        if parse_max_age(&response.headers) == Some(0) {
            return Ok(false);
        }

        let pragma_no_cache = response
            .headers
            .get_all(PRAGMA)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .any(|value| value.to_ascii_lowercase().contains("no-cache"));

        Ok(!pragma_no_cache)
    }
}

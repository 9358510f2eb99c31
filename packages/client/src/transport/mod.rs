//! Network capability consumed by the cache
//!
//! The cache never opens connections itself. It hands each miss to a
//! `Transport`, which performs exactly one exchange and reports the response
//! or a `TransportError`. `HyperTransport` is the bundled plain-HTTP/1.1
//! implementation; tests and embedders supply their own.

pub mod http1;

use std::future::Future;
use std::sync::Arc;

pub use http1::HyperTransport;

use crate::error::Result;
use crate::http::{FetchRequest, FetchResponse};

pub trait Transport: Send + Sync + 'static {
    /// Perform one network exchange for `request`.
    ///
    /// Non-2xx statuses are responses, not errors.
    fn perform(&self, request: &FetchRequest) -> impl Future<Output = Result<FetchResponse>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn perform(&self, request: &FetchRequest) -> impl Future<Output = Result<FetchResponse>> + Send {
        (**self).perform(request)
    }
}

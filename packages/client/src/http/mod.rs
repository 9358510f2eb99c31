//! Request and response values exchanged with the cache
//!
//! These are plain, fully-buffered values: the cache needs the complete body
//! both to evaluate admission and to persist it, so nothing here streams.

pub mod request;
pub mod response;

pub use request::{FetchRequest, RequestOptions};
pub use response::{FetchResponse, ResponseSource};

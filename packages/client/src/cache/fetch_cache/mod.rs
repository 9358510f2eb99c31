//! Request-coalescing fetch cache
//!
//! - `core`: `FetchCache` and the state shared with in-flight tasks
//! - `operations`: the fetch cycle, flush and manual eviction

pub mod core;
pub mod operations;

pub use self::core::FetchCache;

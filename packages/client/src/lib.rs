//! # fetchcache client
//!
//! Request-coalescing HTTP response cache. Concurrent fetches for the same
//! resource share one network operation, admitted responses are persisted
//! with a freshness lifetime, and a debounced sweep keeps the namespace
//! under a size ceiling.
//!
//! ## Features
//!
//! - **Exactly one in-flight request per key**, with every waiter receiving
//!   the same response or the same error
//! - **TTL freshness** from `Cache-Control: max-age`, `Expires`, or a default
//! - **Pluggable admission policies** (`AdmitAll`, predicates, JSON
//!   inspection, HTTP cache semantics)
//! - **Size-budget eviction**: expired entries first, then oldest-cached
//! - **Pluggable stores** (`MemoryStore`, `DiskStore`) and transports
//!   (`HyperTransport` for plain HTTP/1.1)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fetchcache_client::{CacheConfig, FetchCache, HyperTransport, MemoryStore, TransportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HyperTransport::new(&TransportConfig::default())?;
//!     let cache = FetchCache::new(CacheConfig::default(), MemoryStore::default(), transport);
//!
//!     let response = cache.fetch("http://example.com/data.json", None).await?;
//!     println!("{} ({} bytes, cached: {})", response.status, response.body.len(), response.is_cached());
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;

// Prelude with canonical types
pub mod prelude;

pub use crate::prelude::*;

//! fetchcache public API
//!
//! Request-coalescing HTTP response cache with a fluent builder. The engine
//! lives in `fetchcache_client`; this crate re-exports it and adds
//! `FetchCacheBuilder`, which assembles configuration, store, transport and
//! admission policy into a running `FetchCache`.
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use fetchcache::TransportConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = fetchcache::builder()
//!         .store_name("bvFetchCache")
//!         .size_ceiling(10 * 1024 * 1024)
//!         .debounce_interval(Duration::from_millis(500))
//!         .disk_store(std::env::temp_dir())
//!         .hyper_transport(TransportConfig::default())
//!         .admit_if(|response| response.is_success())
//!         .build()
//!         .await?;
//!
//!     let first = cache.fetch("http://example.com/data.json", None).await?;
//!     let second = cache.fetch("http://example.com/data.json", None).await?;
//!     assert!(!first.is_cached());
//!     assert!(second.is_cached());
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod builder;

// Re-export all public API components
pub use builder::{BuildError, FetchCacheBuilder};

// Re-export important types from client package
pub use fetchcache_client::prelude::*;
pub use fetchcache_client::{cache, config, error, transport};

/// Start building a cache
///
/// Shorthand for `FetchCacheBuilder::new()`
#[must_use]
pub fn builder() -> FetchCacheBuilder {
    FetchCacheBuilder::new()
}

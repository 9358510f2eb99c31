//! Request-coalescing HTTP response cache
//!
//! The cache is assembled from small parts that each own one concern:
//! - `cache_key`: deterministic SHA-256 keys over target and options
//! - `pending`: at most one in-flight network operation per key
//! - `store`: persistent namespaces (`MemoryStore`, `DiskStore`)
//! - `cache_entry`: freshness metadata stamped on every write
//! - `admission`: policies deciding whether a response may be persisted
//! - `cache_budget` and `eviction`: size accounting and debounced sweeps
//! - `fetch_cache`: `FetchCache`, the orchestrator tying them together

pub mod admission;
pub mod cache_budget;
pub mod cache_entry;
pub mod cache_key;
pub mod cache_stats;
pub mod clock;
pub mod eviction;
pub mod fetch_cache;
pub mod http_date;
pub mod pending;
pub mod store;

// Re-export all public types and functions
pub use admission::{AdmissionPolicy, AdmitAll, FnAdmission, HttpSemantics, JsonAdmission};
pub use cache_budget::CacheBudget;
pub use cache_entry::{CacheEntry, X_CACHE_SIZE, X_CACHED_TIME};
pub use cache_key::{CacheKey, CacheKeyBuilder};
pub use cache_stats::{CacheStats, CacheStatsSnapshot};
pub use clock::{Clock, ManualClock, SystemClock};
pub use eviction::{EvictionManager, EvictionReport, EvictionScheduler};
pub use fetch_cache::FetchCache;
pub use http_date::{HttpDateParseError, fmt_http_date, parse_http_date};
pub use pending::{Outcome, PendingRequest, PendingRequestRegistry, Registration};
pub use store::{DiskStore, MemoryStore, PersistentStore};

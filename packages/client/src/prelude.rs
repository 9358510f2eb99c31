//! fetchcache prelude
//!
//! The types most callers need: the cache, its configuration, the request
//! and response values, and the extension points.

// Cache and its extension points
pub use crate::cache::{
    AdmissionPolicy, AdmitAll, CacheEntry, CacheKey, CacheKeyBuilder, CacheStats,
    CacheStatsSnapshot, Clock, DiskStore, EvictionReport, FetchCache, FnAdmission, HttpSemantics,
    JsonAdmission, ManualClock, MemoryStore, PersistentStore, SystemClock,
};

// Configuration
pub use crate::config::{CacheConfig, ConfigurationError, TransportConfig, Validator};

// Errors
pub use crate::error::{AdmissionError, Error, Kind, Result, StoreError, TransportError};

// Request and response values
pub use crate::http::{FetchRequest, FetchResponse, RequestOptions, ResponseSource};

// Network capability
pub use crate::transport::{HyperTransport, Transport};

// HTTP standard types from http crate
pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

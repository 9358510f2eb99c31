//! Core `FetchCacheBuilder` structure and configuration methods

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use fetchcache_client::cache::admission;
use fetchcache_client::{AdmissionPolicy, AdmitAll, CacheConfig, Clock, FetchResponse, SystemClock};

use super::store::InMemory;
use super::transport::NoTransport;

/// Builder for a ready-to-use `FetchCache`
///
/// Type parameter `St` is the store selection (`InMemory` by default,
/// `OnDisk` or `Provided`) and `T` the transport selection (`NoTransport`
/// until one is chosen).
pub struct FetchCacheBuilder<St = InMemory, T = NoTransport> {
    pub(crate) config: CacheConfig,
    pub(crate) store: St,
    pub(crate) transport: T,
    pub(crate) admission: Arc<dyn AdmissionPolicy>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl FetchCacheBuilder {
    /// Start from the default configuration, an in-memory store, the
    /// admit-everything policy and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            store: InMemory,
            transport: NoTransport,
            admission: Arc::new(AdmitAll),
            clock: Arc::new(SystemClock),
        }
    }
}

impl Default for FetchCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<St, T> FetchCacheBuilder<St, T> {
    /// Replace the whole configuration
    #[must_use]
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn store_name(mut self, store_name: impl Into<String>) -> Self {
        self.config = self.config.with_store_name(store_name);
        self
    }

    #[must_use]
    pub fn size_ceiling(mut self, bytes: u64) -> Self {
        self.config = self.config.with_size_ceiling(bytes);
        self
    }

    #[must_use]
    pub fn debounce_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_debounce_interval(interval);
        self
    }

    #[must_use]
    pub fn default_max_age(mut self, max_age: Duration) -> Self {
        self.config = self.config.with_default_max_age(max_age);
        self
    }

    #[must_use]
    pub fn max_entry_bytes(mut self, bytes: u64) -> Self {
        self.config = self.config.with_max_entry_bytes(Some(bytes));
        self
    }

    /// Decide admission with `policy`
    #[must_use]
    pub fn admission<P: AdmissionPolicy>(mut self, policy: P) -> Self {
        self.admission = Arc::new(policy);
        self
    }

    /// Admit exactly the responses `predicate` accepts
    #[must_use]
    pub fn admit_if<F>(self, predicate: F) -> Self
    where
        F: Fn(&FetchResponse) -> bool + Send + Sync + 'static,
    {
        self.admission(admission::from_fn(predicate))
    }

    /// Read time from `clock` for cached-at stamps and staleness
    #[must_use]
    pub fn clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub(crate) fn with_store<St2>(self, store: St2) -> FetchCacheBuilder<St2, T> {
        FetchCacheBuilder {
            config: self.config,
            store,
            transport: self.transport,
            admission: self.admission,
            clock: self.clock,
        }
    }

    pub(crate) fn with_transport<T2>(self, transport: T2) -> FetchCacheBuilder<St, T2> {
        FetchCacheBuilder {
            config: self.config,
            store: self.store,
            transport,
            admission: self.admission,
            clock: self.clock,
        }
    }
}

impl<St: fmt::Debug, T: fmt::Debug> fmt::Debug for FetchCacheBuilder<St, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCacheBuilder")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

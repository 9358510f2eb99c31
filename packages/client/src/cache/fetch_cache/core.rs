//! FetchCache structure and construction

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;

use super::super::admission::{AdmissionPolicy, AdmitAll};
use super::super::cache_budget::CacheBudget;
use super::super::cache_stats::CacheStats;
use super::super::clock::{Clock, SystemClock};
use super::super::eviction::{EvictionManager, EvictionScheduler};
use super::super::pending::PendingRequestRegistry;
use super::super::store::PersistentStore;
use crate::config::CacheConfig;
use crate::transport::Transport;

/// State shared between the cache handle and its spawned network tasks.
pub(super) struct CacheState<S, T> {
    pub(super) config: CacheConfig,
    pub(super) store: Arc<S>,
    pub(super) transport: T,
    pub(super) admission: Arc<dyn AdmissionPolicy>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) registry: PendingRequestRegistry,
    pub(super) budget: Arc<CacheBudget>,
    pub(super) stats: Arc<CacheStats>,
    pub(super) eviction: Arc<EvictionManager<S>>,
    pub(super) scheduler: Arc<EvictionScheduler>,
}

/// HTTP response cache over one store namespace.
///
/// Concurrent fetches for the same key share one network operation, fresh
/// entries are served from the store, and writes schedule a debounced
/// eviction sweep that keeps the namespace under its size ceiling.
///
/// Dropping the cache stops its background sweeper. Network operations
/// already in flight run to completion.
pub struct FetchCache<S, T> {
    pub(super) inner: Arc<CacheState<S, T>>,
    sweeper: Option<JoinHandle<()>>,
}

impl<S: PersistentStore, T: Transport> FetchCache<S, T> {
    /// Cache with the admit-everything policy and the system clock.
    ///
    /// Debounced sweeps only run if this is called inside a tokio runtime.
    pub fn new(config: CacheConfig, store: S, transport: T) -> Self {
        Self::with_parts(
            config,
            Arc::new(store),
            transport,
            Arc::new(AdmitAll),
            Arc::new(SystemClock),
        )
    }

    pub fn with_parts(
        config: CacheConfig,
        store: Arc<S>,
        transport: T,
        admission: Arc<dyn AdmissionPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let budget = Arc::new(CacheBudget::new());
        let stats = Arc::new(CacheStats::new());
        let eviction = Arc::new(EvictionManager::new(
            Arc::clone(&store),
            Arc::clone(&budget),
            Arc::clone(&stats),
            Arc::clone(&clock),
            config.size_ceiling_bytes,
        ));
        let scheduler = Arc::new(EvictionScheduler::new(config.debounce_interval()));
        let sweeper = EvictionScheduler::spawn(Arc::clone(&scheduler), Arc::clone(&eviction));

        tracing::debug!(
            target: "fetchcache::cache",
            store = store.name(),
            size_ceiling_bytes = config.size_ceiling_bytes,
            debounce_interval_ms = config.debounce_interval_ms,
            "Created fetch cache"
        );

        Self {
            inner: Arc::new(CacheState {
                config,
                store,
                transport,
                admission,
                clock,
                registry: PendingRequestRegistry::new(),
                budget,
                stats,
                eviction,
                scheduler,
            }),
            sweeper,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.inner.stats
    }

    /// Bytes currently accounted to live entries.
    pub fn budget(&self) -> u64 {
        self.inner.budget.current()
    }

    /// Number of keys with a network operation in flight.
    pub fn pending_requests(&self) -> usize {
        self.inner.registry.len()
    }

    /// Whether a debounced sweep is waiting to run.
    pub fn sweep_pending(&self) -> bool {
        self.inner.scheduler.is_pending()
    }
}

impl<S, T> Drop for FetchCache<S, T> {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

impl<S, T> fmt::Debug for FetchCache<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchCache")
            .field("config", &self.inner.config)
            .field("budget", &self.inner.budget.current())
            .field("pending", &self.inner.registry.len())
            .finish_non_exhaustive()
    }
}

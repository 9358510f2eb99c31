//! Cache statistics and metrics tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Statistics for the fetch cache
#[derive(Debug)]
pub struct CacheStats {
    /// Fresh entries served from the store
    pub hits: AtomicU64,
    /// Lookups that found no entry
    pub misses: AtomicU64,
    /// Lookups that found an expired entry
    pub stale: AtomicU64,
    /// Callers attached to an already in-flight request
    pub coalesced: AtomicU64,
    /// Network operations started
    pub network_fetches: AtomicU64,
    /// Network operations that failed
    pub transport_failures: AtomicU64,
    /// Responses admitted and written
    pub admitted: AtomicU64,
    /// Responses the policy declined
    pub rejected: AtomicU64,
    /// Policy evaluations that failed
    pub admission_errors: AtomicU64,
    /// Store operations that failed
    pub store_errors: AtomicU64,
    /// Entries removed because they expired
    pub expired_evictions: AtomicU64,
    /// Entries removed to get under the size ceiling
    pub budget_evictions: AtomicU64,
    /// Completed eviction sweeps
    pub sweeps: AtomicU64,
    /// Completed flushes
    pub flushes: AtomicU64,
    /// Cache creation time
    pub created_at: Instant,
}

/// Point-in-time copy of `CacheStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stale: u64,
    pub coalesced: u64,
    pub network_fetches: u64,
    pub transport_failures: u64,
    pub admitted: u64,
    pub rejected: u64,
    pub admission_errors: u64,
    pub store_errors: u64,
    pub expired_evictions: u64,
    pub budget_evictions: u64,
    pub sweeps: u64,
    pub flushes: u64,
}

impl CacheStats {
    /// Create new cache statistics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_fetch(&self) {
        self.network_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admission_error(&self) {
        self.admission_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired_eviction(&self) {
        self.expired_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_budget_eviction(&self) {
        self.budget_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sweep(&self) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get hit ratio over all lookups that reached the store
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits
            + self.misses.load(Ordering::Relaxed)
            + self.stale.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else if hits > (1u64 << 53) || total > (1u64 << 53) {
            let hit_rate_scaled = (u128::from(hits) * 1_000_000_000) / u128::from(total);
            (hit_rate_scaled as f64) / 1_000_000_000.0
        } else {
            (hits as f64) / (total as f64)
        }
    }

    /// Get cache age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            admission_errors: self.admission_errors.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            expired_evictions: self.expired_evictions.load(Ordering::Relaxed),
            budget_evictions: self.budget_evictions.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            network_fetches: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            admitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            admission_errors: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
            expired_evictions: AtomicU64::new(0),
            budget_evictions: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            created_at: Instant::now(),
        }
    }
}

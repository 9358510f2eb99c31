//! Expiry and budget eviction
//!
//! A sweep runs in two passes over the store namespace: first every expired
//! entry is deleted, then, if the surviving entries still exceed the size
//! ceiling, entries are deleted oldest `cached_at` first until the total is
//! at or below it. Entries the store reports as corrupt are deleted in the
//! first pass. Failed deletes are logged and skipped; the next sweep retries
//! them.

pub mod scheduler;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use scheduler::EvictionScheduler;

use super::cache_budget::CacheBudget;
use super::cache_key::CacheKey;
use super::cache_stats::CacheStats;
use super::clock::Clock;
use super::store::PersistentStore;
use crate::error::StoreError;

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Keys listed by the store
    pub scanned: usize,
    /// Entries deleted because they were stale
    pub expired: usize,
    /// Entries deleted to get under the ceiling
    pub evicted: usize,
    /// Unreadable entries deleted
    pub discarded: usize,
    /// Reads or deletes that failed and were skipped
    pub failed: usize,
    pub bytes_reclaimed: u64,
    /// Budget after the sweep
    pub remaining_bytes: u64,
    /// Every deleted key, expired and corrupt ones first, then in eviction
    /// order
    pub evicted_keys: Vec<CacheKey>,
}

struct Survivor {
    cached_at: u64,
    key: CacheKey,
    size_bytes: u64,
}

/// Runs sweeps against one store, never more than one at a time.
pub struct EvictionManager<S> {
    store: Arc<S>,
    budget: Arc<CacheBudget>,
    stats: Arc<CacheStats>,
    clock: Arc<dyn Clock>,
    ceiling_bytes: u64,
    sweep_lock: Mutex<()>,
}

impl<S: PersistentStore> EvictionManager<S> {
    pub fn new(
        store: Arc<S>,
        budget: Arc<CacheBudget>,
        stats: Arc<CacheStats>,
        clock: Arc<dyn Clock>,
        ceiling_bytes: u64,
    ) -> Self {
        Self {
            store,
            budget,
            stats,
            clock,
            ceiling_bytes,
            sweep_lock: Mutex::new(()),
        }
    }

    pub fn ceiling_bytes(&self) -> u64 {
        self.ceiling_bytes
    }

    /// Run one expiry pass followed by one budget pass.
    ///
    /// Waits for any sweep or purge already running to finish first. The
    /// budget is reset to the recomputed total of the surviving entries.
    pub async fn sweep(&self) -> EvictionReport {
        let _sweeping = self.sweep_lock.lock().await;
        let now = self.clock.now_millis();
        let mut report = EvictionReport::default();

        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                self.stats.record_store_error();
                tracing::warn!(
                    target: "fetchcache::cache::eviction",
                    store = self.store.name(),
                    error = %e,
                    "Eviction sweep skipped: cannot list keys"
                );
                report.failed += 1;
                report.remaining_bytes = self.budget.current();
                return report;
            }
        };
        report.scanned = keys.len();

        let mut survivors = Vec::with_capacity(keys.len());
        for key in keys {
            let entry = match self.store.get(&key).await {
                Ok(Some(entry)) => entry,
                Ok(None) => continue,
                Err(e) if e.is_corrupt() => {
                    tracing::warn!(
                        target: "fetchcache::cache::eviction",
                        key = %key,
                        error = %e,
                        "Discarding corrupt entry"
                    );
                    self.stats.record_store_error();
                    if self.delete(&key, &mut report).await {
                        report.discarded += 1;
                        report.evicted_keys.push(key);
                    }
                    continue;
                }
                Err(e) => {
                    self.stats.record_store_error();
                    tracing::warn!(
                        target: "fetchcache::cache::eviction",
                        key = %key,
                        error = %e,
                        "Skipping unreadable entry"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let survivor = Survivor {
                cached_at: entry.cached_at_millis().unwrap_or_default(),
                key,
                size_bytes: entry.size_bytes,
            };

            if entry.is_stale(now) && self.delete(&survivor.key, &mut report).await {
                report.expired += 1;
                report.bytes_reclaimed += survivor.size_bytes;
                report.evicted_keys.push(survivor.key);
                self.stats.record_expired_eviction();
                continue;
            }

            survivors.push(survivor);
        }

        let mut total: u64 = survivors.iter().map(|s| s.size_bytes).sum();

        if total > self.ceiling_bytes {
            survivors.sort_by(|a, b| a.cached_at.cmp(&b.cached_at).then_with(|| a.key.cmp(&b.key)));

            for survivor in survivors {
                if total <= self.ceiling_bytes {
                    break;
                }
                if self.delete(&survivor.key, &mut report).await {
                    total = total.saturating_sub(survivor.size_bytes);
                    report.evicted += 1;
                    report.bytes_reclaimed += survivor.size_bytes;
                    report.evicted_keys.push(survivor.key);
                    self.stats.record_budget_eviction();
                }
            }
        }

        self.budget.set(total);
        report.remaining_bytes = total;
        self.stats.record_sweep();

        tracing::info!(
            target: "fetchcache::cache::eviction",
            store = self.store.name(),
            scanned = report.scanned,
            expired = report.expired,
            evicted = report.evicted,
            discarded = report.discarded,
            failed = report.failed,
            bytes_reclaimed = report.bytes_reclaimed,
            remaining_bytes = report.remaining_bytes,
            ceiling_bytes = self.ceiling_bytes,
            "Eviction sweep complete"
        );

        report
    }

    /// Delete every entry in the namespace and reset the budget.
    ///
    /// Serialized with sweeps. Every key is attempted; the first failure is
    /// returned after the rest have been tried, and the budget is then left
    /// for the next sweep to reconcile.
    ///
    /// # Errors
    ///
    /// The store's error for the listing or for the first failed delete.
    pub async fn purge_all(&self) -> Result<usize, StoreError> {
        let _sweeping = self.sweep_lock.lock().await;

        let keys = self.store.keys().await?;
        let mut removed = 0;
        let mut first_error = None;

        for key in &keys {
            match self.store.delete(key).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    self.stats.record_store_error();
                    tracing::warn!(
                        target: "fetchcache::cache::eviction",
                        key = %key,
                        error = %e,
                        "Flush could not delete entry"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        self.budget.reset();
        self.stats.record_flush();
        tracing::info!(
            target: "fetchcache::cache::eviction",
            store = self.store.name(),
            removed,
            "Flushed store"
        );
        Ok(removed)
    }

    async fn delete(&self, key: &CacheKey, report: &mut EvictionReport) -> bool {
        match self.store.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                self.stats.record_store_error();
                tracing::warn!(
                    target: "fetchcache::cache::eviction",
                    key = %key,
                    error = %e,
                    "Eviction delete failed; will retry next sweep"
                );
                report.failed += 1;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use http::{HeaderMap, StatusCode};

    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::store::MemoryStore;
    use crate::cache::{CacheEntry, CacheKeyBuilder};
    use crate::http::FetchResponse;

    const MIB: usize = 1024 * 1024;

    fn entry(target: &str, size: usize, cached_at: u64, max_age: Duration) -> CacheEntry {
        let response = FetchResponse::new(StatusCode::OK, HeaderMap::new(), vec![0u8; size]);
        CacheEntry::from_response(CacheKeyBuilder::build(target, None), &response, cached_at, max_age)
    }

    struct Fixture<S> {
        store: Arc<S>,
        budget: Arc<CacheBudget>,
        stats: Arc<CacheStats>,
        clock: Arc<ManualClock>,
        manager: EvictionManager<S>,
    }

    fn fixture<S: PersistentStore>(store: S, ceiling: u64) -> Fixture<S> {
        let store = Arc::new(store);
        let budget = Arc::new(CacheBudget::new());
        let stats = Arc::new(CacheStats::new());
        let clock = Arc::new(ManualClock::new(10_000));
        let manager = EvictionManager::new(
            store.clone(),
            budget.clone(),
            stats.clone(),
            clock.clone(),
            ceiling,
        );
        Fixture {
            store,
            budget,
            stats,
            clock,
            manager,
        }
    }

    async fn insert<S: PersistentStore>(fx: &Fixture<S>, entry: CacheEntry) {
        fx.budget.add(entry.size_bytes);
        let key = entry.key.clone();
        fx.store.put(&key, entry).await.expect("put");
    }

    #[tokio::test]
    async fn oldest_entries_are_evicted_first() {
        let fx = fixture(MemoryStore::new("ns"), 10 * MIB as u64);
        let hour = Duration::from_secs(3600);
        let a = entry("/a", 4 * MIB, 1, hour);
        let b = entry("/b", 4 * MIB, 2, hour);
        let c = entry("/c", 4 * MIB, 3, hour);
        let (ka, kb, kc) = (a.key.clone(), b.key.clone(), c.key.clone());

        // Insert out of order; only cached_at decides.
        insert(&fx, c).await;
        insert(&fx, a).await;
        insert(&fx, b).await;
        assert_eq!(fx.budget.current(), 12 * MIB as u64);

        let report = fx.manager.sweep().await;

        assert_eq!(report.evicted_keys, vec![ka.clone()]);
        assert_eq!(report.evicted, 1);
        assert_eq!(report.expired, 0);
        assert_eq!(report.remaining_bytes, 8 * MIB as u64);
        assert_eq!(fx.budget.current(), 8 * MIB as u64);
        assert!(!fx.store.contains(&ka));
        assert!(fx.store.contains(&kb));
        assert!(fx.store.contains(&kc));
        assert_eq!(fx.stats.snapshot().budget_evictions, 1);
    }

    #[tokio::test]
    async fn expired_entries_go_before_budget_pressure() {
        let fx = fixture(MemoryStore::new("ns"), 100);
        insert(&fx, entry("/old", 10, 0, Duration::from_secs(5))).await;
        insert(&fx, entry("/fresh", 10, 9_000, Duration::from_secs(60))).await;

        // Exactly at the boundary counts as expired.
        fx.clock.set(5_000);
        let report = fx.manager.sweep().await;
        assert_eq!(report.expired, 1);
        assert_eq!(report.evicted, 0);
        assert_eq!(report.remaining_bytes, 10);
        assert_eq!(fx.store.len(), 1);
        assert_eq!(fx.stats.snapshot().expired_evictions, 1);
    }

    #[tokio::test]
    async fn budget_is_reconciled_against_the_store() {
        let fx = fixture(MemoryStore::new("ns"), 1_000);
        insert(&fx, entry("/a", 30, 1, Duration::from_secs(60))).await;
        fx.budget.add(500);

        let report = fx.manager.sweep().await;
        assert_eq!(report.bytes_reclaimed, 0);
        assert_eq!(fx.budget.current(), 30);
    }

    #[tokio::test]
    async fn purge_all_empties_the_namespace() {
        let fx = fixture(MemoryStore::new("ns"), 1_000);
        insert(&fx, entry("/a", 30, 1, Duration::from_secs(60))).await;
        insert(&fx, entry("/b", 30, 2, Duration::from_secs(60))).await;

        assert_eq!(fx.manager.purge_all().await.expect("purge"), 2);
        assert!(fx.store.is_empty());
        assert_eq!(fx.budget.current(), 0);
        assert_eq!(fx.stats.snapshot().flushes, 1);
    }

    #[tokio::test]
    async fn corrupt_entries_are_discarded() {
        let root = tempfile::tempdir().expect("tempdir");
        let store = crate::cache::store::DiskStore::open(root.path(), "ns")
            .await
            .expect("open");
        let fx = fixture(store, 1_000);
        let good = entry("/good", 30, 1, Duration::from_secs(60));
        let good_key = good.key.clone();
        insert(&fx, good).await;

        let broken = CacheKeyBuilder::build("/broken", None);
        tokio::fs::write(fx.store.dir().join(format!("{broken}.entry.json")), b"{ truncated")
            .await
            .expect("write garbage");
        assert_eq!(fx.store.keys().await.expect("keys").len(), 2);

        let report = fx.manager.sweep().await;
        assert_eq!(report.discarded, 1);
        assert_eq!(report.evicted_keys, vec![broken]);
        assert_eq!(report.remaining_bytes, 30);
        assert_eq!(fx.store.keys().await.expect("keys"), vec![good_key]);

        // Nothing left to discard on the next pass.
        assert_eq!(fx.manager.sweep().await.discarded, 0);
    }

    /// Memory store whose deletes fail for selected keys.
    struct StubbornStore {
        inner: MemoryStore,
        stuck: HashSet<CacheKey>,
    }

    impl PersistentStore for StubbornStore {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), StoreError> {
            self.inner.put(key, entry).await
        }

        async fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
            if self.stuck.contains(key) {
                return Err(StoreError::Unavailable("delete refused".to_string()));
            }
            self.inner.delete(key).await
        }

        async fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
            self.inner.keys().await
        }
    }

    #[tokio::test]
    async fn failed_deletes_do_not_stop_the_sweep() {
        let hour = Duration::from_secs(3600);
        let a = entry("/a", 40, 1, hour);
        let b = entry("/b", 40, 2, hour);
        let c = entry("/c", 40, 3, hour);
        let (ka, kb, kc) = (a.key.clone(), b.key.clone(), c.key.clone());

        let store = StubbornStore {
            inner: MemoryStore::new("ns"),
            stuck: HashSet::from([ka.clone()]),
        };
        let fx = fixture(store, 50);
        insert(&fx, a).await;
        insert(&fx, b).await;
        insert(&fx, c).await;

        let report = fx.manager.sweep().await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.evicted_keys, vec![kb, kc]);
        assert_eq!(report.remaining_bytes, 40);
        assert!(fx.store.inner.contains(&ka));
    }
}

//! The fetch cycle
//!
//! `fetch` resolves in this order: an in-flight request for the key, then a
//! fresh store entry, then a new network operation. The network operation
//! runs as its own task so that it settles, writes and deregisters even if
//! every caller waiting on it goes away.

use std::sync::Arc;

use super::super::admission;
use super::super::cache_entry::CacheEntry;
use super::super::cache_key::{CacheKey, CacheKeyBuilder};
use super::super::eviction::EvictionReport;
use super::super::pending::{CompletionGuard, Outcome, Registration};
use super::super::store::PersistentStore;
use super::core::{CacheState, FetchCache};
use crate::error::{self, Result, StoreError};
use crate::http::{FetchRequest, FetchResponse, RequestOptions};
use crate::transport::Transport;

impl<S: PersistentStore, T: Transport> FetchCache<S, T> {
    /// Fetch `target`, serving from cache where possible.
    ///
    /// Every caller coalesced onto the same network operation receives the
    /// same response or the same error. Store and admission failures never
    /// surface here; they only cost a cache write.
    ///
    /// Network operations run as tokio tasks. Polled outside a tokio runtime,
    /// a call that would need the network fails with `Kind::Aborted` instead.
    ///
    /// # Errors
    ///
    /// The `TransportError` of the network operation this call waited on.
    pub async fn fetch(&self, target: &str, options: Option<RequestOptions>) -> Result<FetchResponse> {
        let state = &self.inner;
        let key = CacheKeyBuilder::build(target, options.as_ref());

        if let Some(pending) = state.registry.lookup(&key) {
            state.stats.record_coalesced();
            tracing::debug!(
                target: "fetchcache::cache",
                key = %key,
                pending_id = pending.id(),
                "Joining in-flight request"
            );
            return pending.wait().await;
        }

        let now = state.clock.now_millis();
        let replaced_bytes = match state.store.get(&key).await {
            Ok(Some(entry)) if !entry.is_stale(now) => {
                state.stats.record_hit();
                tracing::debug!(
                    target: "fetchcache::cache",
                    key = %key,
                    size_bytes = entry.size_bytes,
                    "Cache hit"
                );
                return Ok(entry.to_response());
            }
            Ok(Some(stale)) => {
                state.stats.record_stale();
                tracing::debug!(
                    target: "fetchcache::cache",
                    key = %key,
                    cached_at = stale.cached_at_millis(),
                    "Stale entry treated as miss"
                );
                stale.size_bytes
            }
            Ok(None) => {
                state.stats.record_miss();
                tracing::debug!(target: "fetchcache::cache", key = %key, "Cache miss");
                0
            }
            Err(e) => {
                state.stats.record_store_error();
                state.stats.record_miss();
                tracing::warn!(
                    target: "fetchcache::cache::store",
                    key = %key,
                    error = %e,
                    "Store read failed, treating as miss"
                );
                0
            }
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(
                    target: "fetchcache::cache",
                    key = %key,
                    "No tokio runtime available - cannot start network fetch"
                );
                return Err(error::aborted(e));
            }
        };

        let request = FetchRequest::new(target, options.unwrap_or_default());
        let registration = state.registry.join_or_register(key.clone(), || {
            let task = runtime.spawn(Arc::clone(state).run_fetch(key.clone(), request, replaced_bytes));
            async move { task.await.unwrap_or_else(|e| Err(error::aborted(e))) }
        });

        let pending = match registration {
            Registration::Registered(pending) => pending,
            Registration::Joined(pending) => {
                state.stats.record_coalesced();
                tracing::debug!(
                    target: "fetchcache::cache",
                    key = %key,
                    pending_id = pending.id(),
                    "Joining request registered concurrently"
                );
                pending
            }
        };

        pending.wait().await
    }

    /// Delete every entry in the namespace and reset the budget.
    ///
    /// Waits for a running sweep to finish. Returns the number of entries
    /// removed.
    ///
    /// # Errors
    ///
    /// The first `StoreError` hit while listing or deleting.
    pub async fn flush(&self) -> std::result::Result<usize, StoreError> {
        self.inner.eviction.purge_all().await
    }

    /// Run an eviction sweep now instead of waiting for the debounce.
    pub async fn evict_now(&self) -> EvictionReport {
        self.inner.eviction.sweep().await
    }
}

impl<S: PersistentStore, T: Transport> CacheState<S, T> {
    async fn run_fetch(self: Arc<Self>, key: CacheKey, request: FetchRequest, replaced_bytes: u64) -> Outcome {
        let _completion = CompletionGuard::new(&self.registry, &key);
        self.stats.record_network_fetch();

        let response = match self.transport.perform(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_transport_failure();
                tracing::debug!(
                    target: "fetchcache::cache",
                    key = %key,
                    error = %e,
                    "Network request failed; nothing cached"
                );
                return Err(e);
            }
        };

        if self.admit(&key, &request, &response) {
            self.persist(&key, &response, replaced_bytes).await;
        }

        Ok(response)
    }

    fn admit(&self, key: &CacheKey, request: &FetchRequest, response: &FetchResponse) -> bool {
        let body_bytes = response.body.len() as u64;
        if let Some(limit) = self.config.max_entry_bytes
            && body_bytes > limit
        {
            self.stats.record_rejected();
            tracing::debug!(
                target: "fetchcache::cache::admission",
                key = %key,
                body_bytes,
                limit,
                "Response larger than max entry size"
            );
            return false;
        }

        match admission::evaluate(self.admission.as_ref(), request, response) {
            Ok(true) => {
                self.stats.record_admitted();
                true
            }
            Ok(false) => {
                self.stats.record_rejected();
                tracing::debug!(
                    target: "fetchcache::cache::admission",
                    key = %key,
                    status = response.status.as_u16(),
                    "Admission policy declined response"
                );
                false
            }
            Err(e) => {
                self.stats.record_admission_error();
                tracing::warn!(
                    target: "fetchcache::cache::admission",
                    key = %key,
                    error = %e,
                    "Admission policy failed; response not cached"
                );
                false
            }
        }
    }

    async fn persist(&self, key: &CacheKey, response: &FetchResponse, replaced_bytes: u64) {
        let entry = CacheEntry::from_response(
            key.clone(),
            response,
            self.clock.now_millis(),
            self.config.default_max_age(),
        );
        let size_bytes = entry.size_bytes;

        if let Err(e) = self.store.put(key, entry).await {
            self.stats.record_store_error();
            tracing::warn!(
                target: "fetchcache::cache::store",
                key = %key,
                error = %e,
                "Store write failed; response served uncached"
            );
            return;
        }

        let total = self.budget.replace(replaced_bytes, size_bytes);
        self.scheduler.schedule();

        tracing::debug!(
            target: "fetchcache::cache",
            key = %key,
            size_bytes,
            budget_bytes = total,
            ceiling_bytes = self.config.size_ceiling_bytes,
            "Cached response"
        );
    }
}

//! Registry of in-flight requests
//!
//! At most one `PendingRequest` exists per `CacheKey`. Callers arriving while
//! it is registered attach to it and observe its single outcome instead of
//! issuing their own network call.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use super::cache_key::CacheKey;
use crate::error::{RegistryError, Result};
use crate::http::FetchResponse;

/// Settled result of one in-flight operation, identical for every waiter.
pub type Outcome = Result<FetchResponse>;

type SharedOutcome = Shared<BoxFuture<'static, Outcome>>;

/// One shared in-flight operation.
///
/// Clones refer to the same operation; `wait` can be called from any number
/// of callers and each receives its own copy of the outcome.
#[derive(Clone)]
pub struct PendingRequest {
    id: u64,
    key: CacheKey,
    outcome: SharedOutcome,
}

impl PendingRequest {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Whether `other` is a handle to the same operation.
    pub fn same_operation(&self, other: &PendingRequest) -> bool {
        self.id == other.id
    }

    /// Wait for the operation to settle.
    pub async fn wait(&self) -> Outcome {
        self.outcome.clone().await
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("settled", &self.outcome.peek().is_some())
            .finish()
    }
}

/// Result of `join_or_register`.
#[derive(Debug)]
pub enum Registration {
    /// Another caller's operation was already in flight
    Joined(PendingRequest),
    /// The supplied operation became the in-flight one
    Registered(PendingRequest),
}

impl Registration {
    pub fn into_pending(self) -> PendingRequest {
        match self {
            Registration::Joined(pending) | Registration::Registered(pending) => pending,
        }
    }
}

#[derive(Debug, Default)]
pub struct PendingRequestRegistry {
    pending: DashMap<CacheKey, PendingRequest>,
    next_id: AtomicU64,
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<PendingRequest> {
        self.pending.get(key).map(|entry| entry.value().clone())
    }

    /// Register `operation` as the in-flight request for `key`.
    ///
    /// # Errors
    ///
    /// `RegistryError::DuplicateRegistration` if `key` already has one;
    /// callers are expected to `lookup` first.
    pub fn register<F>(&self, key: CacheKey, operation: F) -> std::result::Result<PendingRequest, RegistryError>
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        match self.pending.entry(key) {
            Entry::Occupied(occupied) => Err(RegistryError::DuplicateRegistration(
                occupied.key().clone(),
            )),
            Entry::Vacant(vacant) => {
                let pending = self.pending_for(vacant.key().clone(), operation);
                vacant.insert(pending.clone());
                Ok(pending)
            }
        }
    }

    /// Attach to the in-flight request for `key`, or register the one built
    /// by `make_operation` if there is none.
    ///
    /// The check and the insert happen under the same shard lock, so two
    /// callers racing here never both register. `make_operation` only runs
    /// when registering.
    pub fn join_or_register<F, M>(&self, key: CacheKey, make_operation: M) -> Registration
    where
        M: FnOnce() -> F,
        F: Future<Output = Outcome> + Send + 'static,
    {
        match self.pending.entry(key) {
            Entry::Occupied(occupied) => Registration::Joined(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                let pending = self.pending_for(vacant.key().clone(), make_operation());
                vacant.insert(pending.clone());
                Registration::Registered(pending)
            }
        }
    }

    /// Remove the in-flight request for `key`, if any. Idempotent.
    pub fn complete(&self, key: &CacheKey) {
        self.pending.remove(key);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn pending_for<F>(&self, key: CacheKey, operation: F) -> PendingRequest
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        PendingRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            key,
            outcome: operation.boxed().shared(),
        }
    }
}

/// Calls `complete` for its key when dropped, including during unwinding.
pub(crate) struct CompletionGuard<'a> {
    registry: &'a PendingRequestRegistry,
    key: &'a CacheKey,
}

impl<'a> CompletionGuard<'a> {
    pub(crate) fn new(registry: &'a PendingRequestRegistry, key: &'a CacheKey) -> Self {
        Self { registry, key }
    }
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.registry.complete(self.key);
    }
}

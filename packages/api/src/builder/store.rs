//! Store selection for the builder

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use fetchcache_client::{DiskStore, MemoryStore, PersistentStore, StoreError};

use super::core::FetchCacheBuilder;

/// A store choice that can be opened for a namespace.
pub trait StoreSpec: Send {
    type Store: PersistentStore;

    /// Whether entries may already exist when the cache is built, in which
    /// case the budget is reconciled with a sweep before first use.
    const MAY_HOLD_ENTRIES: bool;

    fn open(self, store_name: &str) -> impl Future<Output = Result<Arc<Self::Store>, StoreError>> + Send;
}

/// Process-local store named after the configured namespace
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemory;

/// Directory store under `root`
#[derive(Debug, Clone)]
pub struct OnDisk {
    pub root: PathBuf,
}

/// Caller-supplied store, used as-is
#[derive(Debug)]
pub struct Provided<S>(pub Arc<S>);

impl StoreSpec for InMemory {
    type Store = MemoryStore;
    const MAY_HOLD_ENTRIES: bool = false;

    async fn open(self, store_name: &str) -> Result<Arc<MemoryStore>, StoreError> {
        Ok(Arc::new(MemoryStore::new(store_name)))
    }
}

impl StoreSpec for OnDisk {
    type Store = DiskStore;
    const MAY_HOLD_ENTRIES: bool = true;

    async fn open(self, store_name: &str) -> Result<Arc<DiskStore>, StoreError> {
        DiskStore::open(self.root, store_name).await.map(Arc::new)
    }
}

impl<S: PersistentStore> StoreSpec for Provided<S> {
    type Store = S;
    const MAY_HOLD_ENTRIES: bool = true;

    async fn open(self, store_name: &str) -> Result<Arc<S>, StoreError> {
        if self.0.name() != store_name {
            tracing::debug!(
                target: "fetchcache::builder",
                configured = store_name,
                provided = self.0.name(),
                "Provided store namespace differs from configured store name"
            );
        }
        Ok(self.0)
    }
}

impl<St, T> FetchCacheBuilder<St, T> {
    /// Keep entries in process memory
    #[must_use]
    pub fn memory_store(self) -> FetchCacheBuilder<InMemory, T> {
        self.with_store(InMemory)
    }

    /// Persist entries as files under `<root>/<store name>/`
    #[must_use]
    pub fn disk_store(self, root: impl Into<PathBuf>) -> FetchCacheBuilder<OnDisk, T> {
        self.with_store(OnDisk { root: root.into() })
    }

    /// Use `store` as the namespace
    #[must_use]
    pub fn store<S: PersistentStore>(self, store: S) -> FetchCacheBuilder<Provided<S>, T> {
        self.with_store(Provided(Arc::new(store)))
    }

    /// Use a store the caller keeps a handle to
    #[must_use]
    pub fn shared_store<S: PersistentStore>(self, store: Arc<S>) -> FetchCacheBuilder<Provided<S>, T> {
        self.with_store(Provided(store))
    }
}

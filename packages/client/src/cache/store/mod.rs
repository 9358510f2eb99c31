//! Persistent key/value stores
//!
//! The cache core never implements storage itself; it consumes the four
//! operations of `PersistentStore`. Each store instance is one namespace.
//! Stores need not be atomic across processes: the orchestrator treats any
//! inconsistency it observes as a miss.

pub mod disk;
pub mod memory;

use std::future::Future;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use super::cache_entry::CacheEntry;
use super::cache_key::CacheKey;
use crate::error::StoreError;

pub trait PersistentStore: Send + Sync + 'static {
    /// Namespace this store reads and writes.
    fn name(&self) -> &str;

    /// Entry for `key`, or `None` if there is none.
    fn get(&self, key: &CacheKey) -> impl Future<Output = Result<Option<CacheEntry>, StoreError>> + Send;

    /// Insert or replace the entry for `key`.
    fn put(&self, key: &CacheKey, entry: CacheEntry) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove the entry for `key`. Removing a missing key succeeds.
    fn delete(&self, key: &CacheKey) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Every key currently stored, in no particular order.
    fn keys(&self) -> impl Future<Output = Result<Vec<CacheKey>, StoreError>> + Send;
}

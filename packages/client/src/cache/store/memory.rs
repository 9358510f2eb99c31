//! In-memory store namespace

use dashmap::DashMap;

use super::PersistentStore;
use crate::cache::{CacheEntry, CacheKey};
use crate::error::StoreError;

/// Process-local store backed by a concurrent map.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    entries: DashMap<CacheKey, CacheEntry>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Sum of recorded entry sizes.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|entry| entry.value().size_bytes).sum()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(crate::config::ConfigDefaults::DEFAULT_STORE_NAME)
    }
}

impl PersistentStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), StoreError> {
        self.entries.insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<CacheKey>, StoreError> {
        Ok(self.entries.iter().map(|entry| entry.key().clone()).collect())
    }
}

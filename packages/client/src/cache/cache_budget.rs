//! Running total of cached body bytes

use std::sync::atomic::{AtomicU64, Ordering};

/// Sum of `size_bytes` over live entries.
///
/// Every mutation is a single atomic read-modify-write; subtraction saturates
/// at zero so a double-counted delete can never drive the total negative.
/// Eviction sweeps reconcile the total against the store with `set`.
#[derive(Debug, Default)]
pub struct CacheBudget {
    bytes: AtomicU64,
}

impl CacheBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    /// Add `bytes`, returning the new total.
    pub fn add(&self, bytes: u64) -> u64 {
        let previous = self
            .bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(bytes))
            })
            .unwrap_or_default();
        previous.saturating_add(bytes)
    }

    /// Subtract `bytes`, saturating at zero, returning the new total.
    pub fn sub(&self, bytes: u64) -> u64 {
        let previous = self
            .bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(bytes))
            })
            .unwrap_or_default();
        previous.saturating_sub(bytes)
    }

    /// Account for an entry of `old` bytes being replaced by one of `new` bytes.
    pub fn replace(&self, old: u64, new: u64) -> u64 {
        let previous = self
            .bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(old).saturating_add(new))
            })
            .unwrap_or_default();
        previous.saturating_sub(old).saturating_add(new)
    }

    pub fn set(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::Release);
    }

    pub fn reset(&self) {
        self.set(0);
    }
}

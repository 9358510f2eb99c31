//! Debounced sweep scheduling
//!
//! One deadline slot per cache. The first `schedule` after a sweep sets the
//! deadline to `now + interval`; later calls reuse it until it fires, so a
//! burst of writes collapses into one sweep and a steady stream of writes
//! still gets swept once per interval. A single background task waits for
//! the deadline and runs the sweep; there is never more than one timer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::EvictionManager;
use crate::cache::store::PersistentStore;

#[derive(Debug)]
pub struct EvictionScheduler {
    interval: Duration,
    deadline: Mutex<Option<Instant>>,
    changed: Notify,
}

impl EvictionScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: Mutex::new(None),
            changed: Notify::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Request a sweep one interval from now, unless one is already due.
    pub fn schedule(&self) {
        let mut slot = self.slot();
        if slot.is_none() {
            *slot = Some(Instant::now() + self.interval);
            drop(slot);
            self.changed.notify_one();
        }
    }

    /// Whether a sweep is waiting for its deadline.
    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    /// Resolve once the pending deadline passes, clearing the slot.
    pub async fn next_due(&self) {
        loop {
            let deadline = *self.slot();
            match deadline {
                None => self.changed.notified().await,
                Some(deadline) => {
                    tokio::select! {
                        () = tokio::time::sleep_until(deadline) => {
                            let mut slot = self.slot();
                            if slot.is_some_and(|current| current <= Instant::now()) {
                                *slot = None;
                                return;
                            }
                        }
                        () = self.changed.notified() => {}
                    }
                }
            }
        }
    }

    /// Start the background task that runs `manager` sweeps as they fall due.
    ///
    /// Returns `None` outside a tokio runtime; scheduled sweeps then never
    /// run and eviction only happens through explicit sweeps.
    pub fn spawn<S: PersistentStore>(
        scheduler: Arc<Self>,
        manager: Arc<EvictionManager<S>>,
    ) -> Option<JoinHandle<()>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                target: "fetchcache::cache::eviction",
                "No tokio runtime available - debounced eviction disabled"
            );
            return None;
        };

        Some(handle.spawn(async move {
            loop {
                scheduler.next_due().await;
                tracing::debug!(
                    target: "fetchcache::cache::eviction",
                    "Debounce interval elapsed, sweeping"
                );
                manager.sweep().await;
            }
        }))
    }

    fn slot(&self) -> MutexGuard<'_, Option<Instant>> {
        self.deadline.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn later_schedules_reuse_the_pending_deadline() {
        let scheduler = Arc::new(EvictionScheduler::new(Duration::from_millis(1_000)));
        let start = Instant::now();

        scheduler.schedule();
        let waiter = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                scheduler.next_due().await;
                Instant::now()
            })
        };

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(scheduler.is_pending());
        scheduler.schedule();

        let waited = waiter.await.expect("waiter") - start;
        assert!(waited >= Duration::from_millis(1_000), "fired after {waited:?}");
        assert!(waited < Duration::from_millis(1_100), "fired after {waited:?}");
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn a_schedule_after_firing_starts_a_new_interval() {
        let scheduler = Arc::new(EvictionScheduler::new(Duration::from_millis(200)));

        scheduler.schedule();
        scheduler.next_due().await;
        assert!(!scheduler.is_pending());

        let start = Instant::now();
        scheduler.schedule();
        assert!(scheduler.is_pending());
        scheduler.next_due().await;
        assert!(Instant::now() - start >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_until_scheduled() {
        let scheduler = Arc::new(EvictionScheduler::new(Duration::from_millis(250)));
        let waiter = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.next_due().await })
        };

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!waiter.is_finished());

        scheduler.schedule();
        tokio::time::timeout(Duration::from_millis(300), waiter)
            .await
            .expect("sweep falls due")
            .expect("waiter");
    }

    #[test]
    fn spawn_without_runtime_is_a_no_op() {
        let scheduler = Arc::new(EvictionScheduler::new(Duration::from_millis(10)));
        let store = Arc::new(crate::cache::store::MemoryStore::new("ns"));
        let manager = Arc::new(EvictionManager::new(
            store,
            Arc::new(crate::cache::CacheBudget::new()),
            Arc::new(crate::cache::CacheStats::new()),
            Arc::new(crate::cache::SystemClock),
            1,
        ));

        assert!(EvictionScheduler::spawn(scheduler, manager).is_none());
    }
}

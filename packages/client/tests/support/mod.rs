#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use fetchcache_client::cache::clock::ManualClock;
use fetchcache_client::prelude::*;
use tokio::sync::Semaphore;

pub const START_MILLIS: u64 = 1_700_000_000_000;

type Responder = dyn Fn(&FetchRequest, usize) -> Result<FetchResponse> + Send + Sync;

/// Transport double: counts calls and optionally holds each one until the
/// test releases it.
pub struct FakeTransport {
    calls: AtomicUsize,
    gate: Option<Semaphore>,
    responder: Box<Responder>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&FetchRequest, usize) -> Result<FetchResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: None,
            responder: Box::new(responder),
        })
    }

    /// Calls block until `release` hands out a permit.
    pub fn gated<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&FetchRequest, usize) -> Result<FetchResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Some(Semaphore::new(0)),
            responder: Box::new(responder),
        })
    }

    /// 200 with the request path as body.
    pub fn echo() -> Arc<Self> {
        Self::new(|request, _| Ok(ok(request.path())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }
}

impl Transport for FakeTransport {
    async fn perform(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
        (self.responder)(request, call)
    }
}

pub fn ok(body: impl Into<bytes::Bytes>) -> FetchResponse {
    FetchResponse::new(StatusCode::OK, HeaderMap::new(), body)
}

pub fn ok_with_max_age(body: impl Into<bytes::Bytes>, max_age_secs: u64) -> FetchResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::CACHE_CONTROL,
        HeaderValue::from_str(&format!("max-age={max_age_secs}")).expect("valid header"),
    );
    FetchResponse::new(StatusCode::OK, headers, body)
}

/// Memory store with switchable failures.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_get: AtomicBool,
    pub fail_put: AtomicBool,
}

impl PersistentStore for FlakyStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &CacheKey) -> std::result::Result<Option<CacheEntry>, StoreError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("get disabled".to_string()));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &CacheKey, entry: CacheEntry) -> std::result::Result<(), StoreError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("put disabled".to_string()));
        }
        self.inner.put(key, entry).await
    }

    async fn delete(&self, key: &CacheKey) -> std::result::Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> std::result::Result<Vec<CacheKey>, StoreError> {
        self.inner.keys().await
    }
}

pub struct Harness<S: PersistentStore> {
    pub cache: Arc<FetchCache<S, Arc<FakeTransport>>>,
    pub store: Arc<S>,
    pub transport: Arc<FakeTransport>,
    pub clock: Arc<ManualClock>,
}

pub fn harness_with<S: PersistentStore>(
    config: CacheConfig,
    store: S,
    transport: Arc<FakeTransport>,
    admission: Arc<dyn AdmissionPolicy>,
) -> Harness<S> {
    let store = Arc::new(store);
    let clock = Arc::new(ManualClock::new(START_MILLIS));
    let cache = FetchCache::with_parts(
        config,
        Arc::clone(&store),
        Arc::clone(&transport),
        admission,
        clock.clone(),
    );
    Harness {
        cache: Arc::new(cache),
        store,
        transport,
        clock,
    }
}

pub fn harness(transport: Arc<FakeTransport>) -> Harness<MemoryStore> {
    harness_with(
        CacheConfig::default(),
        MemoryStore::new("bvFetchCache"),
        transport,
        Arc::new(AdmitAll),
    )
}

/// Poll `condition` until it holds, failing the test after `limit`.
pub async fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

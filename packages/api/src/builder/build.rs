//! Assembling the cache

use fetchcache_client::{
    CacheConfig, ConfigurationError, FetchCache, StoreError, Validator,
};

use super::core::FetchCacheBuilder;
use super::store::StoreSpec;
use super::transport::TransportSpec;

/// Why a cache could not be built
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigurationError),

    #[error("store could not be opened: {0}")]
    Store(#[from] StoreError),
}

impl<St: StoreSpec, T: TransportSpec> FetchCacheBuilder<St, T> {
    /// Validate the configuration, open the store and start the cache.
    ///
    /// Must run inside a tokio runtime so the debounced sweeper can start.
    /// Stores that may already hold entries are swept once so the size
    /// budget reflects them.
    ///
    /// # Errors
    ///
    /// `BuildError::Config` for invalid cache or transport settings,
    /// `BuildError::Store` when the store cannot be opened.
    pub async fn build(self) -> Result<FetchCache<St::Store, T::Transport>, BuildError> {
        let FetchCacheBuilder {
            config,
            store,
            transport,
            admission,
            clock,
        } = self;

        config.validate()?;
        let transport = transport.into_transport()?;
        let store = store.open(&config.store_name).await?;

        let reconcile = St::MAY_HOLD_ENTRIES;
        let cache = FetchCache::with_parts(config, store, transport, admission, clock);

        if reconcile {
            let report = cache.evict_now().await;
            tracing::debug!(
                target: "fetchcache::builder",
                existing_entries = report.scanned,
                budget_bytes = report.remaining_bytes,
                "Reconciled budget with existing store contents"
            );
        }

        Ok(cache)
    }

    /// Current configuration
    pub fn current_config(&self) -> &CacheConfig {
        &self.config
    }
}

//! Transport selection for the builder

use fetchcache_client::{ConfigurationError, HyperTransport, Transport, TransportConfig};

use super::core::FetchCacheBuilder;

/// A transport choice that can be turned into a `Transport`.
pub trait TransportSpec {
    type Transport: Transport;

    /// # Errors
    ///
    /// `ConfigurationError` when the transport settings are invalid.
    fn into_transport(self) -> Result<Self::Transport, ConfigurationError>;
}

/// No transport chosen yet; `build` is unavailable in this state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransport;

/// Bundled plain-HTTP transport, built from its settings at `build` time
#[derive(Debug, Clone)]
pub struct Hyper(pub TransportConfig);

/// Caller-supplied transport
#[derive(Debug, Clone)]
pub struct Custom<T>(pub T);

impl TransportSpec for Hyper {
    type Transport = HyperTransport;

    fn into_transport(self) -> Result<HyperTransport, ConfigurationError> {
        HyperTransport::new(&self.0)
    }
}

impl<T: Transport> TransportSpec for Custom<T> {
    type Transport = T;

    fn into_transport(self) -> Result<T, ConfigurationError> {
        Ok(self.0)
    }
}

impl<St, T> FetchCacheBuilder<St, T> {
    /// Send network requests through `transport`
    #[must_use]
    pub fn transport<T2: Transport>(self, transport: T2) -> FetchCacheBuilder<St, Custom<T2>> {
        self.with_transport(Custom(transport))
    }

    /// Send network requests through the bundled hyper transport
    #[must_use]
    pub fn hyper_transport(self, config: TransportConfig) -> FetchCacheBuilder<St, Hyper> {
        self.with_transport(Hyper(config))
    }
}

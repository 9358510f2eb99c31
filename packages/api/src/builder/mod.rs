//! Fluent `FetchCache` builder
//!
//! The builder tracks which store and which transport have been chosen in
//! its type parameters, so `build` only exists once a transport is set.

pub mod build;
pub mod core;
pub mod store;
pub mod transport;

pub use self::core::FetchCacheBuilder;
pub use build::BuildError;
pub use store::{InMemory, OnDisk, Provided, StoreSpec};
pub use transport::{Custom, Hyper, NoTransport, TransportSpec};

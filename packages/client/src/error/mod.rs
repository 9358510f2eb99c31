pub mod cache;
pub mod classification;
pub mod constructors;
pub mod helpers;
pub mod types;

pub use cache::{AdmissionError, RegistryError, StoreError};
pub use constructors::*;
pub use helpers::{BadScheme, TimedOut};
pub use types::{Error, Kind, Result};

/// The error surfaced by a failed network operation.
pub type TransportError = Error;

//! Error types for the dispatch and pricing engine.
//!
//! [`Error`] is what crosses the crate boundary. [`StoreError`] describes a
//! single failed collaborator call; the dispatch hot path absorbs it and
//! degrades to reduced supply instead of surfacing it.

use thiserror::Error;

/// Errors returned to callers of the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Every radius tier was searched and no worker could be claimed.
    #[error("no available worker within {max_radius_km} km")]
    NoSupply { max_radius_km: f64 },
    /// Malformed engine configuration. Raised at construction, never per request.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// Malformed request input, rejected before any store call.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A collaborator call failed outside the dispatch hot path (fleet operations).
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}

/// Failure of one call to the geo index, availability store or surge cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out")]
    Timeout,
}

impl From<tokio::time::error::Elapsed> for StoreError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        StoreError::Timeout
    }
}

/// Bounds a collaborator call by `limit`, folding an elapsed deadline into [`StoreError::Timeout`].
pub(crate) async fn bounded<T, F>(limit: std::time::Duration, call: F) -> Result<T, StoreError>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call).await?
}

//! Fetch capability: data source interfaces and adapters.
//!
//! A [`MarketDataSource`] turns an artifact's parameters into a tabular
//! result. Implementations perform no retries; the download coordinator is
//! the sole retry authority and relies on the [`FetchError`] classification
//! to decide what is worth retrying.

use async_trait::async_trait;

use crate::{Artifact, Table};

pub mod polygon;

/// Fetch errors, classified for the coordinator's retry policy.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Recoverable failure: network error, 5xx response, rate limit.
    /// Retried by the coordinator up to its policy limit.
    #[error("transient error: {0}")]
    Transient(String),

    /// Non-recoverable failure: malformed request, auth failure, any 4xx
    /// other than rate limiting. Never retried.
    #[error("permanent error: {0}")]
    Permanent(String),

    /// The request exceeded its deadline. Retried like a transient error.
    #[error("timeout: {0}")]
    Timeout(String),
}

impl FetchError {
    /// Whether the coordinator may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient(_) | FetchError::Timeout(_))
    }
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Fetch capability consumed by the download coordinator.
///
/// Concrete providers and test doubles implement this single narrow
/// contract; the coordinator depends on nothing else about the source.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch the rows for one artifact.
    ///
    /// Must not retry internally; classify failures via [`FetchError`]
    /// instead so retry policy stays centralized in the coordinator.
    async fn fetch(&self, artifact: &Artifact) -> FetchResult<Table>;
}

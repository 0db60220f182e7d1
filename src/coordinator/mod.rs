//! Download orchestration.
//!
//! The coordinator turns declarative download requests into a bounded set
//! of concurrently executing, retried, progress-tracked fetch-and-store
//! pipelines:
//!
//! 1. **Planning**: requests expand into [`crate::Artifact`]s via the
//!    partitioner and deduplicate by identity ([`plan`])
//! 2. **Execution**: a sliding window of at most `max_concurrent`
//!    pipelines runs fetch → store per artifact ([`executor`])
//! 3. **Retry**: transient fetch failures back off and retry under a
//!    centralized policy ([`retry`])
//! 4. **Progress**: every state transition lands in a shared tracker
//!    ([`progress`])
//!
//! One artifact's failure never aborts its siblings; the caller receives a
//! [`executor::DownloadSummary`] covering every artifact and decides
//! whether the run as a whole counts as a failure.

use crate::source::FetchError;
use crate::storage::StorageError;

pub mod executor;
pub mod plan;
pub mod progress;
pub mod retry;

pub use executor::{DownloadCoordinator, DownloadFailure, DownloadSummary};
pub use plan::DownloadRequest;
pub use progress::{ArtifactState, ProgressSnapshot, ProgressTracker};
pub use retry::RetryPolicy;

/// Terminal error for a single artifact's pipeline.
///
/// These never abort the batch; they are recorded per artifact in the
/// summary.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Fetch failed (after retries for the retryable classes)
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Storage write failed; not retried
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The pipeline was interrupted by shutdown before completing
    #[error("cancelled: {0}")]
    Cancelled(String),
}

/// Error classification surfaced in the summary, sufficient for a caller
/// to render a report without inspecting internal error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Retries exhausted on a transient provider failure
    Transient,
    /// Permanent provider rejection, aborted without retry
    Permanent,
    /// Retries exhausted on timeouts
    Timeout,
    /// Local storage failure
    Storage,
    /// Interrupted by shutdown
    Cancelled,
}

impl From<&DownloadError> for ErrorKind {
    fn from(error: &DownloadError) -> Self {
        match error {
            DownloadError::Fetch(FetchError::Transient(_)) => ErrorKind::Transient,
            DownloadError::Fetch(FetchError::Permanent(_)) => ErrorKind::Permanent,
            DownloadError::Fetch(FetchError::Timeout(_)) => ErrorKind::Timeout,
            DownloadError::Storage(_) => ErrorKind::Storage,
            DownloadError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }
}

/// Configuration-level failures that fail the whole `run` call before any
/// artifact is dispatched. Per-artifact failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// `max_concurrent` was zero
    #[error("max_concurrent must be at least 1")]
    InvalidConcurrency,

    /// A request is malformed (empty symbol list, missing frequencies for
    /// aggregates, ...)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

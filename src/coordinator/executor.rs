//! Download coordinator: bounded concurrent execution of fetch/store
//! pipelines with centralized retry and fault isolation.

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::plan::{expand_requests, DownloadRequest};
use super::progress::ProgressTracker;
use super::retry::RetryPolicy;
use super::{CoordinatorError, DownloadError, ErrorKind};
use crate::shutdown::SharedShutdown;
use crate::source::MarketDataSource;
use crate::storage::Storage;
use crate::{Artifact, Table};

/// One terminal per-artifact failure, as surfaced in the summary.
#[derive(Debug, Serialize)]
pub struct DownloadFailure {
    /// Artifact identity key
    pub artifact: String,
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable error detail
    pub message: String,
}

/// Final outcome of a coordinator run, covering every artifact.
///
/// Skip is not an error and failure is not a batch failure; callers use
/// [`DownloadSummary::is_success`] to decide the process exit code.
#[derive(Debug, Default, Serialize)]
pub struct DownloadSummary {
    /// Unique artifacts dispatched
    pub total: usize,
    /// Artifacts fetched and persisted
    pub completed: usize,
    /// Artifacts that failed terminally
    pub failed: usize,
    /// Artifacts skipped because already present on disk
    pub skipped: usize,
    /// Per-artifact failures in completion order
    pub errors: Vec<DownloadFailure>,
}

impl DownloadSummary {
    /// Whether the run finished without any artifact failure.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Per-pipeline terminal outcome, collected in completion order.
enum Outcome {
    Completed,
    Skipped,
    Failed(DownloadError),
}

/// Orchestrates a batch download: expansion, deduplication, bounded
/// concurrent dispatch, retry, progress, and summary aggregation.
pub struct DownloadCoordinator<S, T> {
    source: Arc<S>,
    storage: Arc<T>,
    progress: Arc<ProgressTracker>,
    retry: RetryPolicy,
    base_path: PathBuf,
    shutdown: Option<SharedShutdown>,
}

impl<S, T> DownloadCoordinator<S, T>
where
    S: MarketDataSource + 'static,
    T: Storage + 'static,
{
    /// Create a coordinator over the given capabilities.
    pub fn new(source: Arc<S>, storage: Arc<T>) -> Self {
        Self {
            source,
            storage,
            progress: Arc::new(ProgressTracker::new()),
            retry: RetryPolicy::default(),
            base_path: PathBuf::from("data"),
            shutdown: None,
        }
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the storage base path stamped onto planned artifacts.
    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Shared progress tracker, for live display while `run` is in flight.
    pub fn progress(&self) -> Arc<ProgressTracker> {
        self.progress.clone()
    }

    /// Execute the whole batch and return a summary covering every
    /// artifact.
    ///
    /// Fails fast only on configuration problems; per-artifact failures
    /// are accumulated, never raised. Returns once every dispatched
    /// artifact has reached a terminal state.
    pub async fn run(
        &self,
        requests: &[DownloadRequest],
        max_concurrent: usize,
    ) -> Result<DownloadSummary, CoordinatorError> {
        if max_concurrent == 0 {
            return Err(CoordinatorError::InvalidConcurrency);
        }

        let artifacts = expand_requests(requests, &self.base_path)?;
        info!(
            artifacts = artifacts.len(),
            max_concurrent, "starting download batch"
        );

        self.progress.set_total(artifacts.len());
        for artifact in &artifacts {
            self.progress.register(artifact);
        }

        // Sliding-window admission: a completed slot immediately admits
        // the next queued artifact.
        let outcomes: Vec<(Artifact, Outcome)> = stream::iter(artifacts)
            .map(|artifact| async move {
                let outcome = self.process(&artifact).await;
                (artifact, outcome)
            })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

        let mut summary = DownloadSummary {
            total: outcomes.len(),
            ..DownloadSummary::default()
        };
        for (artifact, outcome) in outcomes {
            match outcome {
                Outcome::Completed => summary.completed += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed(error) => {
                    summary.failed += 1;
                    summary.errors.push(DownloadFailure {
                        artifact: artifact.key(),
                        kind: ErrorKind::from(&error),
                        message: error.to_string(),
                    });
                }
            }
        }

        info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            "download batch finished"
        );
        Ok(summary)
    }

    /// One artifact's pipeline: exists check, fetch with retry, store.
    ///
    /// Strictly sequential within the artifact; never panics the batch —
    /// every failure is folded into the returned outcome.
    async fn process(&self, artifact: &Artifact) -> Outcome {
        if self.shutdown_requested() {
            let error = DownloadError::Cancelled("shutdown before start".to_string());
            self.progress.mark_failed(artifact, error.to_string());
            return Outcome::Failed(error);
        }

        self.progress.mark_started(artifact);

        if self.storage.exists(artifact) {
            debug!(artifact = %artifact.key(), "already present, skipping");
            self.progress.mark_skipped(artifact);
            return Outcome::Skipped;
        }

        let table = match self.fetch_with_retry(artifact).await {
            Ok(table) => table,
            Err(error) => {
                warn!(artifact = %artifact.key(), error = %error, "artifact failed");
                self.progress.mark_failed(artifact, error.to_string());
                return Outcome::Failed(error);
            }
        };

        // A cancelled pipeline must not persist data fetched mid-shutdown.
        if self.shutdown_requested() {
            let error = DownloadError::Cancelled("shutdown before save".to_string());
            self.progress.mark_failed(artifact, error.to_string());
            return Outcome::Failed(error);
        }

        if let Err(error) = self.storage.save(artifact, &table).await {
            let error = DownloadError::Storage(error);
            warn!(artifact = %artifact.key(), error = %error, "store failed");
            self.progress.mark_failed(artifact, error.to_string());
            return Outcome::Failed(error);
        }

        debug!(artifact = %artifact.key(), rows = table.len(), "artifact completed");
        self.progress.mark_completed(artifact);
        Outcome::Completed
    }

    /// Fetch under the retry policy.
    ///
    /// At most `max_retries` attempts with `max_retries - 1` backoff
    /// sleeps between them. Only transient and timeout errors are
    /// retried; a permanent error aborts immediately without consuming
    /// further attempts.
    async fn fetch_with_retry(&self, artifact: &Artifact) -> Result<Table, DownloadError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            if self.shutdown_requested() {
                return Err(DownloadError::Cancelled("shutdown during fetch".to_string()));
            }

            match self.source.fetch(artifact).await {
                Ok(table) => return Ok(table),
                Err(error) if error.is_retryable() && attempt < self.retry.max_retries => {
                    let backoff = self.retry.backoff(attempt);
                    warn!(
                        artifact = %artifact.key(),
                        attempt,
                        max_retries = self.retry.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "retrying after backoff"
                    );
                    if !self.sleep_or_shutdown(backoff).await {
                        return Err(DownloadError::Cancelled(
                            "shutdown during backoff".to_string(),
                        ));
                    }
                }
                Err(error) => return Err(DownloadError::Fetch(error)),
            }
        }
    }

    /// Sleep for the backoff, waking early on shutdown. Returns false if
    /// shutdown was requested.
    async fn sleep_or_shutdown(&self, backoff: std::time::Duration) -> bool {
        match &self.shutdown {
            Some(shutdown) => {
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => true,
                    _ = shutdown.wait_for_shutdown() => false,
                }
            }
            None => {
                tokio::time::sleep(backoff).await;
                true
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }
}

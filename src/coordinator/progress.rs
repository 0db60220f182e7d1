//! Per-artifact progress tracking.
//!
//! The tracker owns every [`ProgressEntry`]; worker pipelines only submit
//! state transitions through the synchronized accessors and never touch
//! the internal map. Aggregate counts are derived under a single lock
//! hold, so snapshots are consistent rather than incrementally raced.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::Artifact;

/// Lifecycle state of one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactState {
    /// Registered, not yet admitted to the worker window
    Pending,
    /// Pipeline in flight (exists check, fetch or store)
    Running,
    /// Fetched and persisted
    Completed,
    /// Terminal failure (retries exhausted, permanent error, storage
    /// error, or cancelled)
    Failed,
    /// Already materialized on disk; no fetch performed
    Skipped,
}

/// Tracked state for one artifact.
#[derive(Debug, Clone)]
pub struct ProgressEntry {
    /// Artifact identity key
    pub key: String,
    /// Current state
    pub state: ArtifactState,
    /// Error detail, set when `state` is [`ArtifactState::Failed`]
    pub error: Option<String>,
}

/// Point-in-time aggregate counts for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Total artifacts registered for the run
    pub total: usize,
    /// Artifacts not yet admitted
    pub pending: usize,
    /// Artifacts currently in flight
    pub running: usize,
    /// Artifacts fetched and persisted
    pub completed: usize,
    /// Artifacts terminally failed
    pub failed: usize,
    /// Artifacts skipped as already present
    pub skipped: usize,
}

impl ProgressSnapshot {
    /// Number of artifacts in a terminal state.
    pub fn done(&self) -> usize {
        self.completed + self.failed + self.skipped
    }
}

/// Thread-safe record of per-artifact download state.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    total: usize,
    entries: HashMap<String, ProgressEntry>,
}

impl ProgressTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expected total for the run.
    pub fn set_total(&self, total: usize) {
        self.lock().total = total;
    }

    /// Register an artifact as pending. Idempotent per key.
    pub fn register(&self, artifact: &Artifact) {
        let key = artifact.key();
        self.lock().entries.entry(key.clone()).or_insert(ProgressEntry {
            key,
            state: ArtifactState::Pending,
            error: None,
        });
    }

    /// Mark an artifact's pipeline as running.
    pub fn mark_started(&self, artifact: &Artifact) {
        self.transition(artifact, ArtifactState::Running, None);
    }

    /// Mark an artifact completed.
    pub fn mark_completed(&self, artifact: &Artifact) {
        self.transition(artifact, ArtifactState::Completed, None);
    }

    /// Mark an artifact skipped (already on disk).
    pub fn mark_skipped(&self, artifact: &Artifact) {
        self.transition(artifact, ArtifactState::Skipped, None);
    }

    /// Mark an artifact terminally failed with the error detail.
    pub fn mark_failed(&self, artifact: &Artifact, error: impl Into<String>) {
        self.transition(artifact, ArtifactState::Failed, Some(error.into()));
    }

    /// Current state of one artifact, if registered.
    pub fn state_of(&self, artifact: &Artifact) -> Option<ArtifactState> {
        self.lock().entries.get(&artifact.key()).map(|e| e.state)
    }

    /// Consistent snapshot of aggregate counts.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let inner = self.lock();
        let mut snapshot = ProgressSnapshot {
            total: inner.total,
            ..ProgressSnapshot::default()
        };
        for entry in inner.entries.values() {
            match entry.state {
                ArtifactState::Pending => snapshot.pending += 1,
                ArtifactState::Running => snapshot.running += 1,
                ArtifactState::Completed => snapshot.completed += 1,
                ArtifactState::Failed => snapshot.failed += 1,
                ArtifactState::Skipped => snapshot.skipped += 1,
            }
        }
        snapshot
    }

    /// All failed entries with their error details, sorted by key.
    pub fn failures(&self) -> Vec<ProgressEntry> {
        let inner = self.lock();
        let mut failed: Vec<ProgressEntry> = inner
            .entries
            .values()
            .filter(|e| e.state == ArtifactState::Failed)
            .cloned()
            .collect();
        failed.sort_by(|a, b| a.key.cmp(&b.key));
        failed
    }

    fn transition(&self, artifact: &Artifact, state: ArtifactState, error: Option<String>) {
        let key = artifact.key();
        let mut inner = self.lock();
        let entry = inner.entries.entry(key.clone()).or_insert(ProgressEntry {
            key,
            state: ArtifactState::Pending,
            error: None,
        });
        entry.state = state;
        entry.error = error;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panicked worker; the map itself is
        // still sound for read-out.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

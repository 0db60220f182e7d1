//! Store capability: persistence interfaces and adapters.
//!
//! A [`Storage`] persists the tabular result of one artifact at its
//! deterministic path and answers cheap existence checks so the
//! coordinator can skip artifacts that are already materialized.

use async_trait::async_trait;

use crate::{Artifact, Table};

pub mod csv;

/// Storage errors. Never retried by the coordinator: a failed write
/// usually means a local condition (disk full, bad path) that a retry
/// will not fix.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization or encoding error while rendering rows
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Store capability consumed by the download coordinator.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Whether this artifact is already materialized on disk.
    ///
    /// Must be derived from the artifact identity alone so the answer is
    /// stable across runs.
    fn exists(&self, artifact: &Artifact) -> bool;

    /// Persist the table for an artifact.
    ///
    /// Idempotent: saving the same artifact twice overwrites safely.
    async fn save(&self, artifact: &Artifact, table: &Table) -> StorageResult<()>;
}

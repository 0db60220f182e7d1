//! CLI error types and conversions

use crate::config::ConfigError;
use crate::coordinator::CoordinatorError;
use crate::source::FetchError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Coordinator rejected the run before dispatch
    #[error("coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// Data source could not be constructed
    #[error("source error: {0}")]
    Source(#[from] FetchError),

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Summary could not be rendered as JSON
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// One or more artifacts failed terminally
    #[error("{failed} of {total} downloads failed")]
    DownloadsFailed {
        /// Artifacts that failed
        failed: usize,
        /// Artifacts dispatched
        total: usize,
    },
}

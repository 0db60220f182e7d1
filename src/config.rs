//! YAML configuration loading and validation.
//!
//! A config file declares the provider connection, storage layout, retry
//! budget, concurrency limit, and the download plan itself. Date fields
//! stay as strings in the file format and are parsed into the typed model
//! when the plan is materialized, so every config error carries the
//! offending text.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coordinator::{DownloadRequest, RetryPolicy};
use crate::{DataType, DateRange, Frequency, ModelError};

/// Default limit on concurrently executing artifact pipelines.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Default provider request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML or has the wrong shape
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Config parsed but violates a semantic rule
    #[error("invalid config: {0}")]
    Invalid(String),

    /// A date, frequency, or data type field failed to parse
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Provider connection settings
    pub api: ApiConfig,
    /// Storage layout settings
    pub storage: StorageConfig,
    /// Declarative download plan
    pub downloads: Vec<DownloadEntry>,
    /// Limit on concurrently executing artifact pipelines
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

/// Provider connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Provider name; only "polygon" is supported
    pub service: String,
    /// API key; falls back to the `POLYGON_API_KEY` environment variable
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Total fetch attempts per artifact
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay in seconds between attempts
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f64,
}

/// Storage layout settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory for downloaded files
    pub base_path: PathBuf,
    /// On-disk format; only "csv" is supported
    #[serde(default = "default_format")]
    pub format: String,
}

/// One download entry from the config file, with dates still as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadEntry {
    /// Ticker symbols
    pub symbols: Vec<String>,
    /// Data types to download for each symbol
    pub data_types: Vec<DataType>,
    /// Frequencies for aggregate bars
    #[serde(default)]
    pub frequencies: Vec<Frequency>,
    /// Range start, `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`
    pub start_date: String,
    /// Range end, inclusive
    pub end_date: String,
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    crate::coordinator::retry::DEFAULT_MAX_RETRIES
}

fn default_retry_delay() -> f64 {
    crate::coordinator::retry::DEFAULT_RETRY_DELAY.as_secs_f64()
}

fn default_format() -> String {
    "csv".to_string()
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate config from a YAML string.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation beyond what the deserializer enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.service != "polygon" {
            return Err(ConfigError::Invalid(format!(
                "unsupported api.service \"{}\" (supported: polygon)",
                self.api.service
            )));
        }
        if self.storage.format != "csv" {
            return Err(ConfigError::Invalid(format!(
                "unsupported storage.format \"{}\" (supported: csv)",
                self.storage.format
            )));
        }
        if self.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.api.timeout == 0 {
            return Err(ConfigError::Invalid(
                "api.timeout must be at least 1 second".to_string(),
            ));
        }
        if !self.api.retry_delay.is_finite() || self.api.retry_delay < 0.0 {
            return Err(ConfigError::Invalid(
                "api.retry_delay must be a finite, non-negative number of seconds".to_string(),
            ));
        }
        if self.downloads.is_empty() {
            return Err(ConfigError::Invalid(
                "downloads list is empty".to_string(),
            ));
        }
        // Parse every date pair eagerly so a bad entry fails validation,
        // not the run.
        for (index, entry) in self.downloads.iter().enumerate() {
            entry.date_range().map_err(|e| {
                ConfigError::Invalid(format!("downloads[{index}]: {e}"))
            })?;
        }
        Ok(())
    }

    /// Materialize the download plan into typed requests.
    pub fn requests(&self) -> Result<Vec<DownloadRequest>, ConfigError> {
        self.downloads
            .iter()
            .map(|entry| {
                Ok(DownloadRequest {
                    symbols: entry.symbols.clone(),
                    data_types: entry.data_types.clone(),
                    frequencies: entry.frequencies.clone(),
                    date_range: entry.date_range()?,
                })
            })
            .collect()
    }

    /// Retry policy derived from the api section.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.api.max_retries,
            Duration::from_secs_f64(self.api.retry_delay),
        )
    }

    /// Per-request timeout derived from the api section.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout)
    }

    /// API key from the config file or the `POLYGON_API_KEY` environment
    /// variable, in that order.
    pub fn api_key(&self) -> Option<String> {
        self.api
            .api_key
            .clone()
            .or_else(|| std::env::var("POLYGON_API_KEY").ok())
    }
}

impl DownloadEntry {
    /// Parse the date pair into a typed range.
    pub fn date_range(&self) -> Result<DateRange, ModelError> {
        DateRange::from_dates(&self.start_date, &self.end_date)
    }
}

/// Starter config written by the `init` command.
pub fn sample_config() -> &'static str {
    r#"# marketdl configuration
api:
  service: polygon
  # api_key: your-key-here   # or set POLYGON_API_KEY
  timeout: 30
  max_retries: 3
  retry_delay: 1.0

storage:
  base_path: ./data
  format: csv

max_concurrent: 5

downloads:
  - symbols: [AAPL, MSFT]
    data_types: [aggregates]
    frequencies: ["1minute", "1day"]
    start_date: 2024-01-01
    end_date: 2024-01-31
  - symbols: [AAPL]
    data_types: [trades]
    start_date: 2024-01-02
    end_date: 2024-01-02
"#
}

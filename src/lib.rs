//! # marketdl
//!
//! A library for downloading historical market data (aggregated bars, quotes,
//! and trades) from a remote market-data provider and persisting each result
//! as a file on disk.
//!
//! ## Features
//!
//! - **Declarative plans**: describe what to download as (symbols × data
//!   types × frequencies × date range) requests; the coordinator expands,
//!   deduplicates, and schedules the work
//! - **Bounded concurrency**: a sliding window of at most `max_concurrent`
//!   in-flight fetch/store pipelines
//! - **Retry with backoff**: transient provider failures are retried with a
//!   linearly increasing delay; permanent failures abort a single artifact
//!   without touching its siblings
//! - **Skip existing**: artifacts already materialized on disk are skipped,
//!   making re-runs cheap and idempotent
//! - **Graceful shutdown**: Ctrl+C stops admitting new artifacts and aborts
//!   in-flight pipelines without persisting partial data
//!
//! ## Quick Start
//!
//! ```no_run
//! use marketdl::coordinator::{DownloadCoordinator, DownloadRequest};
//! use marketdl::source::polygon::PolygonSource;
//! use marketdl::storage::csv::CsvStorage;
//! use marketdl::{DataType, DateRange, Frequency};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(PolygonSource::from_env()?);
//! let storage = Arc::new(CsvStorage::new("./data"));
//! let coordinator = DownloadCoordinator::new(source, storage);
//!
//! let request = DownloadRequest {
//!     symbols: vec!["AAPL".to_string()],
//!     data_types: vec![DataType::Aggregates],
//!     frequencies: vec!["1minute".parse::<Frequency>()?],
//!     date_range: DateRange::from_dates("2024-01-01", "2024-01-31")?,
//! };
//!
//! let summary = coordinator.run(&[request], 5).await?;
//! println!("completed={} failed={}", summary.completed, summary.failed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`partition`] - Date-range partitioning keeping requests within
//!   provider-imposed size limits
//! - [`artifact`] - One unit of deliverable data and its storage destination
//! - [`source`] - Fetch capability interface and the Polygon.io adapter
//! - [`storage`] - Store capability interface and the CSV adapter
//! - [`coordinator`] - Download orchestration with retry and progress
//! - [`config`] - YAML configuration loading and validation
//! - [`shutdown`] - Graceful shutdown coordination
//! - [`cli`] - Command implementations

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One unit of deliverable data
pub mod artifact;

/// CLI command implementations
pub mod cli;

/// Configuration file loading and validation
pub mod config;

/// Download orchestration
pub mod coordinator;

/// Date-range partitioning
pub mod partition;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Data source (fetch capability) interfaces and adapters
pub mod source;

/// Storage (store capability) interfaces and adapters
pub mod storage;

// Re-export commonly used types
pub use artifact::Artifact;

/// Sampling granularity units, ordered from finest to coarsest.
///
/// The ordering is significant: units at [`TimeUnit::Minute`] granularity or
/// finer force per-day partitioning of requested date ranges (see
/// [`partition::split_date_range`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    /// 1 second granularity
    #[serde(rename = "second")]
    Second,
    /// 1 minute granularity
    #[serde(rename = "minute")]
    Minute,
    /// 1 hour granularity
    #[serde(rename = "hour")]
    Hour,
    /// 1 day granularity
    #[serde(rename = "day")]
    Day,
    /// 1 week granularity
    #[serde(rename = "week")]
    Week,
    /// 1 month granularity
    #[serde(rename = "month")]
    Month,
    /// 3 month granularity
    #[serde(rename = "quarter")]
    Quarter,
    /// 1 year granularity
    #[serde(rename = "year")]
    Year,
}

impl TimeUnit {
    /// Lowercase name as used by the provider API and in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Quarter => "quarter",
            TimeUnit::Year => "year",
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "second" | "sec" => Ok(TimeUnit::Second),
            "minute" | "min" => Ok(TimeUnit::Minute),
            "hour" => Ok(TimeUnit::Hour),
            "day" => Ok(TimeUnit::Day),
            "week" => Ok(TimeUnit::Week),
            "month" => Ok(TimeUnit::Month),
            "quarter" => Ok(TimeUnit::Quarter),
            "year" => Ok(TimeUnit::Year),
            _ => Err(ModelError::InvalidTimeUnit(s.to_string())),
        }
    }
}

/// Sampling frequency for aggregated bars, e.g. "1minute" or "5hour".
///
/// Quotes and trades are tick-level and carry no frequency; they are
/// represented as `Option<Frequency>::None` throughout the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frequency {
    /// Positive multiplier applied to the unit (e.g. 5 in "5minute")
    pub multiplier: u32,
    /// Granularity unit
    pub unit: TimeUnit,
}

impl Frequency {
    /// Create a frequency, rejecting a zero multiplier.
    pub fn new(multiplier: u32, unit: TimeUnit) -> Result<Self, ModelError> {
        if multiplier == 0 {
            return Err(ModelError::InvalidFrequency(
                "multiplier must be positive".to_string(),
            ));
        }
        Ok(Self { multiplier, unit })
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.multiplier, self.unit)
    }
}

impl FromStr for Frequency {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits_end = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ModelError::InvalidFrequency(s.to_string()))?;
        if digits_end == 0 {
            return Err(ModelError::InvalidFrequency(s.to_string()));
        }
        let multiplier: u32 = s[..digits_end]
            .parse()
            .map_err(|_| ModelError::InvalidFrequency(s.to_string()))?;
        let unit: TimeUnit = s[digits_end..]
            .parse()
            .map_err(|_| ModelError::InvalidFrequency(s.to_string()))?;
        Self::new(multiplier, unit)
    }
}

impl Serialize for Frequency {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Inclusive date range in UTC.
///
/// Both endpoints are inclusive; the partitioner treats the range at day
/// granularity and emits full-day envelopes for split-eligible requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// Range start (inclusive)
    pub start: NaiveDateTime,
    /// Range end (inclusive)
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ModelError> {
        if start > end {
            return Err(ModelError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two date or datetime strings.
    ///
    /// Accepts `YYYY-MM-DD` (midnight assumed) or `YYYY-MM-DDTHH:MM:SS`.
    pub fn from_dates(start: &str, end: &str) -> Result<Self, ModelError> {
        Self::new(
            parse_datetime_flexible(start)?,
            parse_datetime_flexible(end)?,
        )
    }

    /// Number of calendar days touched by the range, inclusive of both
    /// boundary days.
    pub fn day_span(&self) -> i64 {
        (self.end.date() - self.start.date()).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Parse a datetime from `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS` input.
///
/// Date-only input maps to midnight so that a config range of
/// `2024-01-01..2024-01-02` covers both calendar days after partitioning.
pub fn parse_datetime_flexible(input: &str) -> Result<NaiveDateTime, ModelError> {
    let input = input.trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    Err(ModelError::InvalidDate(input.to_string()))
}

/// Kind of market data an artifact delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Aggregated OHLCV bars; requires a [`Frequency`]
    #[serde(rename = "aggregates")]
    Aggregates,
    /// Tick-level quotes; no frequency
    #[serde(rename = "quotes")]
    Quotes,
    /// Tick-level trades; no frequency
    #[serde(rename = "trades")]
    Trades,
}

impl DataType {
    /// Lowercase name as used in config files and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Aggregates => "aggregates",
            DataType::Quotes => "quotes",
            DataType::Trades => "trades",
        }
    }

    /// Whether this data type carries a sampling frequency.
    pub fn uses_frequency(&self) -> bool {
        matches!(self, DataType::Aggregates)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aggregates" | "aggs" => Ok(DataType::Aggregates),
            "quotes" => Ok(DataType::Quotes),
            "trades" => Ok(DataType::Trades),
            _ => Err(ModelError::InvalidDataType(s.to_string())),
        }
    }
}

/// Tabular fetch result: named columns plus value rows.
///
/// Rows are JSON values straight from the provider; the storage adapter
/// decides how to render them on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column names in output order
    pub columns: Vec<String>,
    /// Row values; each row has one value per column
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl Table {
    /// Create a table with the given columns and no rows.
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build a table from a list of JSON objects, unioning their keys into
    /// columns in first-seen order. Missing values become JSON null.
    pub fn from_records(records: &[serde_json::Value]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            if let Some(map) = record.as_object() {
                for key in map.keys() {
                    if !columns.iter().any(|c| c == key) {
                        columns.push(key.clone());
                    }
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| record.get(col).cloned().unwrap_or(serde_json::Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }
}

/// Data model construction errors
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Range constructed with start after end
    #[error("invalid date range: start ({start}) is after end ({end})")]
    InvalidRange {
        /// Offending start
        start: NaiveDateTime,
        /// Offending end
        end: NaiveDateTime,
    },

    /// Unparsable date or datetime string
    #[error("invalid date: {0} (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)")]
    InvalidDate(String),

    /// Unknown time unit name
    #[error("invalid time unit: {0}")]
    InvalidTimeUnit(String),

    /// Unparsable frequency string
    #[error("invalid frequency: {0} (expected e.g. \"1minute\", \"5hour\")")]
    InvalidFrequency(String),

    /// Unknown data type name
    #[error("invalid data type: {0}")]
    InvalidDataType(String),
}

//! Artifact: one unit of deliverable data and its storage destination.
//!
//! An artifact identifies a (symbol × data-type × frequency × date-range)
//! slice of market data produced by expanding a configured download request
//! through the partitioner. Artifacts are immutable once created; only the
//! associated file on disk changes as the pipeline runs.

use chrono::NaiveDateTime;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use crate::partition;
use crate::{DataType, DateRange, Frequency};

/// One downloadable unit of data.
///
/// Identity is the tuple (symbol, data type, frequency, date range); the
/// base path is a storage concern and excluded from equality so duplicate
/// requests collapse regardless of destination configuration.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Ticker symbol (e.g. "AAPL")
    pub symbol: String,
    /// Kind of data this artifact delivers
    pub data_type: DataType,
    /// Sampling frequency; `None` for tick-level quotes/trades
    pub frequency: Option<Frequency>,
    /// Date range covered by this artifact
    pub date_range: DateRange,
    /// Root directory under which the artifact is stored
    pub base_path: PathBuf,
}

impl Artifact {
    /// Stable identity key, also used as the progress-tracker map key.
    ///
    /// Full-day envelope ranges (the partitioner's output) render their
    /// dates only; any other range keeps its wall-clock times so two
    /// artifacts differing only in intraday bounds never share a key.
    pub fn key(&self) -> String {
        let freq = self
            .frequency
            .map(|f| f.to_string())
            .unwrap_or_else(|| "raw".to_string());
        let date_only = partition::is_day_envelope(&self.date_range);
        format!(
            "{}:{}:{}:{}:{}",
            self.symbol,
            self.data_type,
            freq,
            key_stamp(self.date_range.start, date_only),
            key_stamp(self.date_range.end, date_only)
        )
    }

    /// Deterministic file name (without directory), derived purely from the
    /// artifact identity so existence checks are stable across runs.
    ///
    /// Format: `{data_type}[_{frequency}]_{start}_{end}.{ext}`. Full-day
    /// envelope ranges use `YYYYMMDD` dates, e.g.
    /// `aggregates_1minute_20240101_20240101.csv`; other ranges carry their
    /// times (`YYYYMMDDTHHMMSS`) so distinct identities never map onto one
    /// file.
    pub fn file_name(&self, extension: &str) -> String {
        let date_only = partition::is_day_envelope(&self.date_range);
        let start = file_stamp(self.date_range.start, date_only);
        let end = file_stamp(self.date_range.end, date_only);
        match self.frequency {
            Some(freq) => format!("{}_{}_{}_{}.{}", self.data_type, freq, start, end, extension),
            None => format!("{}_{}_{}.{}", self.data_type, start, end, extension),
        }
    }

    /// Path relative to a storage root: `{symbol}/{file_name}`.
    ///
    /// The symbol directory component is sanitized to prevent path
    /// traversal via hostile symbol strings.
    pub fn relative_path(&self, extension: &str) -> PathBuf {
        PathBuf::from(sanitize_symbol(&self.symbol)).join(self.file_name(extension))
    }

    /// Full storage path: `{base_path}/{symbol}/{file_name}`.
    pub fn storage_path(&self, extension: &str) -> PathBuf {
        self.base_path.join(self.relative_path(extension))
    }
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

// Equality and hashing cover the identity tuple only, never base_path.
impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.data_type == other.data_type
            && self.frequency == other.frequency
            && self.date_range == other.date_range
    }
}

impl Eq for Artifact {}

impl Hash for Artifact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
        self.data_type.hash(state);
        self.frequency.hash(state);
        self.date_range.hash(state);
    }
}

fn key_stamp(dt: NaiveDateTime, date_only: bool) -> String {
    if date_only {
        dt.date().to_string()
    } else {
        // %.f prints the fraction only when nonzero
        dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }
}

fn file_stamp(dt: NaiveDateTime, date_only: bool) -> String {
    if date_only {
        dt.format("%Y%m%d").to_string()
    } else {
        dt.format("%Y%m%dT%H%M%S%.f").to_string()
    }
}

/// Sanitize a symbol for filesystem safety.
///
/// Replaces directory separators and parent references so a symbol can
/// never escape the base path: `/`, `\`, `:` become `_` and `..` becomes
/// `__`. Case is preserved (symbols are case-sensitive upstream).
fn sanitize_symbol(name: &str) -> String {
    name.replace("..", "__").replace(['/', '\\', ':'], "_")
}

//! Request expansion and deduplication.
//!
//! A configured request names symbol, data-type and frequency *sets* over
//! one date range. Planning takes the cartesian product, splits each
//! combination through the partitioner, and deduplicates the resulting
//! artifacts by identity across the whole batch.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use super::CoordinatorError;
use crate::partition::split_date_range;
use crate::{Artifact, DataType, DateRange, Frequency};

/// One declarative download request.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadRequest {
    /// Ticker symbols to download
    pub symbols: Vec<String>,
    /// Data types to download for each symbol
    pub data_types: Vec<DataType>,
    /// Frequencies for aggregate bars; ignored by quotes/trades
    #[serde(default)]
    pub frequencies: Vec<Frequency>,
    /// Date range covered by the request
    pub date_range: DateRange,
}

impl DownloadRequest {
    fn validate(&self, index: usize) -> Result<(), CoordinatorError> {
        if self.symbols.is_empty() {
            return Err(CoordinatorError::InvalidRequest(format!(
                "request #{index}: symbols list is empty"
            )));
        }
        if self.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(CoordinatorError::InvalidRequest(format!(
                "request #{index}: blank symbol"
            )));
        }
        if self.data_types.is_empty() {
            return Err(CoordinatorError::InvalidRequest(format!(
                "request #{index}: data_types list is empty"
            )));
        }
        if self
            .data_types
            .iter()
            .any(|dt| dt.uses_frequency())
            && self.frequencies.is_empty()
        {
            return Err(CoordinatorError::InvalidRequest(format!(
                "request #{index}: aggregates requested without frequencies"
            )));
        }
        Ok(())
    }
}

/// Expand requests into the deduplicated, ordered artifact list.
///
/// Order is deterministic: request order, then symbol × data-type ×
/// frequency order, then chronological sub-ranges. Duplicate identities
/// across the whole batch are dropped, keeping the first occurrence.
pub fn expand_requests(
    requests: &[DownloadRequest],
    base_path: &Path,
) -> Result<Vec<Artifact>, CoordinatorError> {
    let mut artifacts = Vec::new();
    let mut seen: HashSet<Artifact> = HashSet::new();

    for (index, request) in requests.iter().enumerate() {
        request.validate(index)?;

        for symbol in &request.symbols {
            for data_type in &request.data_types {
                let frequencies: Vec<Option<Frequency>> = if data_type.uses_frequency() {
                    request.frequencies.iter().copied().map(Some).collect()
                } else {
                    vec![None]
                };

                for frequency in frequencies {
                    for sub_range in split_date_range(request.date_range, frequency.as_ref()) {
                        let artifact = Artifact {
                            symbol: symbol.clone(),
                            data_type: *data_type,
                            frequency,
                            date_range: sub_range,
                            base_path: base_path.to_path_buf(),
                        };
                        if seen.insert(artifact.clone()) {
                            artifacts.push(artifact);
                        }
                    }
                }
            }
        }
    }

    Ok(artifacts)
}

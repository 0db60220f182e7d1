//! CSV storage adapter.
//!
//! Writes each artifact's table as a headered CSV file at
//! `{base_path}/{symbol}/{file_name}` through a buffered writer. Values
//! arrive as JSON; scalars are rendered bare (no quotes around numbers,
//! strings as-is, null as empty) and anything structured falls back to its
//! JSON text.

use async_trait::async_trait;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::debug;

use super::{Storage, StorageError, StorageResult};
use crate::{Artifact, Table};

const FILE_EXTENSION: &str = "csv";
const WRITE_BUFFER_SIZE: usize = 8192;

/// CSV implementation of [`Storage`].
pub struct CsvStorage {
    base_path: PathBuf,
}

impl CsvStorage {
    /// Create a storage rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Full path for an artifact under this storage root.
    pub fn path_for(&self, artifact: &Artifact) -> PathBuf {
        self.base_path.join(artifact.relative_path(FILE_EXTENSION))
    }

    fn write_table(&self, path: &PathBuf, table: &Table) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Io(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let file = File::create(path)
            .map_err(|e| StorageError::Io(format!("failed to create {}: {e}", path.display())))?;
        let mut writer = csv::Writer::from_writer(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file));

        writer
            .write_record(&table.columns)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        for row in &table.rows {
            let record: Vec<String> = row.iter().map(render_value).collect();
            writer
                .write_record(&record)
                .map_err(|e| StorageError::Encoding(e.to_string()))?;
        }

        writer
            .flush()
            .map_err(|e| StorageError::Io(format!("failed to flush {}: {e}", path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl Storage for CsvStorage {
    fn exists(&self, artifact: &Artifact) -> bool {
        self.path_for(artifact).exists()
    }

    async fn save(&self, artifact: &Artifact, table: &Table) -> StorageResult<()> {
        let path = self.path_for(artifact);
        debug!(
            artifact = %artifact.key(),
            path = %path.display(),
            rows = table.len(),
            "saving artifact"
        );
        self.write_table(&path, table)
    }
}

/// Render one JSON value as a CSV cell.
fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

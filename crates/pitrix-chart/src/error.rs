//! Error types for chart decoding

use std::path::Path;
use thiserror::Error;

use pitrix_import_types::ImportError;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("failed to read archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chart.yaml not found in archive")]
    MissingChartFile,

    #[error("invalid Chart.yaml: {0}")]
    InvalidMetadata(#[from] serde_yaml::Error),

    #[error("Chart.yaml has no {0}")]
    MissingField(&'static str),
}

impl ChartError {
    /// Attach the archive path, producing the engine-level decode error
    pub fn into_import_error(self, path: &Path) -> ImportError {
        ImportError::Decode {
            path: path.display().to_string(),
            reason: self.to_string(),
        }
    }
}

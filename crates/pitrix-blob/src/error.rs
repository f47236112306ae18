//! Error types for the content store

use pitrix_import_types::ImportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("S3 error: {0}")]
    S3(String),

    #[error("Bucket {bucket} unavailable: {message}")]
    Bucket { bucket: String, message: String },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<BlobError> for ImportError {
    fn from(error: BlobError) -> Self {
        match error {
            BlobError::UploadFailed(msg) => ImportError::Upload(msg),
            BlobError::InvalidConfiguration(msg) => ImportError::InvalidConfiguration(msg),
            other => ImportError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_failure_maps_to_upload() {
        let err: ImportError = BlobError::UploadFailed("access denied".into()).into();
        assert!(matches!(err, ImportError::Upload(msg) if msg == "access denied"));
    }

    #[test]
    fn test_bucket_failure_maps_to_transport() {
        let err: ImportError = BlobError::Bucket {
            bucket: "app-store".into(),
            message: "connection refused".into(),
        }
        .into();
        assert!(matches!(err, ImportError::Transport(_)));
    }
}

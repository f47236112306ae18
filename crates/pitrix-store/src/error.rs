//! Error types for the resource store clients

use pitrix_import_types::ImportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Conflict on {target}: {message}")]
    Conflict { target: String, message: String },

    #[error("API returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid patch: {0}")]
    InvalidPatch(String),
}

impl From<StoreError> for ImportError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(name) => ImportError::NotFound(name),
            StoreError::Conflict { .. } => ImportError::Conflict(error.to_string()),
            StoreError::Serialization(e) => ImportError::Serialization(e),
            other => ImportError::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_import_error() {
        let err: ImportError = StoreError::NotFound("app-1".into()).into();
        assert!(err.is_not_found());

        let err: ImportError = StoreError::Conflict {
            target: "app-1".into(),
            message: "the object has been modified".into(),
        }
        .into();
        assert!(err.is_conflict());

        let err: ImportError = StoreError::Api {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert!(matches!(err, ImportError::Transport(_)));
    }
}

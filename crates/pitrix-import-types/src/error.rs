//! Error types for the import system

use thiserror::Error;

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that can occur during import operations
#[derive(Error, Debug)]
pub enum ImportError {
    /// Network or authentication failure against either store
    #[error("Transport error: {0}")]
    Transport(String),

    /// Write rejected because its base revision is stale
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Record or object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Retry budget spent on repeated conflicts
    #[error("{operation} of {target} failed after {attempts} attempts")]
    ExhaustedRetries {
        operation: String,
        target: String,
        attempts: u32,
    },

    /// Bundle archive could not be decoded
    #[error("Failed to decode bundle {path}: {reason}")]
    Decode { path: String, reason: String },

    /// Content store rejected the payload
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Invalid configuration detected
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ImportError {
    /// Whether this error is a stale-revision rejection worth retrying
    pub fn is_conflict(&self) -> bool {
        matches!(self, ImportError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ImportError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ImportError::Conflict("stale".into()).is_conflict());
        assert!(!ImportError::Transport("reset".into()).is_conflict());
        assert!(ImportError::NotFound("app-x".into()).is_not_found());
        assert!(!ImportError::Conflict("stale".into()).is_not_found());
    }

    #[test]
    fn test_exhausted_retries_names_operation_and_target() {
        let err = ImportError::ExhaustedRetries {
            operation: "rename application".to_string(),
            target: "app-123".to_string(),
            attempts: 10,
        };
        assert_eq!(
            err.to_string(),
            "rename application of app-123 failed after 10 attempts"
        );
    }
}

//! Error types for the dropout classifier

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, DropoutError>;

/// Main error type
#[derive(Error, Debug)]
pub enum DropoutError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Feature schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<polars::error::PolarsError> for DropoutError {
    fn from(err: polars::error::PolarsError) -> Self {
        DropoutError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for DropoutError {
    fn from(err: serde_json::Error) -> Self {
        DropoutError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for DropoutError {
    fn from(err: bincode::Error) -> Self {
        DropoutError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DropoutError {
    fn from(err: ndarray::ShapeError) -> Self {
        DropoutError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DropoutError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DropoutError = io_err.into();
        assert!(matches!(err, DropoutError::IoError(_)));
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = DropoutError::InvalidParameter {
            name: "C".to_string(),
            value: "-1".to_string(),
            reason: "must be positive".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid parameter: C = -1, must be positive");
    }
}

//! Error types for the salary prediction core

use thiserror::Error;

/// Errors that can occur while loading, encoding or predicting
#[derive(Error, Debug)]
pub enum CoreError {
    /// A requested category was never seen while fitting the encoder
    #[error("Unknown category for {feature}: {value:?} was not present in the training data")]
    UnknownCategory { feature: String, value: String },

    /// The input table lacks a column the feature schema depends on
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A feature column holds a value that cannot be read as its declared type
    #[error("Invalid value in column {column} at line {line}: {message}")]
    InvalidValue {
        column: String,
        line: u64,
        message: String,
    },

    /// Nothing left to train on after loading and filtering
    #[error("Dataset is empty")]
    EmptyDataset,

    /// A prediction request field is outside its allowed domain
    #[error("Invalid prediction request: {0}")]
    InvalidRequest(String),

    /// Stored artifacts are structurally broken
    #[error("Invalid artifacts: {0}")]
    InvalidArtifacts(String),

    /// Configuration could not be parsed or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether the caller can fix the request and resubmit
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownCategory { .. } | CoreError::InvalidRequest(_)
        )
    }
}

/// Result type for salary core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors_are_recoverable() {
        let unknown = CoreError::UnknownCategory {
            feature: "job_title".to_string(),
            value: "Astronaut".to_string(),
        };
        assert!(unknown.is_recoverable());
        assert!(CoreError::InvalidRequest("work_year".to_string()).is_recoverable());

        assert!(!CoreError::EmptyDataset.is_recoverable());
        assert!(!CoreError::InvalidArtifacts("tree 0".to_string()).is_recoverable());
    }
}

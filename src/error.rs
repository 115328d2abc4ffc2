//! Error types for construction, input validation and the file-facing layers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HstError {
    #[error("Invalid configuration: {name} - {reason}")]
    Configuration { name: String, reason: String },

    #[error("Invalid sample: expected {expected} dimensions, got {got}")]
    Input { expected: usize, got: usize },

    #[error("Invalid sample: coordinate {index} is not finite")]
    NonFiniteCoordinate { index: usize },

    #[error("Invalid field in record {record}, column {column}: {value:?}")]
    InvalidField {
        record: u64,
        column: usize,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl HstError {
    pub(crate) fn config(name: &str, reason: impl Into<String>) -> Self {
        HstError::Configuration {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by a single bad sample rather than the setup.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HstError::Input { .. } | HstError::NonFiniteCoordinate { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HstError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_display() {
        let error = HstError::config("n_trees", "must be positive");
        assert_eq!(
            error.to_string(),
            "Invalid configuration: n_trees - must be positive"
        );
        assert!(!error.is_input_error());
    }

    #[test]
    fn test_input_display() {
        let error = HstError::Input {
            expected: 3,
            got: 2,
        };
        assert_eq!(
            error.to_string(),
            "Invalid sample: expected 3 dimensions, got 2"
        );
        assert!(error.is_input_error());
    }

    #[test]
    fn test_non_finite_is_input_error() {
        let error = HstError::NonFiniteCoordinate { index: 4 };
        assert!(error.is_input_error());
        assert!(error.to_string().contains('4'));
    }

    #[test]
    fn test_invalid_field_display() {
        let error = HstError::InvalidField {
            record: 3,
            column: 1,
            value: "abc".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid field in record 3, column 1: \"abc\""
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HstError>();
    }
}

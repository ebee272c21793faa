//! Error types for the ring_reflectivity library

use thiserror::Error;

/// Result type alias for ring_reflectivity operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Error types for reflectivity analysis operations
///
/// Only genuine faults live here. An empty measurement block, an image without
/// edges or a sector box that leaves its wedge are ordinary outcomes and are
/// reported through `Option` values instead.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Invalid tunable or call parameter (e.g. shrink factor >= 1)
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Matrix data does not match the declared or expected shape
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Calibration file could not be read
    #[error("Calibration error: {message}")]
    CalibrationError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration file could not be read or written
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// OpenCV operation failed
    #[error("OpenCV error: {operation}")]
    OpenCvError {
        operation: String,
        #[source]
        source: Option<opencv::Error>,
    },
}

impl AnalysisError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a calibration error with context
    pub fn calibration<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::CalibrationError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an OpenCV error with context
    pub fn opencv(operation: impl Into<String>, source: opencv::Error) -> Self {
        Self::OpenCvError {
            operation: operation.into(),
            source: Some(source),
        }
    }

    /// Check if this error indicates a recoverable condition
    ///
    /// Calibration data is optional context, so a broken calibration file
    /// should not end a measurement session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AnalysisError::CalibrationError { .. })
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::InvalidParameter { parameter, value } => {
                format!("The setting '{}' has an unusable value ({}).", parameter, value)
            }
            AnalysisError::DimensionMismatch { .. } => {
                "The background frame does not match the image size.".to_string()
            }
            AnalysisError::CalibrationError { .. } => {
                "Could not read the calibration file. Measurements continue without calibration."
                    .to_string()
            }
            AnalysisError::ConfigError { .. } => {
                "Could not load the analysis settings file.".to_string()
            }
            AnalysisError::OpenCvError { .. } => {
                "Image analysis failed. Please try with a different selection.".to_string()
            }
        }
    }
}

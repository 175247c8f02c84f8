//! Error types for vac-oxide
//!
//! Every fallible operation in the crate returns [`VacError`]. Analysis
//! functions reject malformed input with a typed variant instead of
//! returning empty results.

use thiserror::Error;

/// Main error type for vac-oxide operations
#[derive(Error, Debug)]
pub enum VacError {
    /// File I/O error
    #[error("Failed to access file: {0}")]
    FileIo(#[from] std::io::Error),

    /// Polars data processing error
    #[error("Data processing error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unsupported file format
    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Column not found in data
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Empty dataset error
    #[error("Dataset is empty or has no rows")]
    EmptyDataset,

    /// Insufficient data for operation
    #[error("Insufficient data: {operation} requires at least {required} points, but got {actual}")]
    InsufficientData {
        operation: String,
        required: usize,
        actual: usize,
    },

    /// Paired arrays of different lengths
    #[error("Length mismatch: {left} values vs {right} values")]
    LengthMismatch { left: usize, right: usize },

    /// Parameter outside its valid domain
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Numerical fit did not produce a usable result
    #[error("Fit failed: {0}")]
    Fit(String),

    /// Data validation error
    #[error("Data validation failed: {0}")]
    Validation(String),

    /// No loaded file with the given id
    #[error("Unknown file id: {0}")]
    UnknownFile(String),

    /// No series with the given id
    #[error("Unknown series id: {0}")]
    UnknownSeries(String),
}

/// Result type alias for vac-oxide operations
pub type Result<T> = std::result::Result<T, VacError>;

impl VacError {
    /// Shorthand for [`VacError::InsufficientData`]
    pub fn insufficient(operation: &str, required: usize, actual: usize) -> Self {
        VacError::InsufficientData {
            operation: operation.to_string(),
            required,
            actual,
        }
    }

    /// Shorthand for [`VacError::InvalidParameter`]
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        VacError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Get a user-friendly error message suitable for reports and the CLI
    pub fn user_message(&self) -> String {
        match self {
            VacError::FileIo(e) => format!("File error: {}", e),
            VacError::Polars(e) => format!("Data error: {}", e),
            VacError::Json(e) => format!("JSON error: {}", e),
            VacError::UnsupportedFormat { extension } => {
                format!("Unsupported file format: '.{}'", extension)
            }
            VacError::ColumnNotFound { column } => {
                format!("Column '{}' not found", column)
            }
            VacError::EmptyDataset => "Dataset is empty".to_string(),
            VacError::InsufficientData {
                operation,
                required,
                actual,
            } => {
                format!(
                    "{} requires {} points, but only {} available",
                    operation, required, actual
                )
            }
            VacError::LengthMismatch { left, right } => {
                format!("Series lengths differ ({} vs {})", left, right)
            }
            VacError::InvalidParameter { name, reason } => {
                format!("Invalid {}: {}", name, reason)
            }
            VacError::Fit(msg) => format!("Fit error: {}", msg),
            VacError::Validation(msg) => format!("Validation error: {}", msg),
            VacError::UnknownFile(id) => format!("No loaded file with id {}", id),
            VacError::UnknownSeries(id) => format!("No series with id {}", id),
        }
    }

    /// Get a short title for the error
    pub fn title(&self) -> &'static str {
        match self {
            VacError::FileIo(_) => "File Error",
            VacError::Polars(_) => "Data Error",
            VacError::Json(_) => "JSON Error",
            VacError::UnsupportedFormat { .. } => "Unsupported Format",
            VacError::ColumnNotFound { .. } => "Column Not Found",
            VacError::EmptyDataset => "Empty Dataset",
            VacError::InsufficientData { .. } => "Insufficient Data",
            VacError::LengthMismatch { .. } => "Length Mismatch",
            VacError::InvalidParameter { .. } => "Invalid Parameter",
            VacError::Fit(_) => "Fit Error",
            VacError::Validation(_) => "Validation Error",
            VacError::UnknownFile(_) => "Unknown File",
            VacError::UnknownSeries(_) => "Unknown Series",
        }
    }
}

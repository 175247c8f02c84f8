pub mod cleaning;
pub mod quality;
pub mod source;
pub mod stats;

// Re-export key types for convenience
pub use cleaning::{MissingDataMethod, SmoothingMethod};
pub use quality::{QualityConfig, QualityReport, analyze_quality};
pub use source::{ColumnInfo, ColumnKind, ColumnStats, FileData};
pub use stats::{
    Correlation, CorrelationMatrix, OutlierMethod, OutlierReport, Regression, Statistics,
    calculate_correlation, calculate_correlation_matrix, calculate_statistics, detect_outliers,
    percentile, perform_regression,
};

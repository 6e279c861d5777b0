use thiserror::Error;

/// Convenience result type for the analysis stages.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Convenience result type for loading datasets and configuration.
pub type LoadResult<T> = Result<T, LoadError>;

/// Error type returned by the analysis stages (clean, calculate, select chart, evaluate).
///
/// Only structurally invalid input is an error. Data-quality conditions such as high
/// missingness or zero variance produce well-defined degenerate outputs instead, and an
/// incompatible chart family is reported as [`crate::charts::ChartOutcome::Unsupported`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The dataset has no rows or no columns.
    #[error("dataset is empty ({rows} rows, {columns} columns)")]
    EmptyDataset { rows: usize, columns: usize },

    /// The requested column is not present in the column type map.
    #[error("column '{column}' not found")]
    ColumnNotFound { column: String },
}

/// Error type returned when loading a dataset or a configuration file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-text parsing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing error (dataset or configuration).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "excel")]
    /// Excel loading error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// The input format could not be determined or is not enabled.
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },

    /// The input was readable but does not describe a table (no header, wrong JSON shape, ...).
    #[error("malformed input: {message}")]
    Malformed { message: String },
}

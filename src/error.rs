//! Error types for sparsebench.

use thiserror::Error;

/// Error type for sparsebench operations.
#[derive(Debug, Error)]
pub enum BenchError {
    /// A plug-in parameter is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// A solver needs an input the problem does not provide.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Solver error.
    #[error("Solver error: {0}")]
    SolverError(String),

    /// Numerical error.
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// Dataset could not be loaded or generated.
    #[error("Data error: {0}")]
    DataError(String),

    /// Invalid benchmark configuration.
    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Result type for sparsebench operations.
pub type Result<T> = std::result::Result<T, BenchError>;

/// Build a [`BenchError::ShapeMismatch`] from two displayable shapes.
pub(crate) fn shape_mismatch(expected: impl ToString, got: impl ToString) -> BenchError {
    BenchError::ShapeMismatch {
        expected: expected.to_string(),
        got: got.to_string(),
    }
}

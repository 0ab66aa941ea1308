//! Error types for IRWLS SVM training and prediction

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid label: expected -1 or +1, got {0}")]
    InvalidLabel(f64),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Matrix of dimension {dimension} is not positive definite")]
    NotPositiveDefinite { dimension: usize },

    #[error(
        "Solver failed at iteration {iteration}: system not positive definite after {attempts} attempts (last ridge {ridge:e})"
    )]
    SolverFailed {
        iteration: usize,
        attempts: usize,
        ridge: f64,
    },

    #[error("Training aborted at iteration {iteration}")]
    Aborted { iteration: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, SVMError>;

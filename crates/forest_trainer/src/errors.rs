use poetry_forest_core::ForestError;
use thiserror::Error;

/// Errors returned by the trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: missing field '{field}'")]
    MissingField { line: usize, field: &'static str },

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("invalid feature '{name}': {message}")]
    InvalidFeature { name: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("export error: {0}")]
    Export(#[from] ForestError),
}

/// Result type for trainer operations
pub type Result<T> = std::result::Result<T, TrainerError>;

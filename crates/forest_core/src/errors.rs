//! Error types for the forest artifact

use thiserror::Error;

/// Errors that can occur while building, checking or writing a forest
#[derive(Error, Debug)]
pub enum ForestError {
    /// Source tree structure is inconsistent
    #[error("Invalid tree structure: {0}")]
    InvalidTree(String),

    /// Exported forest failed validation
    #[error("Forest validation failed: {0}")]
    Validation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Moving the finished artifact into place failed
    #[error("Failed to persist artifact: {0}")]
    Persist(String),
}

/// Result type for forest operations
pub type Result<T> = std::result::Result<T, ForestError>;

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the on-disk resume index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("storage not found: {}", .0.display())]
    StorageNotFound(PathBuf),

    #[error("corrupt store: {0}")]
    CorruptStore(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("degenerate vector: norm is zero or not finite")]
    DegenerateVector,

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector file encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("metadata encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

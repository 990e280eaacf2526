//! Error types for ipmerge

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ipmerge operations
pub type Result<T> = std::result::Result<T, IpmError>;

/// Main error type for ipmerge
#[derive(Error, Debug)]
pub enum IpmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to load lookup table {path}: {message}")]
    LookupTable { path: PathBuf, message: String },

    #[error("Duplicate sequence identifier: {0}")]
    DuplicateSequence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl IpmError {
    /// Wrap any displayable failure that happened while loading a lookup table
    pub fn lookup_table(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        IpmError::LookupTable {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

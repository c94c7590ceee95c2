//! Error types for the Foresight backend
//!
//! This module provides structured error handling using thiserror for
//! error definitions and anyhow for propagation at the binary boundary.

use thiserror::Error;

/// Main error type for Foresight operations
#[derive(Error, Debug)]
pub enum ForesightError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Model artifact could not be encoded or decoded
    #[error("Model error: {0}")]
    Model(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request payload failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Write conflicts with existing state (e.g., duplicate dependency edge)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or invalid API token
    #[error("Unauthorized")]
    Unauthorized,

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Foresight operations
pub type Result<T> = std::result::Result<T, ForesightError>;

/// Convert anyhow::Error to ForesightError
impl From<anyhow::Error> for ForesightError {
    fn from(err: anyhow::Error) -> Self {
        ForesightError::Other(err.to_string())
    }
}

impl From<bincode::Error> for ForesightError {
    fn from(err: bincode::Error) -> Self {
        ForesightError::Model(err.to_string())
    }
}

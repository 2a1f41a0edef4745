//! Error types for growlog-core

use thiserror::Error;

/// Result type alias using growlog-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in growlog-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local buffer error
    #[error("Storage error: {0}")]
    Storage(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local buffer would exceed its capacity
    #[error("Local buffer quota exceeded: {needed} bytes needed, capacity is {capacity} bytes")]
    QuotaExceeded { needed: usize, capacity: usize },
}

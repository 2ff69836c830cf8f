//! Error types for linkage.

use thiserror::Error;

/// Result type alias for linkage operations.
pub type Result<T> = std::result::Result<T, LinkageError>;

/// Errors that can occur while building or reading record tables.
#[derive(Error, Debug)]
pub enum LinkageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Column referenced by configuration is not part of the schema
    #[error("Column '{0}' not found in schema")]
    MissingColumn(String),

    /// The same column name appears twice in a header
    #[error("Duplicate column '{0}' in schema")]
    DuplicateColumn(String),

    /// Two records share an identifier
    #[error("Duplicate record id: {0}")]
    DuplicateId(String),

    /// Invalid data format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

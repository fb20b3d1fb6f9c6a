//! Common error types for MDG

use thiserror::Error;

/// Common result type for MDG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across MDG services
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sensitive field survived sanitization with its original value.
    /// Fatal for the affected record only, never for the batch.
    #[error("Policy violation: sensitive field '{field}' still holds an original value")]
    PolicyViolation { field: String },

    /// Not enough data to run a computation (empty pixel grid,
    /// fewer feature vectors than clusters)
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

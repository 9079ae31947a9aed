//! Error types for aqueduct

use thiserror::Error;

/// Core error type for aqueduct operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Client is not connected")]
    Unconnected,

    #[error("Pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for aqueduct operations
pub type Result<T> = std::result::Result<T, Error>;

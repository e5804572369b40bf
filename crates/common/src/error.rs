//! Common error types for conn-check components.

use thiserror::Error;

/// Errors a service check can surface to the runner.
///
/// Client-library errors are flattened to strings at the check boundary so the
/// runner only ever needs `Display` to build a FAIL detail.
#[derive(Error, Debug)]
pub enum CheckError {
    /// Relational database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Redis/Valkey operation failed
    #[error("Redis error: {0}")]
    Redis(String),

    /// Kafka operation failed
    #[error("Kafka error: {0}")]
    Kafka(String),

    /// HTTP transport error (connection refused, TLS, body read)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Service answered with a status code the check does not accept
    #[error("Unexpected status {status} from {operation}: {body}")]
    UnexpectedStatus {
        operation: String,
        status: u16,
        body: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A client call did not finish in time
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// Round trip read back something other than what was written
    #[error("payload mismatch: got {actual}, want {expected}")]
    PayloadMismatch { expected: String, actual: String },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using `CheckError`
pub type Result<T> = std::result::Result<T, CheckError>;

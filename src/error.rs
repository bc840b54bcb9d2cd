//! Error types for fitflow.

use std::time::Duration;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence errors raised by snapshot and profile stores.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Plan generator errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generator {generator} request failed: {reason}")]
    RequestFailed { generator: String, reason: String },

    #[error("Generator {generator} returned status {status}")]
    Status { generator: String, status: u16 },

    #[error("Invalid response from {generator}: {reason}")]
    InvalidResponse { generator: String, reason: String },

    #[error("Generator {generator} timed out after {timeout:?}")]
    Timeout { generator: String, timeout: Duration },

    #[error("Missing answer required for plan generation: {field}")]
    MissingAnswer { field: String },
}

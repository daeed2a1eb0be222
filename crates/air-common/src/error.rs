//! Error types shared by the alerting pipeline.

use thiserror::Error;

/// Result type alias using AirError.
pub type AirResult<T> = Result<T, AirError>;

/// Primary error type for pipeline operations.
///
/// Crate-local error enums convert into one of these categories so callers
/// can decide between "surface", "recover with a default" and "retry".
#[derive(Debug, Error)]
pub enum AirError {
    /// Empty or invalid input (samples, wind series, missing fields).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown method, pollutant or severity level with no usable default.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Numeric backend failure after every fallback was attempted.
    #[error("computation error: {0}")]
    Computation(String),

    /// Store unavailable or write rejected.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Best-effort artifact output failed.
    #[error("artifact error: {0}")]
    Artifact(String),
}

impl AirError {
    /// Create a Validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a Computation error.
    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }

    /// Create a Persistence error.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Whether re-running the same check later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AirError::Persistence(_) | AirError::Artifact(_))
    }
}

impl From<std::io::Error> for AirError {
    fn from(err: std::io::Error) -> Self {
        AirError::Artifact(err.to_string())
    }
}

impl From<serde_json::Error> for AirError {
    fn from(err: serde_json::Error) -> Self {
        AirError::Artifact(format!("JSON error: {}", err))
    }
}

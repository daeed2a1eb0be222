//! Error types for artifact rendering.

use air_common::AirError;
use thiserror::Error;

/// Errors that can occur while writing grid artifacts.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("image dimensions {width}x{height} do not match {len} values")]
    Dimensions { width: usize, height: usize, len: usize },

    #[error("malformed ASCII grid: {0}")]
    Parse(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<RenderError> for AirError {
    fn from(err: RenderError) -> Self {
        AirError::Artifact(err.to_string())
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;

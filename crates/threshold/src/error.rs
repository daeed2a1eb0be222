//! Error types for threshold detection.

use air_common::{AirError, Pollutant, SeverityLevel};
use thiserror::Error;

/// Errors that can occur while detecting exceedances.
#[derive(Error, Debug)]
pub enum ThresholdError {
    /// No threshold is available for the level, not even the `unhealthy`
    /// fallback.
    #[error("no threshold defined for {pollutant} at level {level}")]
    MissingThreshold {
        pollutant: Pollutant,
        level: SeverityLevel,
    },

    /// A configured threshold is not a finite number.
    #[error("invalid threshold configuration: {0}")]
    InvalidConfig(String),

    /// Mask and grid disagree on dimensions.
    #[error("mask has {actual} cells, grid has {expected}")]
    MaskMismatch { expected: usize, actual: usize },
}

impl From<ThresholdError> for AirError {
    fn from(err: ThresholdError) -> Self {
        match err {
            ThresholdError::MaskMismatch { .. } => AirError::Validation(err.to_string()),
            _ => AirError::Configuration(err.to_string()),
        }
    }
}

/// Result type for threshold operations.
pub type Result<T> = std::result::Result<T, ThresholdError>;

//! Error types for dispersion modelling.

use air_common::AirError;
use thiserror::Error;

/// Errors that can occur while forecasting dispersion.
#[derive(Error, Debug)]
pub enum DispersionError {
    /// Wind series lengths do not match the requested step count.
    #[error("wind series mismatch: {directions} directions, {speeds} speeds, {steps} steps")]
    WindLengthMismatch {
        directions: usize,
        speeds: usize,
        steps: usize,
    },

    /// A wind value is negative or not finite.
    #[error("invalid wind at step {step}: {detail}")]
    InvalidWind { step: usize, detail: String },

    /// Model parameters are out of range.
    #[error("invalid dispersion configuration: {0}")]
    InvalidConfig(String),

    /// Grid construction failed.
    #[error(transparent)]
    Grid(#[from] AirError),
}

impl From<DispersionError> for AirError {
    fn from(err: DispersionError) -> Self {
        match err {
            DispersionError::WindLengthMismatch { .. } | DispersionError::InvalidConfig(_) => {
                AirError::Configuration(err.to_string())
            }
            DispersionError::InvalidWind { .. } => AirError::Validation(err.to_string()),
            DispersionError::Grid(inner) => inner,
        }
    }
}

/// Result type for dispersion operations.
pub type Result<T> = std::result::Result<T, DispersionError>;

//! Error types for interpolation.

use crate::types::InterpolationMethod;
use air_common::AirError;
use serde::Serialize;
use thiserror::Error;

/// One failed attempt inside a fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyFailure {
    pub method: InterpolationMethod,
    pub reason: String,
}

/// Errors that can occur while building a concentration surface.
#[derive(Error, Debug)]
pub enum InterpolationError {
    /// Every sample was dropped as NaN or out of range.
    #[error("no valid samples to interpolate")]
    NoValidSamples,

    /// Requested bounds or resolution cannot produce a grid.
    #[error("invalid grid definition: {0}")]
    InvalidGrid(String),

    /// A linear system was singular or produced non-finite weights.
    #[error("{method} system is singular: {detail}")]
    Singular {
        method: InterpolationMethod,
        detail: String,
    },

    /// The sample geometry does not support the method (e.g. collinear points).
    #[error("{method} cannot use this sample layout: {detail}")]
    Degenerate {
        method: InterpolationMethod,
        detail: String,
    },

    /// Every strategy in the chain failed.
    #[error("all interpolation strategies failed: {}", describe(.0))]
    AllStrategiesFailed(Vec<StrategyFailure>),
}

fn describe(failures: &[StrategyFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.method, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl InterpolationError {
    pub fn singular(method: InterpolationMethod, detail: impl Into<String>) -> Self {
        Self::Singular {
            method,
            detail: detail.into(),
        }
    }

    pub fn degenerate(method: InterpolationMethod, detail: impl Into<String>) -> Self {
        Self::Degenerate {
            method,
            detail: detail.into(),
        }
    }
}

impl From<InterpolationError> for AirError {
    fn from(err: InterpolationError) -> Self {
        match err {
            InterpolationError::NoValidSamples | InterpolationError::InvalidGrid(_) => {
                AirError::Validation(err.to_string())
            }
            _ => AirError::Computation(err.to_string()),
        }
    }
}

impl From<AirError> for InterpolationError {
    fn from(err: AirError) -> Self {
        InterpolationError::InvalidGrid(err.to_string())
    }
}

/// Result type for interpolation operations.
pub type Result<T> = std::result::Result<T, InterpolationError>;

//! Error types for alert generation.

use air_common::AirError;
use thiserror::Error;

/// Errors that can occur while turning exceedances into alerts.
#[derive(Error, Debug)]
pub enum AlertError {
    /// Polygon cannot be stored as a GeoJSON affected area.
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// Neither the polygon nor any station gives a usable coordinate.
    #[error("cannot place alert: {0}")]
    NoCoordinates(String),

    /// Station or user lookup failed.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// The alert store rejected a commit or update.
    #[error("alert store error: {0}")]
    Persistence(String),

    #[error("invalid alert configuration: {0}")]
    InvalidConfig(String),
}

impl From<AlertError> for AirError {
    fn from(err: AlertError) -> Self {
        match err {
            AlertError::Geometry(_) | AlertError::NoCoordinates(_) => AirError::Validation(err.to_string()),
            AlertError::Lookup(_) | AlertError::Persistence(_) => AirError::Persistence(err.to_string()),
            AlertError::InvalidConfig(_) => AirError::Configuration(err.to_string()),
        }
    }
}

/// Result type for alerting operations.
pub type Result<T> = std::result::Result<T, AlertError>;

//! Common types and utilities shared across the air-quality alerting crates.

pub mod artifacts;
pub mod bbox;
pub mod error;
pub mod grid;
pub mod pollutant;
pub mod sample;

pub use artifacts::{ArtifactPaths, ArtifactRequest, ArtifactWriter};
pub use bbox::BoundingBox;
pub use error::{AirError, AirResult};
pub use grid::{ConcentrationGrid, GeoTransform, GridStats, GRID_CRS};
pub use pollutant::{Pollutant, SeverityLevel};
pub use sample::{latest_samples, Reading, Sample, Station, StationId};

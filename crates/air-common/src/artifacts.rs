//! Output capability for grid artifacts (raster, image, metadata sidecar).
//!
//! Interpolation and dispersion hand their grids to an `ArtifactWriter`
//! when one is configured. Writing is best effort: callers log failures and
//! keep going.

use crate::{AirResult, ConcentrationGrid};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to call an artifact set and how to title its visualisation.
#[derive(Debug, Clone)]
pub struct ArtifactRequest {
    /// File stem, e.g. "pm25_interpolation_20241105_080000".
    pub name: String,
    /// Image title.
    pub title: String,
    /// Legend label including units.
    pub legend: String,
}

/// Paths of the files written for one grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub raster: PathBuf,
    pub visualization: PathBuf,
    pub metadata: PathBuf,
}

/// Persists a grid as a georeferenced raster, a rendered image and a JSON
/// metadata sidecar.
pub trait ArtifactWriter: Send + Sync {
    fn save(
        &self,
        grid: &ConcentrationGrid,
        request: &ArtifactRequest,
        metadata: &serde_json::Value,
    ) -> AirResult<ArtifactPaths>;
}

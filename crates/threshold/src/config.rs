//! Configuration for threshold detection.

use std::collections::BTreeMap;

use air_common::Pollutant;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ThresholdError};
use crate::thresholds::{LevelTable, ThresholdTable};

/// Polygons smaller than this (square degrees) after overlay are dropped.
pub const DEFAULT_MIN_POLYGON_AREA_DEG2: f64 = 1e-12;

/// Configuration for the threshold detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Per-entry replacements of the default threshold tables.
    pub threshold_overrides: BTreeMap<Pollutant, LevelTable>,

    /// Visvalingam-Whyatt area tolerance (square degrees) applied to each
    /// emitted polygon; vertices spanning a smaller triangle are removed.
    pub simplify_tolerance: Option<f64>,

    /// Minimum polygon area in square degrees; `None` uses
    /// [`DEFAULT_MIN_POLYGON_AREA_DEG2`].
    pub min_polygon_area_deg2: Option<f64>,
}

impl ThresholdConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("POLYGON_SIMPLIFY_TOLERANCE") {
            if let Ok(tolerance) = val.parse() {
                config.simplify_tolerance = Some(tolerance);
            }
        }

        config
    }

    pub fn min_polygon_area(&self) -> f64 {
        self.min_polygon_area_deg2
            .unwrap_or(DEFAULT_MIN_POLYGON_AREA_DEG2)
    }

    /// Defaults with the configured overrides applied.
    pub fn table(&self) -> ThresholdTable {
        ThresholdTable::default().with_overrides(&self.threshold_overrides)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        for (pollutant, levels) in &self.threshold_overrides {
            for (level, value) in levels {
                if !value.is_finite() {
                    return Err(ThresholdError::InvalidConfig(format!(
                        "threshold for {} at {} is not finite",
                        pollutant, level
                    )));
                }
            }
        }

        if let Some(tolerance) = self.simplify_tolerance {
            if !(tolerance.is_finite() && tolerance >= 0.0) {
                return Err(ThresholdError::InvalidConfig(
                    "simplify_tolerance must be >= 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}

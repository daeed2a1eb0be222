//! Severity-partitioned exceedance detection.

use std::collections::BTreeMap;

use air_common::{ConcentrationGrid, Pollutant, SeverityLevel};
use geo::{Area, BooleanOps, MultiPolygon, Polygon, SimplifyVwPreserve};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::area::{cell_area_km2, polygon_area_km2};
use crate::config::ThresholdConfig;
use crate::error::{Result, ThresholdError};
use crate::thresholds::ThresholdTable;
use crate::vectorize::vectorize;

/// One exceedance polygon (EPSG:4326) with its approximate area.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceedancePolygon {
    pub polygon: Polygon<f64>,
    pub area_km2: f64,
}

/// Area claimed by one severity level for one pollutant.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceedanceSet {
    pub level: SeverityLevel,
    pub pollutant: Pollutant,
    /// `None` when the pollutant's table has no entry for this level.
    pub threshold: Option<f64>,
    pub polygons: Vec<ExceedancePolygon>,
}

impl ExceedanceSet {
    fn empty(pollutant: Pollutant, level: SeverityLevel, threshold: Option<f64>) -> Self {
        Self {
            level,
            pollutant,
            threshold,
            polygons: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn total_area_km2(&self) -> f64 {
        self.polygons.iter().map(|p| p.area_km2).sum()
    }
}

/// Cell statistics for a single level, independent of other levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceedanceStats {
    pub pollutant: Pollutant,
    /// Level actually evaluated (after the `unhealthy` fallback).
    pub level: SeverityLevel,
    pub threshold: f64,
    pub total_cells: usize,
    pub exceeded_cells: usize,
    pub exceedance_percentage: f64,
    /// Sum of exceeding cell areas, each scaled by cos(latitude).
    pub exceeded_area_km2: f64,
    pub max_concentration: Option<f64>,
    pub mean_concentration: Option<f64>,
}

/// Cells strictly above `threshold`. NaN never exceeds.
pub fn exceedance_mask(grid: &ConcentrationGrid, threshold: f64) -> Vec<bool> {
    grid.values().iter().map(|v| *v > threshold).collect()
}

/// Partitions a concentration grid into mutually exclusive severity regions.
///
/// Levels are processed most severe first; each level keeps only the area
/// not already claimed by a more severe one.
///
/// # Example
///
/// ```rust,ignore
/// let detector = ThresholdDetector::new(ThresholdConfig::default());
/// let sets = detector.identify_exceedances(Pollutant::Pm25, &grid);
/// for (level, set) in &sets {
///     println!("{}: {} polygons, {:.1} km²", level, set.polygons.len(), set.total_area_km2());
/// }
/// ```
pub struct ThresholdDetector {
    table: ThresholdTable,
    config: ThresholdConfig,
}

impl ThresholdDetector {
    pub fn new(config: ThresholdConfig) -> Self {
        Self {
            table: config.table(),
            config,
        }
    }

    /// Use an explicit table instead of defaults plus overrides.
    pub fn with_table(mut self, table: ThresholdTable) -> Self {
        self.table = table;
        self
    }

    pub fn table(&self) -> &ThresholdTable {
        &self.table
    }

    /// Mask and statistics for one level.
    ///
    /// A level missing from the pollutant's table is evaluated at that
    /// table's `unhealthy` threshold.
    pub fn detect_exceedance(
        &self,
        pollutant: Pollutant,
        grid: &ConcentrationGrid,
        level: SeverityLevel,
    ) -> Result<(Vec<bool>, ExceedanceStats)> {
        let (level, threshold) = self
            .table
            .threshold_or_unhealthy(pollutant, level)
            .ok_or(ThresholdError::MissingThreshold { pollutant, level })?;

        let mask = exceedance_mask(grid, threshold);
        let transform = grid.transform();

        let mut exceeded_cells = 0usize;
        let mut exceeded_area_km2 = 0.0;
        for (idx, _) in mask.iter().enumerate().filter(|(_, m)| **m) {
            exceeded_cells += 1;
            let row = idx / grid.width();
            exceeded_area_km2 += cell_area_km2(grid.cell_size(), transform.node_y(row));
        }

        let total_cells = mask.len();
        let stats = grid.stats();
        let stats = ExceedanceStats {
            pollutant,
            level,
            threshold,
            total_cells,
            exceeded_cells,
            exceedance_percentage: if total_cells > 0 {
                exceeded_cells as f64 / total_cells as f64 * 100.0
            } else {
                0.0
            },
            exceeded_area_km2,
            max_concentration: stats.map(|s| s.max),
            mean_concentration: stats.map(|s| s.mean),
        };

        debug!(
            pollutant = %pollutant,
            level = %level,
            threshold = threshold,
            exceeded_cells = exceeded_cells,
            "Exceedance mask computed"
        );

        Ok((mask, stats))
    }

    /// Vectorise a mask over the grid.
    ///
    /// Rings follow cell edges exactly; simplification is applied only to
    /// the polygons [`ThresholdDetector::identify_exceedances`] emits.
    pub fn vectorize_mask(&self, mask: &[bool], grid: &ConcentrationGrid) -> Result<Vec<Polygon<f64>>> {
        let expected = grid.width() * grid.height();
        if mask.len() != expected {
            return Err(ThresholdError::MaskMismatch {
                expected,
                actual: mask.len(),
            });
        }

        Ok(vectorize(mask, grid.width(), grid.height(), grid.transform()))
    }

    /// Topology-preserving simplification of an emitted polygon.
    fn simplified(&self, polygon: Polygon<f64>) -> Polygon<f64> {
        match self.config.simplify_tolerance {
            Some(tolerance) if tolerance > 0.0 => polygon.simplify_vw_preserve(&tolerance),
            _ => polygon,
        }
    }

    /// Severity-partitioned exceedance polygons for every alerting level.
    ///
    /// Always returns an entry for each of moderate..hazardous; levels with
    /// no exceedance (or no threshold) have an empty polygon list. Polygon
    /// interiors are pairwise disjoint across levels.
    ///
    /// The overlay runs on the unsimplified cell-edge polygons.
    pub fn identify_exceedances(
        &self,
        pollutant: Pollutant,
        grid: &ConcentrationGrid,
    ) -> BTreeMap<SeverityLevel, ExceedanceSet> {
        let mut result = BTreeMap::new();
        let Some(levels) = self.table.levels_for(pollutant) else {
            warn!(pollutant = %pollutant, "No threshold table available");
            for level in SeverityLevel::most_severe_first() {
                result.insert(level, ExceedanceSet::empty(pollutant, level, None));
            }
            return result;
        };

        let min_area = self.config.min_polygon_area();
        let mut claimed = MultiPolygon::<f64>::new(Vec::new());

        for level in SeverityLevel::most_severe_first() {
            let Some(threshold) = levels.get(&level).copied() else {
                warn!(pollutant = %pollutant, level = %level, "Threshold level not defined");
                result.insert(level, ExceedanceSet::empty(pollutant, level, None));
                continue;
            };

            let mask = exceedance_mask(grid, threshold);
            let raw = match self.vectorize_mask(&mask, grid) {
                Ok(polygons) => MultiPolygon::new(polygons),
                Err(e) => {
                    warn!(pollutant = %pollutant, level = %level, error = %e, "Vectorisation failed");
                    result.insert(level, ExceedanceSet::empty(pollutant, level, Some(threshold)));
                    continue;
                }
            };

            let remaining = if claimed.0.is_empty() || raw.0.is_empty() {
                raw
            } else {
                raw.difference(&claimed)
            };

            let kept: Vec<Polygon<f64>> = remaining
                .into_iter()
                .filter(|p| p.unsigned_area() >= min_area)
                .collect();

            if !kept.is_empty() {
                let produced = MultiPolygon::new(kept.clone());
                claimed = if claimed.0.is_empty() {
                    produced
                } else {
                    claimed.union(&produced)
                };
            }

            let polygons: Vec<ExceedancePolygon> = kept
                .into_iter()
                .map(|polygon| self.simplified(polygon))
                .map(|polygon| ExceedancePolygon {
                    area_km2: polygon_area_km2(&polygon),
                    polygon,
                })
                .collect();

            debug!(
                pollutant = %pollutant,
                level = %level,
                threshold = threshold,
                polygons = polygons.len(),
                "Level processed"
            );

            result.insert(
                level,
                ExceedanceSet {
                    level,
                    pollutant,
                    threshold: Some(threshold),
                    polygons,
                },
            );
        }

        let total: usize = result.values().map(|s| s.polygons.len()).sum();
        info!(pollutant = %pollutant, polygons = total, "Exceedance detection complete");

        result
    }
}

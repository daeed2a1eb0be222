//! Advection-diffusion-decay forecast of a concentration grid.

use std::sync::Arc;

use air_common::{ArtifactPaths, ArtifactRequest, ArtifactWriter, ConcentrationGrid, Pollutant};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::DispersionConfig;
use crate::error::{DispersionError, Result};
use crate::filters::{gaussian_blur, shift_bilinear};

/// Grids of a forecast run and the artifacts written for each step.
#[derive(Debug, Clone)]
pub struct DispersionOutput {
    /// Index 0 is the initial grid.
    pub grids: Vec<ConcentrationGrid>,
    /// One entry per grid; `None` where writing failed or no writer is set.
    pub artifacts: Vec<Option<ArtifactPaths>>,
}

/// Cell displacement `(dx east, dy north)` for one step.
///
/// `direction` is meteorological (where the wind comes from, clockwise from
/// north); the math angle is `(270 - direction) mod 360`.
pub fn displacement_cells(direction: f64, speed: f64, hours_per_step: f64) -> (f64, f64) {
    let angle = (270.0 - direction).rem_euclid(360.0).to_radians();
    let scale = speed * hours_per_step / 3.6;
    (scale * angle.cos(), scale * angle.sin())
}

/// Simulates how a concentration field evolves under a wind series.
///
/// Each step advects the field by the wind displacement (bilinear, zero
/// fill), diffuses it with a Gaussian blur whose width grows with wind
/// speed, then applies the decay factor. The model is a pure function of
/// its inputs.
///
/// # Example
///
/// ```rust,ignore
/// let model = DispersionModel::new(DispersionConfig::default());
/// let wind = generate_wind_forecast(270.0, 3.0, 6.0, 1.0, 42);
/// let grids = model.predict(&grid, &wind.directions, &wind.speeds, 6)?;
/// assert_eq!(grids.len(), 7);
/// ```
pub struct DispersionModel {
    config: DispersionConfig,
    writer: Option<Arc<dyn ArtifactWriter>>,
}

impl DispersionModel {
    pub fn new(config: DispersionConfig) -> Self {
        Self { config, writer: None }
    }

    /// Attach a writer used by [`DispersionModel::predict_and_save`].
    pub fn with_artifact_writer(mut self, writer: Arc<dyn ArtifactWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn config(&self) -> &DispersionConfig {
        &self.config
    }

    /// Advance a grid by one step.
    pub fn step(&self, grid: &ConcentrationGrid, direction: f64, speed: f64) -> Result<ConcentrationGrid> {
        let (width, height) = (grid.width(), grid.height());
        let (dx, dy) = displacement_cells(direction, speed, self.config.hours_per_step);

        let shifted = shift_bilinear(grid.values(), width, height, dx, dy);
        let sigma = self.config.sigma_for(speed);
        let diffused = gaussian_blur(&shifted, width, height, sigma, self.config.kernel_truncate);
        let decayed: Vec<f64> = diffused
            .into_iter()
            .map(|v| v * self.config.decay_factor)
            .collect();

        Ok(grid.with_values(decayed)?)
    }

    /// Forecast `step_count` steps ahead.
    ///
    /// # Arguments
    /// * `initial` - Starting grid; NaN cells are treated as zero concentration
    /// * `directions` - Meteorological wind direction per step (degrees)
    /// * `speeds` - Wind speed per step (m/s)
    /// * `step_count` - Number of steps; both series must have this length
    ///
    /// # Returns
    /// `step_count + 1` grids, index 0 being the (NaN-cleaned) initial grid.
    pub fn predict(
        &self,
        initial: &ConcentrationGrid,
        directions: &[f64],
        speeds: &[f64],
        step_count: usize,
    ) -> Result<Vec<ConcentrationGrid>> {
        self.config.validate()?;
        if directions.len() != step_count || speeds.len() != step_count {
            return Err(DispersionError::WindLengthMismatch {
                directions: directions.len(),
                speeds: speeds.len(),
                steps: step_count,
            });
        }
        for (step, (direction, speed)) in directions.iter().zip(speeds).enumerate() {
            if !direction.is_finite() || !speed.is_finite() || *speed < 0.0 {
                return Err(DispersionError::InvalidWind {
                    step,
                    detail: format!("direction {} speed {}", direction, speed),
                });
            }
        }

        let cleaned: Vec<f64> = initial
            .values()
            .iter()
            .map(|v| if v.is_finite() { *v } else { 0.0 })
            .collect();
        let mut current = initial.with_values(cleaned)?;

        let mut grids = Vec::with_capacity(step_count + 1);
        grids.push(current.clone());
        for (direction, speed) in directions.iter().zip(speeds) {
            current = self.step(&current, *direction, *speed)?;
            grids.push(current.clone());
        }

        debug!(
            steps = step_count,
            initial_mass = grids[0].total_mass(),
            final_mass = current.total_mass(),
            "Dispersion forecast complete"
        );

        Ok(grids)
    }

    /// Forecast and hand every step to the artifact writer.
    ///
    /// Artifacts are named `{pollutant}_dispersion_{timestamp}_initial` and
    /// `..._plus{h}h`. Write failures are logged and leave a `None` entry.
    pub fn predict_and_save(
        &self,
        pollutant: Pollutant,
        initial: &ConcentrationGrid,
        directions: &[f64],
        speeds: &[f64],
        step_count: usize,
    ) -> Result<DispersionOutput> {
        let grids = self.predict(initial, directions, speeds, step_count)?;

        let Some(writer) = self.writer.as_ref() else {
            let artifacts = vec![None; grids.len()];
            return Ok(DispersionOutput { grids, artifacts });
        };

        let prefix = format!(
            "{}_dispersion_{}",
            pollutant.code(),
            Utc::now().format("%Y%m%d_%H%M%S")
        );

        let artifacts: Vec<Option<ArtifactPaths>> = grids
            .iter()
            .enumerate()
            .map(|(i, grid)| {
                let hours = i as f64 * self.config.hours_per_step;
                let suffix = if i == 0 {
                    "initial".to_string()
                } else {
                    format!("plus{}h", hours)
                };
                let request = ArtifactRequest {
                    name: format!("{}_{}", prefix, suffix),
                    title: format!("{} concentration (now + {}h)", pollutant.label(), hours),
                    legend: format!("{} concentration", pollutant.label()),
                };
                let metadata = json!({
                    "pollutant": pollutant.code(),
                    "step": i,
                    "hours_ahead": hours,
                    "wind_direction": i.checked_sub(1).map(|s| directions[s]),
                    "wind_speed": i.checked_sub(1).map(|s| speeds[s]),
                    "decay_factor": self.config.decay_factor,
                    "total_mass": grid.total_mass(),
                    "bounds": grid.bounds(),
                    "crs": grid.crs(),
                });
                match writer.save(grid, &request, &metadata) {
                    Ok(paths) => Some(paths),
                    Err(e) => {
                        warn!(pollutant = %pollutant, step = i, error = %e, "Failed to save dispersion step");
                        None
                    }
                }
            })
            .collect();

        info!(
            pollutant = %pollutant,
            saved = artifacts.iter().filter(|a| a.is_some()).count(),
            steps = grids.len(),
            "Saved dispersion maps"
        );

        Ok(DispersionOutput { grids, artifacts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_westerly_wind_moves_east() {
        let (dx, dy) = displacement_cells(270.0, 3.6, 1.0);
        assert!((dx - 1.0).abs() < 1e-12);
        assert!(dy.abs() < 1e-12);
    }

    #[test]
    fn test_southerly_wind_moves_north() {
        let (dx, dy) = displacement_cells(180.0, 7.2, 1.0);
        assert!(dx.abs() < 1e-12);
        assert!((dy - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_northerly_wind_moves_south() {
        let (_, dy) = displacement_cells(0.0, 3.6, 2.0);
        assert!((dy + 2.0).abs() < 1e-12);
    }
}

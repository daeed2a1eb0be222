//! Sample-to-grid interpolation service.

use std::sync::Arc;

use air_common::{
    ArtifactPaths, ArtifactRequest, ArtifactWriter, BoundingBox, ConcentrationGrid, Pollutant, Sample,
};
use chrono::Utc;
use metrics::counter;
use tracing::{debug, info, warn};

use crate::config::InterpolationConfig;
use crate::error::{InterpolationError, Result, StrategyFailure};
use crate::methods::{evaluate_grid, fit};
use crate::types::{InterpolationMetadata, InterpolationMethod, SamplePoint, ValueSummary};

/// Everything produced by one pollutant interpolation run.
#[derive(Debug, Clone)]
pub struct InterpolationOutput {
    pub grid: ConcentrationGrid,
    pub metadata: InterpolationMetadata,
    /// Written artifact paths, `None` without a writer or when writing failed.
    pub artifacts: Option<ArtifactPaths>,
}

/// Turns irregular station samples into a regular concentration grid.
///
/// Methods are selected by name. A method's fallback chain is tried in
/// order; the first strategy that fits wins and failures along the way are
/// logged and counted.
///
/// # Example
///
/// ```rust,ignore
/// let interpolator = Interpolator::new(InterpolationConfig::default());
/// let (grid, metadata) = interpolator.interpolate(&samples, None, Some("kriging"))?;
/// println!("{} used, {}x{}", metadata.method, grid.width(), grid.height());
/// ```
pub struct Interpolator {
    config: InterpolationConfig,
    writer: Option<Arc<dyn ArtifactWriter>>,
}

impl Interpolator {
    pub fn new(config: InterpolationConfig) -> Self {
        Self { config, writer: None }
    }

    /// Attach a writer used by [`Interpolator::interpolate_pollutant`].
    pub fn with_artifact_writer(mut self, writer: Arc<dyn ArtifactWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    /// Resolve a method name, falling back to the configured default.
    ///
    /// Unknown names (and an unknown configured default) are logged, never
    /// fatal; the last resort is IDW.
    pub fn resolve_method(&self, requested: Option<&str>) -> InterpolationMethod {
        let default = match self.config.default_method.parse::<InterpolationMethod>() {
            Ok(method) => method,
            Err(_) => {
                warn!(
                    default_method = %self.config.default_method,
                    valid = %InterpolationMethod::valid_names(),
                    "Configured default interpolation method is unknown, using idw"
                );
                InterpolationMethod::Idw
            }
        };

        match requested {
            None => default,
            Some(name) => name.parse().unwrap_or_else(|_| {
                warn!(
                    requested = name,
                    fallback = %default,
                    valid = %InterpolationMethod::valid_names(),
                    "Unknown interpolation method, using default"
                );
                default
            }),
        }
    }

    /// Interpolate samples onto a grid.
    ///
    /// # Arguments
    /// * `samples` - Point samples; NaN or non-finite entries are dropped
    /// * `bounds` - Grid bounds; defaults to the sample extent padded by
    ///   `padding_cells` cells
    /// * `method` - Method name; `None` or unknown uses the configured default
    ///
    /// # Errors
    /// `NoValidSamples` if nothing usable remains, `InvalidGrid` for bad
    /// bounds, `AllStrategiesFailed` when every strategy in the chain fails.
    pub fn interpolate(
        &self,
        samples: &[Sample],
        bounds: Option<BoundingBox>,
        method: Option<&str>,
    ) -> Result<(ConcentrationGrid, InterpolationMetadata)> {
        let points: Vec<SamplePoint> = samples
            .iter()
            .filter(|s| s.is_valid())
            .map(SamplePoint::from)
            .collect();

        if points.len() < samples.len() {
            debug!(
                dropped = samples.len() - points.len(),
                kept = points.len(),
                "Dropped invalid samples"
            );
        }
        if points.is_empty() {
            return Err(InterpolationError::NoValidSamples);
        }

        let resolution = self.config.resolution_deg;
        let bounds = match bounds {
            Some(b) => b,
            None => BoundingBox::from_points(points.iter().map(|p| (p.x, p.y)))
                .ok_or(InterpolationError::NoValidSamples)?
                .padded(self.config.padding_cells as f64 * resolution),
        };
        let (width, height, transform) = ConcentrationGrid::lattice_for(&bounds, resolution)?;

        let requested = self.resolve_method(method);
        let mut failures: Vec<StrategyFailure> = Vec::new();

        for strategy in requested.fallback_chain() {
            let model = match fit(strategy, &points, &self.config) {
                Ok(model) => model,
                Err(e) => {
                    warn!(
                        method = %strategy,
                        error = %e,
                        "Interpolation strategy failed"
                    );
                    counter!("interpolation_fallbacks_total").increment(1);
                    failures.push(StrategyFailure {
                        method: strategy,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let values = evaluate_grid(model.as_ref(), width, height, &transform);
            let grid = ConcentrationGrid::new(width, height, values, transform)?;

            let metadata = InterpolationMetadata {
                method: strategy,
                requested_method: requested,
                resolution,
                bounds: grid.bounds(),
                shape: (height, width),
                num_points: points.len(),
                samples: ValueSummary::of(points.iter().map(|p| p.value))
                    .ok_or(InterpolationError::NoValidSamples)?,
                interpolated: ValueSummary::of(grid.values().iter().copied()),
                crs: grid.crs().to_string(),
                timestamp: Utc::now(),
            };

            info!(
                method = %strategy,
                requested = %requested,
                samples = points.len(),
                width = width,
                height = height,
                "Interpolation complete"
            );

            return Ok((grid, metadata));
        }

        Err(InterpolationError::AllStrategiesFailed(failures))
    }

    /// Interpolate one pollutant and hand the grid to the artifact writer.
    ///
    /// Artifact failures are logged and reported as `artifacts: None`.
    pub fn interpolate_pollutant(
        &self,
        pollutant: Pollutant,
        samples: &[Sample],
        bounds: Option<BoundingBox>,
        method: Option<&str>,
    ) -> Result<InterpolationOutput> {
        let (grid, metadata) = self.interpolate(samples, bounds, method)?;

        let artifacts = self.writer.as_ref().and_then(|writer| {
            let request = ArtifactRequest {
                name: format!(
                    "{}_interpolation_{}",
                    pollutant.code(),
                    metadata.timestamp.format("%Y%m%d_%H%M%S")
                ),
                title: format!("{} concentration ({})", pollutant.label(), metadata.method),
                legend: format!("{} concentration", pollutant.label()),
            };
            let sidecar = match serde_json::to_value(&metadata) {
                Ok(mut value) => {
                    value["pollutant"] = serde_json::Value::from(pollutant.code());
                    value
                }
                Err(e) => {
                    warn!(error = %e, "Failed to serialize interpolation metadata");
                    return None;
                }
            };
            match writer.save(&grid, &request, &sidecar) {
                Ok(paths) => {
                    debug!(raster = %paths.raster.display(), "Saved interpolation artifacts");
                    Some(paths)
                }
                Err(e) => {
                    warn!(pollutant = %pollutant, error = %e, "Failed to save interpolation artifacts");
                    None
                }
            }
        });

        Ok(InterpolationOutput {
            grid,
            metadata,
            artifacts,
        })
    }
}

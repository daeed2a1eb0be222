//! Per-pollutant check pipeline.
//!
//! readings → samples → grid → exceedances → alerts, with an optional
//! dispersion forecast whose grids go back through the detector.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use air_common::{
    latest_samples, AirError, AirResult, ArtifactPaths, ArtifactWriter, ConcentrationGrid, Pollutant,
    SeverityLevel,
};
use alerting::{Alert, AlertStore, AlertTrigger, ConstantVulnerability, InMemoryStations, UserLocator};
use chrono::{DateTime, Utc};
use dispersion::{generate_wind_forecast, DispersionModel};
use futures::future::join_all;
use interpolation::{InterpolationOutput, Interpolator};
use metrics::counter;
use renderer::FsArtifactWriter;
use serde::Serialize;
use thiserror::Error;
use threshold::{ExceedanceSet, ThresholdDetector};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::CheckerConfig;
use crate::sources::{ReadingBatch, ReadingSource};

/// Why a pollutant check did not complete.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Air(#[from] AirError),

    #[error("{pollutant} check timed out after {secs}s")]
    TimedOut { pollutant: Pollutant, secs: u64 },

    #[error("{pollutant} check task failed: {reason}")]
    Task { pollutant: Pollutant, reason: String },
}

impl CheckError {
    /// Whether running the same check again later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CheckError::Air(e) => e.is_retryable(),
            CheckError::TimedOut { .. } => true,
            CheckError::Task { .. } => false,
        }
    }
}

/// Exceedance summary for one severity level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSummary {
    pub level: SeverityLevel,
    pub threshold: Option<f64>,
    pub polygons: usize,
    pub area_km2: f64,
}

fn summarize(sets: &BTreeMap<SeverityLevel, ExceedanceSet>) -> Vec<LevelSummary> {
    sets.values()
        .rev()
        .map(|set| LevelSummary {
            level: set.level,
            threshold: set.threshold,
            polygons: set.polygons.len(),
            area_km2: set.total_area_km2(),
        })
        .collect()
}

/// One dispersed forecast grid run back through the detector.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastStep {
    pub hours_ahead: f64,
    pub levels: Vec<LevelSummary>,
    /// Alerts raised for this step; empty unless forecast alerts are enabled.
    pub alerts: Vec<Alert>,
    pub artifacts: Option<ArtifactPaths>,
}

/// Outcome of one pollutant check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub pollutant: Pollutant,
    pub checked_at: DateTime<Utc>,
    pub samples: usize,
    /// Interpolation method actually used.
    pub method: String,
    pub levels: Vec<LevelSummary>,
    pub alerts: Vec<Alert>,
    pub notifications: usize,
    pub artifacts: Option<ArtifactPaths>,
    pub forecast: Vec<ForecastStep>,
}

/// Run a CPU-bound stage on the blocking pool.
async fn blocking<T, F>(pollutant: Pollutant, f: F) -> Result<T, CheckError>
where
    F: FnOnce() -> AirResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CheckError::Task {
            pollutant,
            reason: e.to_string(),
        })?
        .map_err(CheckError::from)
}

/// Wires the pipeline crates together for the batch service.
///
/// Checks for different pollutants run concurrently; checks for the same
/// pollutant are serialised.
pub struct CheckPipeline {
    config: CheckerConfig,
    source: Arc<dyn ReadingSource>,
    users: Arc<dyn UserLocator>,
    store: Arc<dyn AlertStore>,
    interpolator: Arc<Interpolator>,
    detector: Arc<ThresholdDetector>,
    dispersion: Arc<DispersionModel>,
    locks: BTreeMap<Pollutant, Arc<Mutex<()>>>,
}

impl CheckPipeline {
    pub fn new(
        config: CheckerConfig,
        source: Arc<dyn ReadingSource>,
        users: Arc<dyn UserLocator>,
        store: Arc<dyn AlertStore>,
    ) -> Self {
        let writer: Option<Arc<dyn ArtifactWriter>> = config
            .output_dir
            .as_ref()
            .map(|dir| {
                Arc::new(FsArtifactWriter::new(dir.clone()).with_style(config.render)) as Arc<dyn ArtifactWriter>
            });

        let mut interpolator = Interpolator::new(config.interpolation.clone());
        let mut dispersion = DispersionModel::new(config.dispersion.clone());
        if let Some(writer) = writer {
            interpolator = interpolator.with_artifact_writer(writer.clone());
            dispersion = dispersion.with_artifact_writer(writer);
        }

        let locks = Pollutant::ALL
            .iter()
            .map(|p| (*p, Arc::new(Mutex::new(()))))
            .collect();

        Self {
            detector: Arc::new(ThresholdDetector::new(config.threshold.clone())),
            interpolator: Arc::new(interpolator),
            dispersion: Arc::new(dispersion),
            config,
            source,
            users,
            store,
            locks,
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Configured clock override, else the current time.
    pub fn now(&self) -> DateTime<Utc> {
        self.config.as_of.unwrap_or_else(Utc::now)
    }

    /// Fetch once and check every configured pollutant in parallel.
    ///
    /// A failed fetch fails the whole cycle; per-pollutant failures are
    /// returned alongside the successes.
    pub async fn check_all(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(Pollutant, Result<CheckReport, CheckError>)>, CheckError> {
        let batch = Arc::new(self.source.fetch().await?);
        info!(
            source = self.source.name(),
            pollutants = self.config.pollutants.len(),
            stations = batch.stations.len(),
            "Starting check cycle"
        );

        let checks = self.config.pollutants.iter().map(|&pollutant| {
            let batch = batch.clone();
            async move { (pollutant, self.run_guarded(pollutant, &batch, now).await) }
        });
        Ok(join_all(checks).await)
    }

    /// Fetch readings and check one pollutant.
    pub async fn check_pollutant(
        &self,
        pollutant: Pollutant,
        now: DateTime<Utc>,
    ) -> Result<CheckReport, CheckError> {
        let batch = self.source.fetch().await?;
        self.run_guarded(pollutant, &batch, now).await
    }

    /// Start a check in the background.
    pub fn spawn_check(self: &Arc<Self>, pollutant: Pollutant) -> JoinHandle<Result<CheckReport, CheckError>> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let now = pipeline.now();
            pipeline.check_pollutant(pollutant, now).await
        })
    }

    /// Run every cycle until the process is stopped.
    pub async fn run_forever(&self) {
        loop {
            match self.check_all(self.now()).await {
                Ok(results) => {
                    for (pollutant, result) in results {
                        if let Err(e) = result {
                            error!(pollutant = %pollutant, error = %e, retryable = e.is_retryable(), "Check failed");
                        }
                    }
                }
                Err(e) => error!(error = %e, retryable = e.is_retryable(), "Check cycle failed"),
            }

            info!(interval_secs = self.config.poll_interval_secs, "Sleeping until next cycle");
            tokio::time::sleep(Duration::from_secs(self.config.poll_interval_secs)).await;
        }
    }

    /// Take the pollutant's lock and apply the configured timeout.
    ///
    /// Batches committed before a timeout stay committed.
    async fn run_guarded(
        &self,
        pollutant: Pollutant,
        batch: &ReadingBatch,
        now: DateTime<Utc>,
    ) -> Result<CheckReport, CheckError> {
        let lock = self
            .locks
            .get(&pollutant)
            .cloned()
            .unwrap_or_else(|| Arc::new(Mutex::new(())));
        let _guard = lock.lock().await;

        let result = match self.config.check_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), self.run(pollutant, batch, now))
                .await
                .unwrap_or_else(|_| {
                    counter!("checks_timed_out_total", "pollutant" => pollutant.code()).increment(1);
                    Err(CheckError::TimedOut { pollutant, secs })
                }),
            None => self.run(pollutant, batch, now).await,
        };

        if result.is_ok() {
            counter!("checks_completed_total", "pollutant" => pollutant.code()).increment(1);
        }
        result
    }

    fn trigger_for(&self, batch: &ReadingBatch) -> AlertTrigger {
        let stations = Arc::new(InMemoryStations::new(batch.stations.clone(), batch.readings.clone()));
        let trigger = AlertTrigger::new(self.config.alerts.clone(), stations, self.users.clone(), self.store.clone());
        match self.config.vulnerability {
            Some(v) => trigger.with_vulnerability_index(Arc::new(ConstantVulnerability(v))),
            None => trigger,
        }
    }

    #[instrument(skip(self, batch, now), fields(pollutant = %pollutant))]
    async fn run(
        &self,
        pollutant: Pollutant,
        batch: &ReadingBatch,
        now: DateTime<Utc>,
    ) -> Result<CheckReport, CheckError> {
        let samples = latest_samples(pollutant, &batch.stations, &batch.readings);
        if samples.is_empty() {
            warn!("No samples for pollutant");
            return Err(AirError::validation(format!("no {} readings found", pollutant)).into());
        }
        let sample_count = samples.len();

        let interpolator = self.interpolator.clone();
        let bounds = self.config.bounds;
        let method = self.config.method.clone();
        let InterpolationOutput {
            grid,
            metadata,
            artifacts,
        } = blocking(pollutant, move || {
            interpolator
                .interpolate_pollutant(pollutant, &samples, bounds, method.as_deref())
                .map_err(AirError::from)
        })
        .await?;

        let detector = self.detector.clone();
        let (grid, sets) = blocking(pollutant, move || {
            let sets = detector.identify_exceedances(pollutant, &grid);
            Ok((grid, sets))
        })
        .await?;

        let trigger = self.trigger_for(batch);
        let records = trigger
            .process_exceedances_at(pollutant, &sets, now)
            .await
            .map_err(AirError::from)?;
        let notifications = records.iter().map(|r| r.notifications.len()).sum();
        let mut alerts: Vec<Alert> = records.into_iter().map(|r| r.alert).collect();

        if let Err(e) = trigger.prioritize_alerts(&mut alerts).await {
            warn!(error = %e, "Failed to prioritise alerts");
        }

        let forecast = if self.config.forecast.enabled {
            self.forecast(pollutant, grid, batch, now).await?
        } else {
            Vec::new()
        };

        let report = CheckReport {
            pollutant,
            checked_at: now,
            samples: sample_count,
            method: metadata.method.to_string(),
            levels: summarize(&sets),
            alerts,
            notifications,
            artifacts,
            forecast,
        };

        info!(
            samples = report.samples,
            method = %report.method,
            alerts = report.alerts.len(),
            notifications = report.notifications,
            forecast_steps = report.forecast.len(),
            "Check complete"
        );
        Ok(report)
    }

    /// Disperse the current grid and detect exceedances at each future step.
    async fn forecast(
        &self,
        pollutant: Pollutant,
        grid: ConcentrationGrid,
        batch: &ReadingBatch,
        now: DateTime<Utc>,
    ) -> Result<Vec<ForecastStep>, CheckError> {
        let settings = self.config.forecast.clone();
        let hours_per_step = self.dispersion.config().hours_per_step;
        let wind = generate_wind_forecast(
            settings.base_direction,
            settings.base_speed,
            settings.hours,
            hours_per_step,
            settings.seed,
        );
        debug!(steps = wind.len(), "Generated wind forecast");

        let dispersion = self.dispersion.clone();
        let detector = self.detector.clone();
        let detected = blocking(pollutant, move || {
            let output = dispersion
                .predict_and_save(pollutant, &grid, &wind.directions, &wind.speeds, wind.len())
                .map_err(AirError::from)?;
            Ok(output
                .grids
                .iter()
                .zip(output.artifacts)
                .enumerate()
                .skip(1)
                .map(|(step, (future, artifacts))| {
                    let sets = detector.identify_exceedances(pollutant, future);
                    (step as f64 * hours_per_step, sets, artifacts)
                })
                .collect::<Vec<_>>())
        })
        .await?;

        let mut steps = Vec::with_capacity(detected.len());
        for (hours_ahead, sets, artifacts) in detected {
            let alerts = if settings.raise_alerts {
                self.trigger_for(batch)
                    .with_alert_type("forecast")
                    .with_lead_hours(hours_ahead)
                    .process_exceedances_at(pollutant, &sets, now)
                    .await
                    .map_err(AirError::from)?
                    .into_iter()
                    .map(|r| r.alert)
                    .collect()
            } else {
                Vec::new()
            };

            let levels = summarize(&sets);
            debug!(
                hours_ahead,
                polygons = levels.iter().map(|l| l.polygons).sum::<usize>(),
                alerts = alerts.len(),
                "Forecast step evaluated"
            );
            steps.push(ForecastStep {
                hours_ahead,
                levels,
                alerts,
                artifacts,
            });
        }

        Ok(steps)
    }
}

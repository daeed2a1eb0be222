//! Alert checker configuration.
//!
//! One YAML document combines the per-crate configurations with the
//! service's own settings. `${VAR}` and `${VAR:-default}` are expanded
//! before parsing, then environment overrides are applied.

use std::path::{Path, PathBuf};

use air_common::{BoundingBox, Pollutant, Reading, Station};
use alerting::AlertConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dispersion::DispersionConfig;
use interpolation::InterpolationConfig;
use renderer::RenderStyle;
use serde::{Deserialize, Serialize};
use threshold::ThresholdConfig;

/// Top-level alert checker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Pollutants checked on every cycle.
    pub pollutants: Vec<Pollutant>,

    /// Where readings come from.
    pub source: SourceConfig,

    /// JSON file with the user list; no users when unset.
    pub users_file: Option<PathBuf>,

    /// Artifact directory; artifacts are skipped when unset.
    pub output_dir: Option<PathBuf>,

    /// Interpolation method name; `None` uses the interpolator default.
    pub method: Option<String>,

    /// Fixed grid bounds; `None` derives them from the samples.
    pub bounds: Option<BoundingBox>,

    /// Per-pollutant check timeout in seconds.
    pub check_timeout_secs: Option<u64>,

    /// Seconds between cycles in continuous mode.
    pub poll_interval_secs: u64,

    /// Vulnerability applied to every alert when prioritising.
    pub vulnerability: Option<f64>,

    /// Clock override for replaying archived readings.
    pub as_of: Option<DateTime<Utc>>,

    pub forecast: ForecastConfig,
    pub render: RenderStyle,
    pub interpolation: InterpolationConfig,
    pub threshold: ThresholdConfig,
    pub dispersion: DispersionConfig,
    pub alerts: AlertConfig,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            pollutants: vec![Pollutant::Pm25],
            source: SourceConfig::default(),
            users_file: None,
            output_dir: None,
            method: None,
            bounds: None,
            check_timeout_secs: None,
            poll_interval_secs: 3600,
            vulnerability: None,
            as_of: None,
            forecast: ForecastConfig::default(),
            render: RenderStyle::default(),
            interpolation: InterpolationConfig::default(),
            threshold: ThresholdConfig::default(),
            dispersion: DispersionConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

/// Reading source selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A JSON document `{"stations": [...], "readings": [...]}`.
    JsonFile { path: PathBuf },

    /// Stations and readings listed inline.
    Static {
        #[serde(default)]
        stations: Vec<Station>,
        #[serde(default)]
        readings: Vec<Reading>,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Static {
            stations: Vec::new(),
            readings: Vec::new(),
        }
    }
}

/// Dispersion forecast branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub enabled: bool,

    /// Wind direction (degrees, blowing from) at the first step.
    pub base_direction: f64,

    /// Wind speed (m/s) at the first step.
    pub base_speed: f64,

    /// Forecast horizon in hours.
    pub hours: f64,

    /// Seed for the synthetic wind series.
    pub seed: u64,

    /// Raise alerts for forecast exceedances, not just report them.
    pub raise_alerts: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_direction: 270.0,
            base_speed: 3.0,
            hours: 6.0,
            seed: 42,
            raise_alerts: false,
        }
    }
}

impl CheckerConfig {
    /// Load a YAML file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        let mut config = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path.as_ref()))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document with variable expansion.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }

    /// Defaults plus environment overrides, for running without a file.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            interpolation: InterpolationConfig::from_env(),
            threshold: ThresholdConfig::from_env(),
            dispersion: DispersionConfig::from_env(),
            alerts: AlertConfig::from_env(),
            ..Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("POLLUTANTS") {
            let parsed: Vec<Pollutant> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if !parsed.is_empty() {
                self.pollutants = parsed;
            }
        }

        if let Ok(val) = std::env::var("READINGS_FILE") {
            self.source = SourceConfig::JsonFile { path: val.into() };
        }

        if let Ok(val) = std::env::var("USERS_FILE") {
            self.users_file = Some(val.into());
        }

        if let Ok(val) = std::env::var("OUTPUT_DIR") {
            self.output_dir = Some(val.into());
        }

        if let Ok(val) = std::env::var("CHECK_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.check_timeout_secs = Some(secs);
            }
        }

        if let Ok(val) = std::env::var("FORECAST_ENABLED") {
            self.forecast.enabled = val == "true" || val == "1";
        }
    }

    /// Validate the service settings and every nested configuration.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.pollutants.is_empty(), "At least one pollutant must be configured");
        anyhow::ensure!(self.poll_interval_secs > 0, "poll_interval_secs must be > 0");
        anyhow::ensure!(self.render.pixels_per_cell > 0, "render.pixels_per_cell must be > 0");

        if let Some(bounds) = self.bounds {
            anyhow::ensure!(bounds.is_valid(), "Configured bounds are invalid: {:?}", bounds);
        }

        if let Some(v) = self.vulnerability {
            anyhow::ensure!((0.0..=100.0).contains(&v), "vulnerability must be within [0, 100]");
        }

        if self.forecast.enabled {
            anyhow::ensure!(
                self.forecast.hours.is_finite() && self.forecast.hours > 0.0,
                "forecast.hours must be > 0"
            );
            anyhow::ensure!(
                self.forecast.base_speed.is_finite() && self.forecast.base_speed >= 0.0,
                "forecast.base_speed must be >= 0"
            );
        }

        self.interpolation
            .validate()
            .map_err(|e| anyhow::anyhow!("interpolation: {}", e))?;
        self.threshold.validate().context("threshold")?;
        self.dispersion.validate().context("dispersion")?;
        self.alerts.validate().context("alerts")?;
        Ok(())
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed variable substitution: ${{{}", after))?;
        result.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr)),
    }
}

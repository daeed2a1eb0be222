//! Configuration for alert generation.

use std::collections::BTreeMap;

use air_common::{Pollutant, SeverityLevel};
use serde::{Deserialize, Serialize};

use crate::error::{AlertError, Result};

/// Configuration for the alert trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Rank per severity level; missing levels use
    /// [`SeverityLevel::default_rank`].
    pub severity_ranks: BTreeMap<SeverityLevel, u8>,

    /// Hours until a new alert expires.
    pub alert_expiry_hours: f64,

    /// Impact radius per severity rank, in km.
    pub radius_per_level_km: f64,

    /// How far back station readings count towards `current_value`.
    pub station_window_hours: f64,

    /// Alerts per store commit.
    pub batch_size: usize,

    /// Template names keyed by `{pollutant}_{level}`, e.g. `pm25_unhealthy`.
    pub message_templates: BTreeMap<String, String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            severity_ranks: BTreeMap::new(),
            alert_expiry_hours: 6.0,
            radius_per_level_km: 2.5,
            station_window_hours: 1.0,
            batch_size: 50,
            message_templates: BTreeMap::new(),
        }
    }
}

impl AlertConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ALERT_EXPIRY_HOURS") {
            if let Ok(hours) = val.parse() {
                config.alert_expiry_hours = hours;
            }
        }

        if let Ok(val) = std::env::var("ALERT_BATCH_SIZE") {
            if let Ok(size) = val.parse() {
                config.batch_size = size;
            }
        }

        if let Ok(val) = std::env::var("STATION_WINDOW_HOURS") {
            if let Ok(hours) = val.parse() {
                config.station_window_hours = hours;
            }
        }

        config
    }

    pub fn rank_for(&self, level: SeverityLevel) -> u8 {
        self.severity_ranks
            .get(&level)
            .copied()
            .unwrap_or_else(|| level.default_rank())
    }

    /// Configured template for a pollutant and level, else `default_alert`.
    pub fn message_template(&self, pollutant: Pollutant, level: SeverityLevel) -> String {
        let key = format!("{}_{}", pollutant.code(), level.name());
        self.message_templates
            .get(&key)
            .cloned()
            .unwrap_or_else(|| "default_alert".to_string())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(AlertError::InvalidConfig("batch_size must be > 0".to_string()));
        }

        if !(self.alert_expiry_hours.is_finite() && self.alert_expiry_hours > 0.0) {
            return Err(AlertError::InvalidConfig(
                "alert_expiry_hours must be > 0".to_string(),
            ));
        }

        if !(self.station_window_hours.is_finite() && self.station_window_hours >= 0.0) {
            return Err(AlertError::InvalidConfig(
                "station_window_hours must be >= 0".to_string(),
            ));
        }

        if !(self.radius_per_level_km.is_finite() && self.radius_per_level_km >= 0.0) {
            return Err(AlertError::InvalidConfig(
                "radius_per_level_km must be >= 0".to_string(),
            ));
        }

        Ok(())
    }
}

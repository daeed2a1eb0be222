//! Configuration for the dispersion model.

use serde::{Deserialize, Serialize};

use crate::error::{DispersionError, Result};

/// Configuration for the dispersion model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispersionConfig {
    /// Hours simulated by one step.
    pub hours_per_step: f64,

    /// Multiplicative decay applied after each step.
    pub decay_factor: f64,

    /// Blur sigma (cells) at zero wind.
    pub diffusion_base: f64,

    /// Additional blur sigma (cells) per m/s of wind.
    pub diffusion_per_speed: f64,

    /// Blur kernel radius in standard deviations.
    pub kernel_truncate: f64,
}

impl Default for DispersionConfig {
    fn default() -> Self {
        Self {
            hours_per_step: 1.0,
            decay_factor: 0.95,
            diffusion_base: 1.0,
            diffusion_per_speed: 0.2,
            kernel_truncate: 4.0,
        }
    }
}

impl DispersionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("DISPERSION_HOURS_PER_STEP") {
            if let Ok(hours) = val.parse() {
                config.hours_per_step = hours;
            }
        }

        if let Ok(val) = std::env::var("DISPERSION_DECAY_FACTOR") {
            if let Ok(decay) = val.parse() {
                config.decay_factor = decay;
            }
        }

        config
    }

    /// Blur sigma in cells for a wind speed in m/s.
    pub fn sigma_for(&self, speed: f64) -> f64 {
        self.diffusion_base + self.diffusion_per_speed * speed
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.hours_per_step.is_finite() && self.hours_per_step > 0.0) {
            return Err(DispersionError::InvalidConfig(
                "hours_per_step must be > 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.decay_factor) {
            return Err(DispersionError::InvalidConfig(
                "decay_factor must be within [0, 1]".to_string(),
            ));
        }

        if !(self.kernel_truncate.is_finite() && self.kernel_truncate > 0.0) {
            return Err(DispersionError::InvalidConfig(
                "kernel_truncate must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

//! Configuration for the interpolator.

use crate::types::RbfKernel;
use serde::{Deserialize, Serialize};

/// Configuration for the interpolator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Grid cell size in degrees.
    pub resolution_deg: f64,

    /// Method used when none (or an unknown one) is requested.
    pub default_method: String,

    /// Power parameter for inverse distance weighting.
    pub idw_power: f64,

    /// Kernel for radial basis interpolation.
    pub rbf_kernel: RbfKernel,

    /// Cells of padding around the sample extent when no bounds are given.
    pub padding_cells: usize,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            resolution_deg: 0.01,
            default_method: "idw".to_string(),
            idw_power: 2.0,
            rbf_kernel: RbfKernel::Multiquadric,
            padding_cells: 10,
        }
    }
}

impl InterpolationConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("CELL_SIZE") {
            if let Ok(size) = val.parse() {
                config.resolution_deg = size;
            }
        }

        if let Ok(val) = std::env::var("INTERPOLATION_METHOD") {
            config.default_method = val;
        }

        if let Ok(val) = std::env::var("IDW_POWER") {
            if let Ok(power) = val.parse() {
                config.idw_power = power;
            }
        }

        if let Ok(val) = std::env::var("RBF_FUNCTION") {
            if let Ok(kernel) = val.parse() {
                config.rbf_kernel = kernel;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.resolution_deg.is_finite() && self.resolution_deg > 0.0) {
            return Err("resolution_deg must be > 0".to_string());
        }

        if !(self.idw_power.is_finite() && self.idw_power > 0.0) {
            return Err("idw_power must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = InterpolationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolution_deg, 0.01);
        assert_eq!(config.idw_power, 2.0);
        assert_eq!(config.padding_cells, 10);
    }

    #[test]
    fn test_validate_rejects_zero_resolution() {
        let config = InterpolationConfig {
            resolution_deg: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_like_json_uses_defaults() {
        let config: InterpolationConfig =
            serde_json::from_str(r#"{"idw_power": 3.0, "rbf_kernel": "gaussian"}"#).unwrap();
        assert_eq!(config.idw_power, 3.0);
        assert_eq!(config.rbf_kernel, RbfKernel::Gaussian);
        assert_eq!(config.default_method, "idw");
    }
}

//! Core types for interpolation.

use air_common::{BoundingBox, Sample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interpolation method, selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Inverse distance weighting.
    Idw,
    /// Radial basis functions.
    Rbf,
    /// Barycentric interpolation on a Delaunay triangulation.
    Linear,
    /// Cubic Bézier patches on a Delaunay triangulation.
    Cubic,
    /// Value of the nearest sample.
    Nearest,
    /// Ordinary kriging with a linear variogram.
    Kriging,
}

impl InterpolationMethod {
    pub const ALL: [InterpolationMethod; 6] = [
        InterpolationMethod::Idw,
        InterpolationMethod::Rbf,
        InterpolationMethod::Linear,
        InterpolationMethod::Cubic,
        InterpolationMethod::Nearest,
        InterpolationMethod::Kriging,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InterpolationMethod::Idw => "idw",
            InterpolationMethod::Rbf => "rbf",
            InterpolationMethod::Linear => "linear",
            InterpolationMethod::Cubic => "cubic",
            InterpolationMethod::Nearest => "nearest",
            InterpolationMethod::Kriging => "kriging",
        }
    }

    /// Strategies attempted, in order, when this method is requested.
    pub fn fallback_chain(&self) -> Vec<InterpolationMethod> {
        match self {
            InterpolationMethod::Kriging => vec![InterpolationMethod::Kriging, InterpolationMethod::Rbf],
            other => vec![*other],
        }
    }

    /// Comma separated list of valid names, for log messages.
    pub fn valid_names() -> String {
        Self::ALL.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InterpolationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "idw" => Ok(Self::Idw),
            "rbf" => Ok(Self::Rbf),
            "linear" => Ok(Self::Linear),
            "cubic" => Ok(Self::Cubic),
            "nearest" => Ok(Self::Nearest),
            "kriging" => Ok(Self::Kriging),
            other => Err(format!("unknown interpolation method '{}'", other)),
        }
    }
}

/// Radial basis kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RbfKernel {
    Multiquadric,
    Inverse,
    Gaussian,
    Linear,
    Cubic,
    Quintic,
    ThinPlate,
}

impl Default for RbfKernel {
    fn default() -> Self {
        Self::Multiquadric
    }
}

impl RbfKernel {
    /// Kernel value at distance `r` with shape parameter `epsilon`.
    pub fn apply(&self, r: f64, epsilon: f64) -> f64 {
        let scaled = r / epsilon;
        match self {
            RbfKernel::Multiquadric => (scaled * scaled + 1.0).sqrt(),
            RbfKernel::Inverse => 1.0 / (scaled * scaled + 1.0).sqrt(),
            RbfKernel::Gaussian => (-(scaled * scaled)).exp(),
            RbfKernel::Linear => r,
            RbfKernel::Cubic => r.powi(3),
            RbfKernel::Quintic => r.powi(5),
            RbfKernel::ThinPlate => {
                if r <= 0.0 {
                    0.0
                } else {
                    r * r * r.ln()
                }
            }
        }
    }
}

impl FromStr for RbfKernel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multiquadric" => Ok(Self::Multiquadric),
            "inverse" | "inverse_multiquadric" => Ok(Self::Inverse),
            "gaussian" => Ok(Self::Gaussian),
            "linear" => Ok(Self::Linear),
            "cubic" => Ok(Self::Cubic),
            "quintic" => Ok(Self::Quintic),
            "thin_plate" => Ok(Self::ThinPlate),
            other => Err(format!("unknown RBF kernel '{}'", other)),
        }
    }
}

/// A validated sample projected to planar (lon, lat) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl SamplePoint {
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

impl From<&Sample> for SamplePoint {
    fn from(sample: &Sample) -> Self {
        Self {
            x: sample.longitude,
            y: sample.latitude,
            value: sample.value,
        }
    }
}

/// Min/max/mean of a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl ValueSummary {
    /// Summary of finite values, `None` if there are none.
    pub fn of<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut n = 0usize;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            n += 1;
        }
        (n > 0).then(|| Self {
            min,
            max,
            mean: sum / n as f64,
        })
    }
}

/// Description of one interpolation run, written as the metadata sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationMetadata {
    /// Method that produced the grid.
    pub method: InterpolationMethod,
    /// Method that was asked for (after name resolution).
    pub requested_method: InterpolationMethod,
    pub resolution: f64,
    pub bounds: BoundingBox,
    /// (rows, cols)
    pub shape: (usize, usize),
    pub num_points: usize,
    pub samples: ValueSummary,
    /// `None` when every node is outside the method's support.
    pub interpolated: Option<ValueSummary>,
    pub crs: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names_round_trip() {
        for method in InterpolationMethod::ALL {
            assert_eq!(method.name().parse::<InterpolationMethod>().unwrap(), method);
        }
        assert!("spline".parse::<InterpolationMethod>().is_err());
    }

    #[test]
    fn test_kriging_falls_back_to_rbf() {
        assert_eq!(
            InterpolationMethod::Kriging.fallback_chain(),
            vec![InterpolationMethod::Kriging, InterpolationMethod::Rbf]
        );
        assert_eq!(InterpolationMethod::Idw.fallback_chain(), vec![InterpolationMethod::Idw]);
    }

    #[test]
    fn test_kernels_at_zero() {
        assert_eq!(RbfKernel::Multiquadric.apply(0.0, 2.0), 1.0);
        assert_eq!(RbfKernel::Inverse.apply(0.0, 2.0), 1.0);
        assert_eq!(RbfKernel::Gaussian.apply(0.0, 2.0), 1.0);
        assert_eq!(RbfKernel::ThinPlate.apply(0.0, 2.0), 0.0);
        assert_eq!(RbfKernel::Cubic.apply(2.0, 1.0), 8.0);
    }

    #[test]
    fn test_value_summary_skips_nan() {
        let summary = ValueSummary::of(vec![1.0, f64::NAN, 5.0]).unwrap();
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.mean, 3.0);
        assert!(ValueSummary::of(vec![f64::NAN]).is_none());
    }
}

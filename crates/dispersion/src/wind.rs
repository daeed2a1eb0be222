//! Wind series and the seeded synthetic forecast generator.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Standard deviation of the per-step direction change, degrees.
pub const DIRECTION_JITTER_DEG: f64 = 15.0;

/// Standard deviation of the per-step speed change, m/s.
pub const SPEED_JITTER_MS: f64 = 0.5;

/// Lowest speed the generator produces, m/s.
pub const MIN_SPEED_MS: f64 = 0.5;

/// Per-step meteorological wind (direction the wind blows from, degrees
/// clockwise from north; speed in m/s).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindForecast {
    pub directions: Vec<f64>,
    pub speeds: Vec<f64>,
}

impl WindForecast {
    /// Constant wind for `steps` steps.
    pub fn constant(direction: f64, speed: f64, steps: usize) -> Self {
        Self {
            directions: vec![direction; steps],
            speeds: vec![speed; steps],
        }
    }

    pub fn len(&self) -> usize {
        self.directions.len().min(self.speeds.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Random-walk wind series for demos and tests.
///
/// Produces `floor(hours / hours_per_step)` steps. Each step adds
/// N(0, 15°) to the direction (wrapped to [0, 360)) and N(0, 0.5 m/s) to the
/// speed, floored at 0.5 m/s. The same seed always gives the same series.
pub fn generate_wind_forecast(
    base_direction: f64,
    base_speed: f64,
    hours: f64,
    hours_per_step: f64,
    seed: u64,
) -> WindForecast {
    let steps = if hours_per_step > 0.0 && hours.is_finite() && hours > 0.0 {
        (hours / hours_per_step).floor() as usize
    } else {
        0
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let (Ok(dir_noise), Ok(speed_noise)) = (
        Normal::new(0.0, DIRECTION_JITTER_DEG),
        Normal::new(0.0, SPEED_JITTER_MS),
    ) else {
        return WindForecast::default();
    };

    let mut direction = base_direction;
    let mut speed = base_speed;
    let mut forecast = WindForecast {
        directions: Vec::with_capacity(steps),
        speeds: Vec::with_capacity(steps),
    };

    for _ in 0..steps {
        direction = (direction + dir_noise.sample(&mut rng)).rem_euclid(360.0);
        speed = (speed + speed_noise.sample(&mut rng)).max(MIN_SPEED_MS);
        forecast.directions.push(direction);
        forecast.speeds.push(speed);
    }

    forecast
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_series() {
        let a = generate_wind_forecast(270.0, 3.0, 48.0, 1.0, 42);
        let b = generate_wind_forecast(270.0, 3.0, 48.0, 1.0, 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 48);
    }

    #[test]
    fn test_different_seed_differs() {
        let a = generate_wind_forecast(270.0, 3.0, 12.0, 1.0, 1);
        let b = generate_wind_forecast(270.0, 3.0, 12.0, 1.0, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_bounds_hold() {
        let forecast = generate_wind_forecast(355.0, 0.6, 200.0, 1.0, 7);
        assert!(forecast.directions.iter().all(|d| (0.0..360.0).contains(d)));
        assert!(forecast.speeds.iter().all(|s| *s >= MIN_SPEED_MS));
    }

    #[test]
    fn test_step_count_uses_hours_per_step() {
        assert_eq!(generate_wind_forecast(0.0, 1.0, 7.0, 3.0, 0).len(), 2);
        assert!(generate_wind_forecast(0.0, 1.0, 0.0, 1.0, 0).is_empty());
    }
}

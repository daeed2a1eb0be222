//! Short-range forecast of concentration grids.
//!
//! Each step of [`DispersionModel::predict`]:
//!
//! ```text
//! grid ──► shift (dx east, dy north; bilinear, zero fill)
//!      ──► gaussian blur (sigma = base + k·speed, reflected edges)
//!      ──► × decay_factor
//! ```
//!
//! Wind series can be supplied directly or synthesised with
//! [`generate_wind_forecast`].

pub mod config;
pub mod error;
pub mod filters;
pub mod model;
pub mod plume;
pub mod wind;

pub use config::DispersionConfig;
pub use error::{DispersionError, Result};
pub use model::{displacement_cells, DispersionModel, DispersionOutput};
pub use plume::GaussianPlume;
pub use wind::{generate_wind_forecast, WindForecast};

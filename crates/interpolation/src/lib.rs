//! Interpolation of sparse station samples onto regular concentration grids.
//!
//! # Architecture
//!
//! ```text
//! samples ──► drop invalid ──► bounds (padded extent) ──► lattice
//!                                                          │
//!        method name ──► fallback chain ──► fit model ─────┤
//!                          (kriging → rbf)                 ▼
//!                                                evaluate nodes (rayon)
//!                                                          │
//!                                                          ▼
//!                                     ConcentrationGrid + InterpolationMetadata
//! ```
//!
//! # Example
//!
//! ```ignore
//! use interpolation::{InterpolationConfig, Interpolator};
//!
//! let interpolator = Interpolator::new(InterpolationConfig::from_env());
//! let (grid, metadata) = interpolator.interpolate(&samples, None, Some("idw"))?;
//! ```

pub mod config;
pub mod error;
pub mod interpolator;
pub mod methods;
pub mod types;

pub use config::InterpolationConfig;
pub use error::{InterpolationError, Result, StrategyFailure};
pub use interpolator::{InterpolationOutput, Interpolator};
pub use methods::SurfaceModel;
pub use types::{InterpolationMetadata, InterpolationMethod, RbfKernel, SamplePoint, ValueSummary};

//! Threshold exceedance detection.
//!
//! Turns a concentration grid into severity-partitioned polygons:
//!
//! ```text
//! grid ──► mask (value > threshold) ──► 4-connected components
//!                                            │
//!                                            ▼
//!                          boundary rings (holes kept, collinear removed)
//!                                            │
//!   most severe first:  minus area claimed by more severe levels
//!                                            │
//!                                            ▼
//!                   { level → ExceedanceSet { polygons + area_km2 } }
//! ```

pub mod area;
pub mod config;
pub mod detector;
pub mod error;
pub mod thresholds;
pub mod vectorize;

pub use area::{polygon_area_km2, KM_PER_DEGREE};
pub use config::ThresholdConfig;
pub use detector::{exceedance_mask, ExceedancePolygon, ExceedanceSet, ExceedanceStats, ThresholdDetector};
pub use error::{Result, ThresholdError};
pub use thresholds::{LevelTable, ThresholdTable};

//! Batch air-quality checker.
//!
//! Fetches station readings, interpolates each configured pollutant,
//! detects exceedances, optionally forecasts their movement and raises
//! alerts for affected users.

pub mod config;
pub mod pipeline;
pub mod sources;

pub use config::{CheckerConfig, ForecastConfig, SourceConfig};
pub use pipeline::{CheckError, CheckPipeline, CheckReport, ForecastStep, LevelSummary};
pub use sources::{create_source, load_users, JsonFileSource, ReadingBatch, ReadingSource, StaticSource};

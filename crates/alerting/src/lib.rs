//! Alert generation from exceedance polygons.
//!
//! ```text
//! {level → ExceedanceSet}  (most severe first)
//!        │  per polygon
//!        ▼
//!   stations in area ──► currentValue (max in window), centre fallbacks
//!        │
//!        ▼
//!   Alert (GeoJSON area, or 0.05° circle if the polygon is unusable)
//!        │
//!        ▼
//!   home ∪ work users ──► pending Notifications
//!        │
//!        ▼
//!   AlertStore::commit every `batch_size` records + final flush
//! ```
//!
//! External systems plug in through [`StationQuery`], [`UserLocator`],
//! [`AlertStore`] and [`VulnerabilityIndex`]; [`memory`] has in-process
//! implementations.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod geometry;
pub mod memory;
pub mod models;
pub mod trigger;

pub use collaborators::{AlertStore, AreaMaximum, StationQuery, UserLocator, VulnerabilityIndex};
pub use config::AlertConfig;
pub use error::{AlertError, Result};
pub use geometry::AffectedArea;
pub use memory::{ConstantVulnerability, InMemoryAlertStore, InMemoryStations, InMemoryUsers};
pub use models::{Alert, AlertRecord, Location, LocationKind, NaturalKey, Notification, User, UserId};
pub use trigger::AlertTrigger;

//! Alert, notification and user records.

use air_common::{Pollutant, SeverityLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::AffectedArea;

/// Identifier of an end user.
pub type UserId = i64;

/// Size in degrees of the cells used by [`Alert::natural_key`].
pub const NATURAL_KEY_CELL_DEG: f64 = 0.1;

/// A pollution alert raised for one exceedance polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    /// Always "pollution".
    pub alert_type: String,
    pub pollutant: Pollutant,
    /// Rank on the 0-5 scale.
    pub severity_level: u8,
    pub level_name: String,
    pub affected_area: Option<AffectedArea>,
    pub center_lat: Option<f64>,
    pub center_lon: Option<f64>,
    pub impact_radius_km: f64,
    pub threshold_value: f64,
    pub current_value: f64,
    pub message_template: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub priority: f64,
}

/// Grouping key for alerts describing the same event.
///
/// Two alerts share a key when they have the same pollutant and severity,
/// their centres fall in the same 0.1° cell and they were created in the
/// same UTC hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NaturalKey {
    pub pollutant: Pollutant,
    pub severity_level: u8,
    /// `(floor(lat / 0.1), floor(lon / 0.1))`; `None` without a centre.
    pub cell: Option<(i64, i64)>,
    /// Hours since the Unix epoch.
    pub hour: i64,
}

impl Alert {
    pub fn level(&self) -> Option<SeverityLevel> {
        self.level_name.parse().ok()
    }

    /// Key stores can use to deduplicate repeated runs.
    pub fn natural_key(&self) -> NaturalKey {
        let cell = match (self.center_lat, self.center_lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((
                (lat / NATURAL_KEY_CELL_DEG).floor() as i64,
                (lon / NATURAL_KEY_CELL_DEG).floor() as i64,
            )),
            _ => None,
        };
        NaturalKey {
            pollutant: self.pollutant,
            severity_level: self.severity_level,
            cell,
            hour: self.created_at.timestamp().div_euclid(3600),
        }
    }

    /// Whether the alert is active and not yet expired at `now`.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at
    }
}

/// Which of a user's registered locations put them inside an alert area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Home,
    Work,
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LocationKind::Home => "home",
            LocationKind::Work => "work",
        })
    }
}

/// Pending notification; message and channel are filled in downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub user_id: UserId,
    pub message: String,
    pub delivery_channel: String,
    pub location_type: LocationKind,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn pending(alert_id: Uuid, user_id: UserId, location_type: LocationKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_id,
            user_id,
            message: String::new(),
            delivery_channel: "pending".to_string(),
            location_type,
            sent_at: None,
            received_at: None,
            read_at: None,
        }
    }
}

/// A point location (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Read-only view of a user account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub home_location: Option<Location>,
    #[serde(default)]
    pub work_location: Option<Location>,
    pub is_active: bool,
}

impl User {
    pub fn location(&self, kind: LocationKind) -> Option<Location> {
        match kind {
            LocationKind::Home => self.home_location,
            LocationKind::Work => self.work_location,
        }
    }
}

/// An alert and its notifications, committed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub alert: Alert,
    pub notifications: Vec<Notification>,
}

//! Capabilities the trigger needs from the outside world.

use air_common::{Pollutant, Reading, Station, StationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo::{Intersects, Point, Polygon};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Alert, AlertRecord, LocationKind, User};

/// Highest recent reading inside an area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaMaximum {
    pub value: f64,
    pub station: Station,
}

/// Station and reading lookups.
#[async_trait]
pub trait StationQuery: Send + Sync {
    /// Stations whose location intersects `area` (spatial index query).
    async fn stations_in_area(&self, area: &Polygon<f64>) -> Result<Vec<Station>>;

    /// Every known station.
    async fn all_stations(&self) -> Result<Vec<Station>>;

    /// Readings from `station_ids` at or after `since`.
    async fn recent_readings(&self, station_ids: &[StationId], since: DateTime<Utc>) -> Result<Vec<Reading>>;

    /// Stations intersecting `area`.
    ///
    /// Falls back to scanning [`StationQuery::all_stations`] in-process when
    /// the spatial query fails.
    async fn stations_for_area(&self, area: &Polygon<f64>) -> Result<Vec<Station>> {
        match self.stations_in_area(area).await {
            Ok(stations) => Ok(stations),
            Err(e) => {
                warn!(error = %e, "Spatial station query failed, scanning all stations");
                let all = self.all_stations().await?;
                Ok(all
                    .into_iter()
                    .filter(|s| s.has_location() && area.intersects(&Point::new(s.longitude, s.latitude)))
                    .collect())
            }
        }
    }

    /// Highest positive `pollutant` reading among `stations` since `since`.
    async fn area_maximum(
        &self,
        pollutant: Pollutant,
        stations: &[Station],
        since: DateTime<Utc>,
    ) -> Result<Option<AreaMaximum>> {
        if stations.is_empty() {
            return Ok(None);
        }
        let ids: Vec<StationId> = stations.iter().map(|s| s.id).collect();
        let readings = self.recent_readings(&ids, since).await?;

        let best = readings
            .iter()
            .filter_map(|r| r.value(pollutant).map(|v| (v, r.station_id)))
            .filter(|(v, _)| v.is_finite() && *v > 0.0)
            .fold(None, |best: Option<(f64, StationId)>, (v, id)| match best {
                Some((b, _)) if b >= v => best,
                _ => Some((v, id)),
            });

        let Some((value, station_id)) = best else {
            debug!(pollutant = %pollutant, stations = stations.len(), "No recent readings in area");
            return Ok(None);
        };
        Ok(stations
            .iter()
            .find(|s| s.id == station_id)
            .map(|station| AreaMaximum {
                value,
                station: station.clone(),
            }))
    }

    /// Maximum recent value in `area` and the `(lon, lat)` of the station
    /// that reported it.
    async fn max_value_in_area(
        &self,
        pollutant: Pollutant,
        area: &Polygon<f64>,
        since: DateTime<Utc>,
    ) -> Result<Option<(f64, (f64, f64))>> {
        let stations = self.stations_for_area(area).await?;
        Ok(self
            .area_maximum(pollutant, &stations, since)
            .await?
            .map(|m| (m.value, (m.station.longitude, m.station.latitude))))
    }
}

/// Finds users with a registered location inside an area.
#[async_trait]
pub trait UserLocator: Send + Sync {
    async fn users_intersecting(&self, area: &Polygon<f64>, kind: LocationKind) -> Result<Vec<User>>;
}

/// Durable storage for alerts and their notifications.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Persist records; each record is atomic.
    async fn commit(&self, records: Vec<AlertRecord>) -> Result<()>;

    async fn update_priority(&self, alert_id: Uuid, priority: f64) -> Result<()>;
}

/// Population vulnerability (0-100) for an alert's area.
#[async_trait]
pub trait VulnerabilityIndex: Send + Sync {
    async fn vulnerability(&self, alert: &Alert) -> Result<f64>;
}

//! In-memory collaborators for the batch service and tests.

use std::collections::HashMap;

use air_common::{Reading, Station, StationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geo::{Intersects, Point, Polygon};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::collaborators::{AlertStore, StationQuery, UserLocator, VulnerabilityIndex};
use crate::error::{AlertError, Result};
use crate::models::{Alert, AlertRecord, LocationKind, User};

/// Stations and readings held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStations {
    stations: Vec<Station>,
    readings: Vec<Reading>,
}

impl InMemoryStations {
    pub fn new(stations: Vec<Station>, readings: Vec<Reading>) -> Self {
        Self { stations, readings }
    }
}

#[async_trait]
impl StationQuery for InMemoryStations {
    async fn stations_in_area(&self, area: &Polygon<f64>) -> Result<Vec<Station>> {
        Ok(self
            .stations
            .iter()
            .filter(|s| s.has_location() && area.intersects(&Point::new(s.longitude, s.latitude)))
            .cloned()
            .collect())
    }

    async fn all_stations(&self) -> Result<Vec<Station>> {
        Ok(self.stations.clone())
    }

    async fn recent_readings(&self, station_ids: &[StationId], since: DateTime<Utc>) -> Result<Vec<Reading>> {
        Ok(self
            .readings
            .iter()
            .filter(|r| r.timestamp >= since && station_ids.contains(&r.station_id))
            .cloned()
            .collect())
    }
}

/// Users held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUsers {
    users: Vec<User>,
}

impl InMemoryUsers {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserLocator for InMemoryUsers {
    async fn users_intersecting(&self, area: &Polygon<f64>, kind: LocationKind) -> Result<Vec<User>> {
        Ok(self
            .users
            .iter()
            .filter(|u| {
                u.location(kind)
                    .is_some_and(|loc| area.intersects(&Point::new(loc.longitude, loc.latitude)))
            })
            .cloned()
            .collect())
    }
}

/// Alert store backed by a vector; optionally rejects commits after a
/// number of successful ones.
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    records: RwLock<Vec<AlertRecord>>,
    priorities: RwLock<HashMap<Uuid, f64>>,
    commits: RwLock<usize>,
    fail_after: Option<usize>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose commits fail once `commits` batches have succeeded.
    pub fn failing_after(commits: usize) -> Self {
        Self {
            fail_after: Some(commits),
            ..Self::default()
        }
    }

    pub async fn records(&self) -> Vec<AlertRecord> {
        self.records.read().await.clone()
    }

    /// Number of successful commit calls.
    pub async fn commit_count(&self) -> usize {
        *self.commits.read().await
    }

    pub async fn priority(&self, alert_id: Uuid) -> Option<f64> {
        self.priorities.read().await.get(&alert_id).copied()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn commit(&self, records: Vec<AlertRecord>) -> Result<()> {
        let mut commits = self.commits.write().await;
        if self.fail_after.is_some_and(|limit| *commits >= limit) {
            return Err(AlertError::Persistence("store unavailable".to_string()));
        }
        self.records.write().await.extend(records);
        *commits += 1;
        Ok(())
    }

    async fn update_priority(&self, alert_id: Uuid, priority: f64) -> Result<()> {
        let known = self
            .records
            .read()
            .await
            .iter()
            .any(|r| r.alert.id == alert_id);
        if !known {
            return Err(AlertError::Persistence(format!("unknown alert {}", alert_id)));
        }
        self.priorities.write().await.insert(alert_id, priority);
        Ok(())
    }
}

/// The same vulnerability for every area.
#[derive(Debug, Clone, Copy)]
pub struct ConstantVulnerability(pub f64);

impl Default for ConstantVulnerability {
    fn default() -> Self {
        Self(50.0)
    }
}

#[async_trait]
impl VulnerabilityIndex for ConstantVulnerability {
    async fn vulnerability(&self, _alert: &Alert) -> Result<f64> {
        Ok(self.0)
    }
}

//! Exceedance polygons to persisted alerts and notifications.

use std::collections::BTreeMap;
use std::sync::Arc;

use air_common::{Pollutant, SeverityLevel, Station};
use chrono::{DateTime, Duration, Utc};
use geo::{Centroid, Polygon};
use metrics::counter;
use threshold::ExceedanceSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collaborators::{AlertStore, AreaMaximum, StationQuery, UserLocator, VulnerabilityIndex};
use crate::config::AlertConfig;
use crate::error::{AlertError, Result};
use crate::geometry::{AffectedArea, CIRCLE_SEGMENTS, FALLBACK_RADIUS_DEG};
use crate::models::{Alert, AlertRecord, LocationKind, Notification, User, UserId};

fn hours(h: f64) -> Duration {
    Duration::milliseconds((h * 3_600_000.0).round() as i64)
}

/// `(lon, lat)` of the polygon centroid when it is finite.
fn polygon_center(polygon: &Polygon<f64>) -> Option<(f64, f64)> {
    polygon
        .centroid()
        .map(|c| (c.x(), c.y()))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
}

/// `(lon, lat)` mean of the stations with usable coordinates.
fn station_mean(stations: &[Station]) -> Option<(f64, f64)> {
    let located: Vec<&Station> = stations.iter().filter(|s| s.has_location()).collect();
    if located.is_empty() {
        return None;
    }
    let n = located.len() as f64;
    Some((
        located.iter().map(|s| s.longitude).sum::<f64>() / n,
        located.iter().map(|s| s.latitude).sum::<f64>() / n,
    ))
}

/// Turns severity-partitioned exceedances into alerts, fans each alert out
/// to affected users and commits the results in batches.
///
/// # Example
///
/// ```rust,ignore
/// let trigger = AlertTrigger::new(config, stations, users, store);
/// let sets = detector.identify_exceedances(Pollutant::Pm25, &grid);
/// let alerts = trigger.process_exceedances(Pollutant::Pm25, &sets).await?;
/// ```
pub struct AlertTrigger {
    config: AlertConfig,
    stations: Arc<dyn StationQuery>,
    users: Arc<dyn UserLocator>,
    store: Arc<dyn AlertStore>,
    vulnerability: Option<Arc<dyn VulnerabilityIndex>>,
    alert_type: String,
    lead_hours: f64,
}

impl AlertTrigger {
    pub fn new(
        config: AlertConfig,
        stations: Arc<dyn StationQuery>,
        users: Arc<dyn UserLocator>,
        store: Arc<dyn AlertStore>,
    ) -> Self {
        Self {
            config,
            stations,
            users,
            store,
            vulnerability: None,
            alert_type: "pollution".to_string(),
            lead_hours: 0.0,
        }
    }

    /// Vulnerability source used by [`AlertTrigger::prioritize_alerts`].
    pub fn with_vulnerability_index(mut self, index: Arc<dyn VulnerabilityIndex>) -> Self {
        self.vulnerability = Some(index);
        self
    }

    /// Type recorded on created alerts; `pollution` unless overridden,
    /// e.g. `forecast` for alerts raised from dispersed grids.
    pub fn with_alert_type(mut self, alert_type: impl Into<String>) -> Self {
        self.alert_type = alert_type.into();
        self
    }

    /// Hours between creation and the conditions an alert describes.
    ///
    /// Expiry is counted from `now + lead_hours`, so an alert for a grid
    /// forecast six hours out stays valid through that window.
    pub fn with_lead_hours(mut self, lead_hours: f64) -> Self {
        self.lead_hours = lead_hours.max(0.0);
        self
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Create, fan out and persist alerts for every exceedance polygon.
    ///
    /// # Arguments
    /// * `pollutant` - Pollutant the exceedances were computed for
    /// * `sets` - Output of `ThresholdDetector::identify_exceedances`
    ///
    /// # Returns
    /// The alerts created, most severe level first.
    pub async fn process_exceedances(
        &self,
        pollutant: Pollutant,
        sets: &BTreeMap<SeverityLevel, ExceedanceSet>,
    ) -> Result<Vec<Alert>> {
        let records = self.process_exceedances_at(pollutant, sets, Utc::now()).await?;
        Ok(records.into_iter().map(|r| r.alert).collect())
    }

    /// [`AlertTrigger::process_exceedances`] with an explicit clock, returning
    /// each alert with its notifications.
    ///
    /// Records are committed every `batch_size` alerts and once more at the
    /// end. A failed commit returns `Persistence`; batches committed before
    /// it stay committed.
    pub async fn process_exceedances_at(
        &self,
        pollutant: Pollutant,
        sets: &BTreeMap<SeverityLevel, ExceedanceSet>,
        now: DateTime<Utc>,
    ) -> Result<Vec<AlertRecord>> {
        self.config.validate()?;

        let mut created = Vec::new();
        let mut pending = Vec::with_capacity(self.config.batch_size);

        for (level, set) in sets.iter().rev() {
            let Some(threshold) = set.threshold else {
                continue;
            };

            for exceedance in &set.polygons {
                let alert = match self
                    .create_alert(pollutant, *level, threshold, &exceedance.polygon, now)
                    .await
                {
                    Ok(alert) => alert,
                    Err(e) => {
                        warn!(pollutant = %pollutant, level = %level, error = %e, "Skipping exceedance polygon");
                        counter!("alert_polygons_skipped_total", "pollutant" => pollutant.code()).increment(1);
                        continue;
                    }
                };

                let notifications = match self.notify_affected_users(&alert).await {
                    Ok(n) => n,
                    Err(e) => {
                        warn!(alert_id = %alert.id, error = %e, "Failed to notify affected users");
                        Vec::new()
                    }
                };

                counter!("alerts_created_total", "pollutant" => pollutant.code()).increment(1);
                counter!("notifications_created_total", "pollutant" => pollutant.code())
                    .increment(notifications.len() as u64);

                info!(
                    alert_id = %alert.id,
                    pollutant = %pollutant,
                    level = %level,
                    severity = alert.severity_level,
                    current_value = alert.current_value,
                    center_lat = ?alert.center_lat,
                    center_lon = ?alert.center_lon,
                    notifications = notifications.len(),
                    "Created alert"
                );

                pending.push(AlertRecord { alert, notifications });
                if pending.len() >= self.config.batch_size {
                    created.extend(self.flush(&mut pending).await?);
                }
            }
        }

        created.extend(self.flush(&mut pending).await?);

        info!(
            pollutant = %pollutant,
            alerts = created.len(),
            notifications = created.iter().map(|r| r.notifications.len()).sum::<usize>(),
            "Exceedance processing complete"
        );

        Ok(created)
    }

    async fn flush(&self, pending: &mut Vec<AlertRecord>) -> Result<Vec<AlertRecord>> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        let batch = std::mem::take(pending);
        self.store.commit(batch.clone()).await.map_err(|e| match e {
            AlertError::Persistence(_) => e,
            other => AlertError::Persistence(other.to_string()),
        })?;
        debug!(records = batch.len(), "Committed alert batch");
        Ok(batch)
    }

    async fn create_alert(
        &self,
        pollutant: Pollutant,
        level: SeverityLevel,
        threshold: f64,
        polygon: &Polygon<f64>,
        now: DateTime<Utc>,
    ) -> Result<Alert> {
        let rank = self.config.rank_for(level);

        let stations = match self.stations.stations_for_area(polygon).await {
            Ok(stations) => stations,
            Err(e) => {
                warn!(error = %e, "Station lookup failed");
                Vec::new()
            }
        };

        let since = now - hours(self.config.station_window_hours);
        let maximum: Option<AreaMaximum> = match self.stations.area_maximum(pollutant, &stations, since).await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "Reading lookup failed");
                None
            }
        };

        let center = polygon_center(polygon)
            .or_else(|| station_mean(&stations))
            .or_else(|| {
                maximum
                    .as_ref()
                    .map(|m| (m.station.longitude, m.station.latitude))
            });

        let current_value = maximum.as_ref().map(|m| m.value).unwrap_or(0.0);
        if maximum.is_none() {
            debug!(pollutant = %pollutant, level = %level, "No recent readings in affected area");
        }

        let affected_area = match AffectedArea::from_polygon(polygon) {
            Ok(area) => area,
            Err(e) => {
                let Some(center) = center else {
                    return Err(AlertError::NoCoordinates(e.to_string()));
                };
                warn!(error = %e, "Unusable polygon, substituting circle around centre");
                AffectedArea::circle(center, FALLBACK_RADIUS_DEG, CIRCLE_SEGMENTS)
            }
        };

        Ok(Alert {
            id: Uuid::new_v4(),
            alert_type: self.alert_type.clone(),
            pollutant,
            severity_level: rank,
            level_name: level.name().to_string(),
            affected_area: Some(affected_area),
            center_lat: center.map(|(_, lat)| lat),
            center_lon: center.map(|(lon, _)| lon),
            impact_radius_km: rank as f64 * self.config.radius_per_level_km,
            threshold_value: threshold,
            current_value,
            message_template: self.config.message_template(pollutant, level),
            created_at: now,
            expires_at: now + hours(self.lead_hours + self.config.alert_expiry_hours),
            is_active: true,
            priority: 0.0,
        })
    }

    /// One pending notification per active user whose home or work location
    /// lies in the alert's area.
    ///
    /// A user matching both locations gets a single `home` notification.
    pub async fn notify_affected_users(&self, alert: &Alert) -> Result<Vec<Notification>> {
        let Some(area) = alert.affected_area.as_ref() else {
            return Ok(Vec::new());
        };
        let polygon = area.to_polygon();

        let home = self.users.users_intersecting(&polygon, LocationKind::Home).await?;
        let work = self.users.users_intersecting(&polygon, LocationKind::Work).await?;

        let mut affected: BTreeMap<UserId, (User, LocationKind)> = BTreeMap::new();
        for user in home {
            affected.entry(user.id).or_insert((user, LocationKind::Home));
        }
        for user in work {
            affected.entry(user.id).or_insert((user, LocationKind::Work));
        }

        let notifications: Vec<Notification> = affected
            .into_values()
            .filter(|(user, _)| user.is_active)
            .map(|(user, kind)| Notification::pending(alert.id, user.id, kind))
            .collect();

        debug!(alert_id = %alert.id, count = notifications.len(), "Created notifications");
        Ok(notifications)
    }

    /// Set `priority = rank * (1 + vulnerability / 100)` and persist it.
    ///
    /// Without a vulnerability index every area counts as 0. A failed lookup
    /// for one alert is logged and treated as 0.
    pub async fn prioritize_alerts(&self, alerts: &mut [Alert]) -> Result<()> {
        for alert in alerts.iter_mut() {
            let vulnerability = match self.vulnerability.as_ref() {
                Some(index) => match index.vulnerability(alert).await {
                    Ok(v) if v.is_finite() => v,
                    Ok(v) => {
                        warn!(alert_id = %alert.id, value = v, "Ignoring non-finite vulnerability");
                        0.0
                    }
                    Err(e) => {
                        warn!(alert_id = %alert.id, error = %e, "Vulnerability lookup failed");
                        0.0
                    }
                },
                None => 0.0,
            };

            alert.priority = alert.severity_level as f64 * (1.0 + vulnerability / 100.0);
            self.store.update_priority(alert.id, alert.priority).await?;
        }

        info!(alerts = alerts.len(), "Alerts prioritised");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_station_mean() {
        let stations = vec![
            Station::new(1, "A", 10.0, 20.0),
            Station::new(2, "B", 12.0, 22.0),
            Station::new(3, "C", f64::NAN, 0.0),
        ];
        assert_eq!(station_mean(&stations), Some((21.0, 11.0)));
        assert_eq!(station_mean(&[]), None);
    }

    #[test]
    fn test_polygon_center() {
        let p = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        assert_eq!(polygon_center(&p), Some((1.0, 1.0)));
        let empty = Polygon::new(geo::LineString::new(vec![]), vec![]);
        assert_eq!(polygon_center(&empty), None);
    }

    #[test]
    fn test_fractional_hours() {
        assert_eq!(hours(1.5), Duration::minutes(90));
    }
}

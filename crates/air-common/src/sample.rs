//! Monitoring stations, raw readings and the point samples built from them.

use crate::Pollutant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a monitoring station.
pub type StationId = i64;

/// A monitoring station location (EPSG:4326).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Upstream provider, e.g. "openaq".
    #[serde(default)]
    pub source: Option<String>,
}

impl Station {
    pub fn new(id: StationId, code: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            code: code.into(),
            name: None,
            latitude,
            longitude,
            source: None,
        }
    }

    /// Whether the coordinates can be used for geometry.
    pub fn has_location(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// One observation from a station; pollutants the station does not
/// measure are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub station_id: StationId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub pm25: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(default)]
    pub o3: Option<f64>,
    #[serde(default)]
    pub no2: Option<f64>,
    #[serde(default)]
    pub so2: Option<f64>,
    #[serde(default)]
    pub co: Option<f64>,
    #[serde(default)]
    pub aqi: Option<f64>,
}

impl Reading {
    /// Value recorded for a pollutant, if any.
    pub fn value(&self, pollutant: Pollutant) -> Option<f64> {
        match pollutant {
            Pollutant::Pm25 => self.pm25,
            Pollutant::Pm10 => self.pm10,
            Pollutant::O3 => self.o3,
            Pollutant::No2 => self.no2,
            Pollutant::So2 => self.so2,
            Pollutant::Co => self.co,
            Pollutant::Aqi => self.aqi,
        }
    }

    /// Builder-style setter used by sources and tests.
    pub fn with_value(mut self, pollutant: Pollutant, value: f64) -> Self {
        let slot = match pollutant {
            Pollutant::Pm25 => &mut self.pm25,
            Pollutant::Pm10 => &mut self.pm10,
            Pollutant::O3 => &mut self.o3,
            Pollutant::No2 => &mut self.no2,
            Pollutant::So2 => &mut self.so2,
            Pollutant::Co => &mut self.co,
            Pollutant::Aqi => &mut self.aqi,
        };
        *slot = Some(value);
        self
    }
}

/// A single point measurement fed to the interpolator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub station_id: StationId,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    /// A sample is usable when its value and coordinates are finite.
    pub fn is_valid(&self) -> bool {
        self.value.is_finite() && self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Build samples for one pollutant from the latest reading of each station
/// that carries a value for it.
///
/// Readings from unknown stations or stations without coordinates are
/// ignored. Output is ordered by station id.
pub fn latest_samples(pollutant: Pollutant, stations: &[Station], readings: &[Reading]) -> Vec<Sample> {
    let by_id: HashMap<StationId, &Station> = stations
        .iter()
        .filter(|s| s.has_location())
        .map(|s| (s.id, s))
        .collect();

    let mut latest: HashMap<StationId, (&Reading, f64)> = HashMap::new();
    for reading in readings {
        let Some(value) = reading.value(pollutant) else {
            continue;
        };
        if !by_id.contains_key(&reading.station_id) {
            continue;
        }
        match latest.get(&reading.station_id) {
            Some((current, _)) if current.timestamp >= reading.timestamp => {}
            _ => {
                latest.insert(reading.station_id, (reading, value));
            }
        }
    }

    let mut samples: Vec<Sample> = latest
        .into_iter()
        .map(|(station_id, (reading, value))| {
            let station = by_id[&station_id];
            Sample {
                station_id,
                latitude: station.latitude,
                longitude: station.longitude,
                timestamp: reading.timestamp,
                value,
            }
        })
        .collect();
    samples.sort_by_key(|s| s.station_id);
    samples
}

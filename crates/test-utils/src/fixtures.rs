//! Common fixtures for alerting tests.
//!
//! This module provides pre-defined stations and readings that represent the
//! scenarios exercised across the suite.

use crate::generators::{fixed_time, sample_at};
use air_common::{Pollutant, Reading, Sample, Station};

/// Station S1 in central Delhi (28.6139 N, 77.2090 E).
pub const DELHI_LAT: f64 = 28.6139;
pub const DELHI_LON: f64 = 77.2090;

/// Station S1.
pub fn delhi_station() -> Station {
    Station {
        name: Some("Connaught Place".to_string()),
        source: Some("fixture".to_string()),
        ..Station::new(1, "S1", DELHI_LAT, DELHI_LON)
    }
}

/// The single PM2.5 = 200 sample at S1.
pub fn delhi_samples() -> Vec<Sample> {
    vec![sample_at(1, DELHI_LON, DELHI_LAT, 200.0)]
}

/// A latest reading at S1 with PM2.5 = 200, stamped with [`fixed_time`].
pub fn delhi_reading() -> Reading {
    Reading {
        station_id: 1,
        timestamp: fixed_time(),
        ..Default::default()
    }
    .with_value(Pollutant::Pm25, 200.0)
}

/// Three stations around S1, the third without a PM2.5 value.
pub fn small_network() -> (Vec<Station>, Vec<Reading>) {
    let stations = vec![
        delhi_station(),
        Station::new(2, "S2", DELHI_LAT + 0.05, DELHI_LON + 0.05),
        Station::new(3, "S3", DELHI_LAT - 0.05, DELHI_LON + 0.02),
    ];
    let readings = vec![
        delhi_reading(),
        Reading {
            station_id: 2,
            timestamp: fixed_time(),
            ..Default::default()
        }
        .with_value(Pollutant::Pm25, 40.0)
        .with_value(Pollutant::Pm10, 90.0),
        Reading {
            station_id: 3,
            timestamp: fixed_time(),
            ..Default::default()
        }
        .with_value(Pollutant::O3, 60.0),
    ];
    (stations, readings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_network_pm25_samples() {
        let (stations, readings) = small_network();
        let samples = air_common::latest_samples(Pollutant::Pm25, &stations, &readings);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].value, 200.0);
    }
}

//! Pollutant codes and the ordered severity scale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pollutants reported by monitoring stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    Pm25,
    Pm10,
    O3,
    No2,
    So2,
    Co,
    Aqi,
}

impl Pollutant {
    pub const ALL: [Pollutant; 7] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::O3,
        Pollutant::No2,
        Pollutant::So2,
        Pollutant::Co,
        Pollutant::Aqi,
    ];

    /// Lowercase code used in configuration, file names and records.
    pub fn code(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm25",
            Pollutant::Pm10 => "pm10",
            Pollutant::O3 => "o3",
            Pollutant::No2 => "no2",
            Pollutant::So2 => "so2",
            Pollutant::Co => "co",
            Pollutant::Aqi => "aqi",
        }
    }

    /// Display label including units.
    pub fn label(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5 (µg/m³)",
            Pollutant::Pm10 => "PM10 (µg/m³)",
            Pollutant::O3 => "Ozone (ppb)",
            Pollutant::No2 => "NO₂ (ppb)",
            Pollutant::So2 => "SO₂ (ppb)",
            Pollutant::Co => "CO (ppm)",
            Pollutant::Aqi => "Air Quality Index",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Pollutant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pm25" | "pm2.5" => Ok(Pollutant::Pm25),
            "pm10" => Ok(Pollutant::Pm10),
            "o3" => Ok(Pollutant::O3),
            "no2" => Ok(Pollutant::No2),
            "so2" => Ok(Pollutant::So2),
            "co" => Ok(Pollutant::Co),
            "aqi" => Ok(Pollutant::Aqi),
            other => Err(format!(
                "unknown pollutant '{}', expected one of pm25, pm10, o3, no2, so2, co, aqi",
                other
            )),
        }
    }
}

/// Health severity category, ordered from least to most severe.
///
/// `Good` is part of the scale (rank 0) but never produces an exceedance;
/// the alerting levels are `Moderate` through `Hazardous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl SeverityLevel {
    /// Levels that raise alerts, most severe first.
    ///
    /// Exceedance overlay iterates in this order so that each level only
    /// keeps area not already claimed by a more severe one.
    pub const fn most_severe_first() -> [SeverityLevel; 5] {
        [
            SeverityLevel::Hazardous,
            SeverityLevel::VeryUnhealthy,
            SeverityLevel::Unhealthy,
            SeverityLevel::UnhealthySensitive,
            SeverityLevel::Moderate,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeverityLevel::Good => "good",
            SeverityLevel::Moderate => "moderate",
            SeverityLevel::UnhealthySensitive => "unhealthy_sensitive",
            SeverityLevel::Unhealthy => "unhealthy",
            SeverityLevel::VeryUnhealthy => "very_unhealthy",
            SeverityLevel::Hazardous => "hazardous",
        }
    }

    /// Default integer rank (0 = good .. 5 = hazardous).
    pub fn default_rank(&self) -> u8 {
        match self {
            SeverityLevel::Good => 0,
            SeverityLevel::Moderate => 1,
            SeverityLevel::UnhealthySensitive => 2,
            SeverityLevel::Unhealthy => 3,
            SeverityLevel::VeryUnhealthy => 4,
            SeverityLevel::Hazardous => 5,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SeverityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "good" => Ok(SeverityLevel::Good),
            "moderate" => Ok(SeverityLevel::Moderate),
            "unhealthy_sensitive" => Ok(SeverityLevel::UnhealthySensitive),
            "unhealthy" => Ok(SeverityLevel::Unhealthy),
            "very_unhealthy" => Ok(SeverityLevel::VeryUnhealthy),
            "hazardous" => Ok(SeverityLevel::Hazardous),
            other => Err(format!("unknown severity level '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(SeverityLevel::Moderate < SeverityLevel::UnhealthySensitive);
        assert!(SeverityLevel::UnhealthySensitive < SeverityLevel::Unhealthy);
        assert!(SeverityLevel::Unhealthy < SeverityLevel::VeryUnhealthy);
        assert!(SeverityLevel::VeryUnhealthy < SeverityLevel::Hazardous);

        let order = SeverityLevel::most_severe_first();
        assert!(order.windows(2).all(|w| w[0] > w[1]));
        assert!(!order.contains(&SeverityLevel::Good));
    }

    #[test]
    fn test_pollutant_round_trip_names() {
        for p in Pollutant::ALL {
            assert_eq!(p.code().parse::<Pollutant>().unwrap(), p);
        }
        assert_eq!("PM2.5".parse::<Pollutant>().unwrap(), Pollutant::Pm25);
        assert!("benzene".parse::<Pollutant>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SeverityLevel::UnhealthySensitive).unwrap();
        assert_eq!(json, "\"unhealthy_sensitive\"");
        let json = serde_json::to_string(&Pollutant::Pm25).unwrap();
        assert_eq!(json, "\"pm25\"");
    }
}

//! Pollutant threshold tables.

use std::collections::BTreeMap;

use air_common::{Pollutant, SeverityLevel};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Level → threshold value for one pollutant.
pub type LevelTable = BTreeMap<SeverityLevel, f64>;

/// Per-pollutant threshold tables (same units as the readings).
///
/// Values are upper bounds of each category: a cell exceeds a level when its
/// value is strictly greater than the level's threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdTable {
    tables: BTreeMap<Pollutant, LevelTable>,
}

fn level_table(values: [f64; 6]) -> LevelTable {
    [
        SeverityLevel::Good,
        SeverityLevel::Moderate,
        SeverityLevel::UnhealthySensitive,
        SeverityLevel::Unhealthy,
        SeverityLevel::VeryUnhealthy,
        SeverityLevel::Hazardous,
    ]
    .into_iter()
    .zip(values)
    .collect()
}

impl Default for ThresholdTable {
    fn default() -> Self {
        let tables = BTreeMap::from([
            (Pollutant::Pm25, level_table([12.0, 35.4, 55.4, 150.4, 250.4, 350.4])),
            (Pollutant::Pm10, level_table([54.0, 154.0, 254.0, 354.0, 424.0, 504.0])),
            (Pollutant::O3, level_table([54.0, 70.0, 85.0, 105.0, 200.0, 300.0])),
            (Pollutant::No2, level_table([53.0, 100.0, 360.0, 649.0, 1249.0, 1649.0])),
            (Pollutant::So2, level_table([35.0, 75.0, 185.0, 304.0, 604.0, 804.0])),
            (Pollutant::Co, level_table([4.4, 9.4, 12.4, 15.4, 30.4, 40.4])),
            (Pollutant::Aqi, level_table([50.0, 100.0, 150.0, 200.0, 300.0, 500.0])),
        ]);
        Self { tables }
    }
}

impl ThresholdTable {
    /// A table holding only the given pollutants. Pollutants without a table
    /// are evaluated against the AQI table.
    pub fn from_tables(tables: BTreeMap<Pollutant, LevelTable>) -> Self {
        Self { tables }
    }

    /// Defaults with individual entries replaced.
    pub fn with_overrides(mut self, overrides: &BTreeMap<Pollutant, LevelTable>) -> Self {
        for (pollutant, levels) in overrides {
            let entry = self.tables.entry(*pollutant).or_default();
            for (level, value) in levels {
                entry.insert(*level, *value);
            }
        }
        self
    }

    /// Table for a pollutant, falling back to the AQI table (with a warning).
    ///
    /// Returns `None` only when neither the pollutant nor AQI has a table.
    pub fn levels_for(&self, pollutant: Pollutant) -> Option<&LevelTable> {
        if let Some(levels) = self.tables.get(&pollutant) {
            return Some(levels);
        }
        warn!(pollutant = %pollutant, "No thresholds defined, using AQI thresholds");
        self.tables.get(&Pollutant::Aqi)
    }

    /// Threshold for an exact level, without the `unhealthy` fallback.
    pub fn threshold(&self, pollutant: Pollutant, level: SeverityLevel) -> Option<f64> {
        self.levels_for(pollutant)?.get(&level).copied()
    }

    /// Threshold for a level, falling back to the table's `unhealthy` value
    /// (with a warning). Returns the level actually used.
    pub fn threshold_or_unhealthy(
        &self,
        pollutant: Pollutant,
        level: SeverityLevel,
    ) -> Option<(SeverityLevel, f64)> {
        let levels = self.levels_for(pollutant)?;
        if let Some(value) = levels.get(&level) {
            return Some((level, *value));
        }
        warn!(
            pollutant = %pollutant,
            level = %level,
            "Threshold level not defined, using 'unhealthy'"
        );
        levels
            .get(&SeverityLevel::Unhealthy)
            .map(|value| (SeverityLevel::Unhealthy, *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pm25_table() {
        let table = ThresholdTable::default();
        assert_eq!(table.threshold(Pollutant::Pm25, SeverityLevel::Unhealthy), Some(150.4));
        assert_eq!(table.threshold(Pollutant::Pm25, SeverityLevel::Good), Some(12.0));
        assert_eq!(table.threshold(Pollutant::Co, SeverityLevel::Hazardous), Some(40.4));
    }

    #[test]
    fn test_defaults_increase_with_severity() {
        let table = ThresholdTable::default();
        for pollutant in Pollutant::ALL {
            let values: Vec<f64> = table.levels_for(pollutant).unwrap().values().copied().collect();
            assert!(values.windows(2).all(|w| w[0] < w[1]), "{pollutant}");
        }
    }

    #[test]
    fn test_missing_pollutant_uses_aqi() {
        let table = ThresholdTable::from_tables(BTreeMap::from([(
            Pollutant::Aqi,
            level_table([50.0, 100.0, 150.0, 200.0, 300.0, 500.0]),
        )]));
        assert_eq!(table.threshold(Pollutant::No2, SeverityLevel::Unhealthy), Some(200.0));
    }

    #[test]
    fn test_missing_level_falls_back_to_unhealthy() {
        let mut levels = LevelTable::new();
        levels.insert(SeverityLevel::Unhealthy, 80.0);
        let table = ThresholdTable::from_tables(BTreeMap::from([(Pollutant::O3, levels)]));
        assert_eq!(table.threshold(Pollutant::O3, SeverityLevel::Hazardous), None);
        assert_eq!(
            table.threshold_or_unhealthy(Pollutant::O3, SeverityLevel::Hazardous),
            Some((SeverityLevel::Unhealthy, 80.0))
        );
    }

    #[test]
    fn test_overrides_replace_single_entries() {
        let overrides = BTreeMap::from([(
            Pollutant::Pm25,
            LevelTable::from([(SeverityLevel::Unhealthy, 100.0)]),
        )]);
        let table = ThresholdTable::default().with_overrides(&overrides);
        assert_eq!(table.threshold(Pollutant::Pm25, SeverityLevel::Unhealthy), Some(100.0));
        assert_eq!(table.threshold(Pollutant::Pm25, SeverityLevel::Hazardous), Some(350.4));
    }
}

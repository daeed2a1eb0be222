//! Integration tests for severity-partitioned exceedance detection.

use std::collections::BTreeMap;

use air_common::{Pollutant, SeverityLevel};
use geo::{Area, BooleanOps, Contains, MultiPolygon, Point};
use threshold::{LevelTable, ThresholdConfig, ThresholdDetector};
use test_utils::{assert_approx_eq, block_grid, grid_from_rows, noise_grid, plume_grid, uniform_grid};

fn detector() -> ThresholdDetector {
    ThresholdDetector::new(ThresholdConfig::default())
}

fn level_union(polygons: &[geo::Polygon<f64>]) -> MultiPolygon<f64> {
    MultiPolygon::new(polygons.to_vec())
}

// ============================================================================
// Severity partition
// ============================================================================

#[test]
fn test_uniform_unhealthy_grid_is_one_unhealthy_polygon() {
    let grid = uniform_grid(21, 21, 0.01, 200.0);
    let sets = detector().identify_exceedances(Pollutant::Pm25, &grid);

    assert_eq!(sets.len(), 5);
    let unhealthy = &sets[&SeverityLevel::Unhealthy];
    assert_eq!(unhealthy.polygons.len(), 1);
    assert_eq!(unhealthy.threshold, Some(150.4));
    assert_approx_eq!(unhealthy.polygons[0].polygon.unsigned_area(), 0.21 * 0.21, 1e-9);

    for level in [
        SeverityLevel::Hazardous,
        SeverityLevel::VeryUnhealthy,
        SeverityLevel::UnhealthySensitive,
        SeverityLevel::Moderate,
    ] {
        assert!(sets[&level].is_empty(), "{level} should be empty");
    }
}

#[test]
fn test_levels_are_pairwise_disjoint() {
    let grid = plume_grid(40, 40, 0.01, (20, 18), 400.0, 7.0);
    let sets = detector().identify_exceedances(Pollutant::Pm25, &grid);

    let levels: Vec<_> = sets.values().filter(|s| !s.is_empty()).collect();
    assert!(levels.len() >= 4, "plume should reach several levels");

    for (i, a) in levels.iter().enumerate() {
        for b in &levels[i + 1..] {
            let pa = level_union(&a.polygons.iter().map(|p| p.polygon.clone()).collect::<Vec<_>>());
            let pb = level_union(&b.polygons.iter().map(|p| p.polygon.clone()).collect::<Vec<_>>());
            let overlap = pa.intersection(&pb).unsigned_area();
            assert!(overlap < 1e-12, "{} and {} overlap by {}", a.level, b.level, overlap);
        }
    }
}

#[test]
fn test_partition_covers_moderate_mask() {
    let grid = plume_grid(30, 30, 0.01, (15, 15), 300.0, 6.0);
    let detector = detector();
    let sets = detector.identify_exceedances(Pollutant::Pm25, &grid);

    let partition_area: f64 = sets
        .values()
        .flat_map(|s| s.polygons.iter())
        .map(|p| p.polygon.unsigned_area())
        .sum();

    let (mask, stats) = detector
        .detect_exceedance(Pollutant::Pm25, &grid, SeverityLevel::Moderate)
        .unwrap();
    let cell_area = 0.01 * 0.01;
    assert_eq!(stats.exceeded_cells, mask.iter().filter(|m| **m).count());
    assert_approx_eq!(partition_area, stats.exceeded_cells as f64 * cell_area, 1e-9);
}

#[test]
fn test_most_severe_level_contains_peak() {
    let grid = plume_grid(30, 30, 0.01, (10, 20), 400.0, 5.0);
    let sets = detector().identify_exceedances(Pollutant::Pm25, &grid);
    let hazardous = &sets[&SeverityLevel::Hazardous];
    assert_eq!(hazardous.polygons.len(), 1);

    let peak = Point::new(
        grid.transform().node_x(20),
        grid.transform().node_y(10),
    );
    assert!(hazardous.polygons[0].polygon.contains(&peak));
    for level in [SeverityLevel::VeryUnhealthy, SeverityLevel::Moderate] {
        assert!(sets[&level].polygons.iter().all(|p| !p.polygon.contains(&peak)));
    }
}

#[test]
fn test_inner_level_leaves_hole_in_outer_level() {
    // 7x7 block at 200 with a 3x3 core at 300.
    let mut rows = vec![vec![200.0; 7]; 7];
    for row in rows.iter_mut().take(5).skip(2) {
        for v in row.iter_mut().take(5).skip(2) {
            *v = 300.0;
        }
    }
    let grid = grid_from_rows(&rows, (0.0, 0.07), 0.01);
    let sets = detector().identify_exceedances(Pollutant::Pm25, &grid);

    let very = &sets[&SeverityLevel::VeryUnhealthy];
    assert_eq!(very.polygons.len(), 1);
    let unhealthy = &sets[&SeverityLevel::Unhealthy];
    assert_eq!(unhealthy.polygons.len(), 1);
    assert_eq!(unhealthy.polygons[0].polygon.interiors().len(), 1);
    assert_approx_eq!(unhealthy.polygons[0].polygon.unsigned_area(), 40.0 * 1e-4, 1e-12);
}

// ============================================================================
// Thresholds
// ============================================================================

#[test]
fn test_raising_threshold_never_grows_area() {
    let grid = plume_grid(40, 40, 0.01, (20, 20), 320.0, 8.0);
    let mut previous = f64::INFINITY;

    for threshold in [160.0, 180.0, 200.0, 220.0, 240.0] {
        let config = ThresholdConfig {
            threshold_overrides: BTreeMap::from([(
                Pollutant::Pm25,
                LevelTable::from([(SeverityLevel::Unhealthy, threshold)]),
            )]),
            ..Default::default()
        };
        let sets = ThresholdDetector::new(config).identify_exceedances(Pollutant::Pm25, &grid);
        let area = sets[&SeverityLevel::Unhealthy].total_area_km2();
        assert!(area <= previous + 1e-9, "area grew at threshold {threshold}");
        previous = area;
    }
}

#[test]
fn test_value_equal_to_threshold_does_not_exceed() {
    let grid = uniform_grid(3, 3, 0.01, 150.4);
    let sets = detector().identify_exceedances(Pollutant::Pm25, &grid);
    assert!(sets[&SeverityLevel::Unhealthy].is_empty());
    assert_eq!(sets[&SeverityLevel::UnhealthySensitive].polygons.len(), 1);
}

#[test]
fn test_nan_cells_never_exceed() {
    let grid = block_grid(6, 6, 0.01, (0, 0, 3, 6), f64::NAN, 500.0);
    let sets = detector().identify_exceedances(Pollutant::Pm25, &grid);
    let hazardous = &sets[&SeverityLevel::Hazardous];
    assert_eq!(hazardous.polygons.len(), 1);
    assert_approx_eq!(hazardous.polygons[0].polygon.unsigned_area(), 18.0 * 1e-4, 1e-12);
}

#[test]
fn test_area_km2_uses_cos_latitude() {
    // 0.1 degree square at the equator.
    let grid = uniform_grid(10, 10, 0.01, 500.0);
    let sets = detector().identify_exceedances(Pollutant::Pm25, &grid);
    let area = sets[&SeverityLevel::Hazardous].total_area_km2();
    // centroid latitude 0.05 deg
    let expected = 0.1 * 0.1 * 111.0 * 111.0 * 0.05f64.to_radians().cos();
    assert_approx_eq!(area, expected, 1e-6);
}

#[test]
fn test_unknown_level_in_custom_table_reports_empty_set() {
    let table = threshold::ThresholdTable::from_tables(BTreeMap::from([(
        Pollutant::Aqi,
        LevelTable::from([(SeverityLevel::Unhealthy, 100.0)]),
    )]));
    let detector = detector().with_table(table);
    let grid = uniform_grid(4, 4, 0.01, 150.0);
    let sets = detector.identify_exceedances(Pollutant::O3, &grid);

    assert_eq!(sets.len(), 5);
    assert_eq!(sets[&SeverityLevel::Unhealthy].polygons.len(), 1);
    assert_eq!(sets[&SeverityLevel::Hazardous].threshold, None);
    assert!(sets[&SeverityLevel::Hazardous].is_empty());
}

#[test]
fn test_simplification_keeps_rectangles() {
    let config = ThresholdConfig {
        simplify_tolerance: Some(1e-5),
        ..Default::default()
    };
    let grid = block_grid(10, 10, 0.01, (2, 2, 8, 8), 400.0, 0.0);
    let sets = ThresholdDetector::new(config).identify_exceedances(Pollutant::Pm25, &grid);
    let polygon = &sets[&SeverityLevel::Hazardous].polygons[0].polygon;
    assert_eq!(polygon.exterior().0.len(), 5);
}

#[test]
fn test_simplification_on_noisy_grids() {
    let config = ThresholdConfig {
        simplify_tolerance: Some(1e-4),
        ..Default::default()
    };
    let detector = ThresholdDetector::new(config);

    for seed in 0..10u64 {
        let size = 8 + (seed as usize * 2);
        let grid = noise_grid(size, size, 0.01, 400.0, seed);
        let sets = detector.identify_exceedances(Pollutant::Pm25, &grid);

        assert_eq!(sets.len(), 5);
        let total: usize = sets.values().map(|s| s.polygons.len()).sum();
        assert!(total > 0, "seed {seed} produced no polygons");
        for set in sets.values() {
            for p in &set.polygons {
                assert!(p.polygon.exterior().0.len() >= 4);
                assert!(p.area_km2 > 0.0);
            }
        }
    }
}

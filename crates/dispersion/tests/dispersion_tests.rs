//! Integration tests for the dispersion forecast.

use std::sync::{Arc, Mutex};

use air_common::{AirError, AirResult, ArtifactPaths, ArtifactRequest, ArtifactWriter, ConcentrationGrid, Pollutant};
use dispersion::{generate_wind_forecast, DispersionConfig, DispersionError, DispersionModel, GaussianPlume};
use test_utils::{assert_approx_eq, block_grid, plume_grid, uniform_grid};

fn model() -> DispersionModel {
    DispersionModel::new(DispersionConfig::default())
}

/// Mass-weighted (row, col) centre of a grid.
fn centroid(grid: &ConcentrationGrid) -> (f64, f64) {
    let (mut total, mut sr, mut sc) = (0.0, 0.0, 0.0);
    for (idx, v) in grid.values().iter().enumerate() {
        let (row, col) = (idx / grid.width(), idx % grid.width());
        total += v;
        sr += v * row as f64;
        sc += v * col as f64;
    }
    (sr / total, sc / total)
}

// ============================================================================
// Forecast shape and validation
// ============================================================================

#[test]
fn test_predict_returns_initial_plus_steps() {
    let grid = plume_grid(30, 30, 0.01, (15, 15), 200.0, 3.0);
    let wind = generate_wind_forecast(270.0, 3.0, 6.0, 1.0, 42);
    let grids = model().predict(&grid, &wind.directions, &wind.speeds, 6).unwrap();

    assert_eq!(grids.len(), 7);
    assert_eq!(grids[0].values(), grid.values());
    for g in &grids {
        assert_eq!((g.width(), g.height()), (30, 30));
        assert_eq!(g.transform(), grid.transform());
    }
}

#[test]
fn test_zero_steps_returns_initial_only() {
    let grid = uniform_grid(5, 5, 0.01, 10.0);
    let grids = model().predict(&grid, &[], &[], 0).unwrap();
    assert_eq!(grids.len(), 1);
}

#[test]
fn test_wind_length_mismatch_is_rejected() {
    let grid = uniform_grid(5, 5, 0.01, 10.0);
    let result = model().predict(&grid, &[270.0, 270.0], &[3.0], 2);
    assert!(matches!(
        result,
        Err(DispersionError::WindLengthMismatch { directions: 2, speeds: 1, steps: 2 })
    ));
    let err: AirError = result.unwrap_err().into();
    assert!(matches!(err, AirError::Configuration(_)));
}

#[test]
fn test_negative_speed_is_rejected() {
    let grid = uniform_grid(5, 5, 0.01, 10.0);
    let result = model().predict(&grid, &[270.0], &[-1.0], 1);
    assert!(matches!(result, Err(DispersionError::InvalidWind { step: 0, .. })));
}

#[test]
fn test_invalid_decay_is_rejected() {
    let config = DispersionConfig {
        decay_factor: 1.5,
        ..Default::default()
    };
    let grid = uniform_grid(5, 5, 0.01, 10.0);
    let result = DispersionModel::new(config).predict(&grid, &[0.0], &[1.0], 1);
    assert!(matches!(result, Err(DispersionError::InvalidConfig(_))));
}

// ============================================================================
// Physical behaviour
// ============================================================================

#[test]
fn test_calm_wind_mass_decays_geometrically() {
    let grid = plume_grid(40, 40, 0.01, (20, 20), 300.0, 3.0);
    let initial = grid.total_mass();
    let grids = model()
        .predict(&grid, &[0.0; 4], &[0.0; 4], 4)
        .unwrap();

    for (k, g) in grids.iter().enumerate() {
        assert_approx_eq!(g.total_mass(), initial * 0.95f64.powi(k as i32), 1e-6 * initial);
    }
}

#[test]
fn test_point_source_plume_as_initial_grid() {
    let template = uniform_grid(41, 41, 0.01, 0.0);
    let t = *template.transform();
    let source = (t.node_x(10), t.node_y(20));
    let plume = GaussianPlume {
        wind_speed: 5.0,
        wind_direction: 270.0,
        emission_rate: 1.0e6,
        stack_height: 30.0,
    };
    let grid = plume.rasterize(source, &template).unwrap();

    // Nothing upwind of the source, and the plume thins downwind and off-axis.
    for row in 0..41 {
        for col in 0..=10 {
            assert_eq!(grid.get(row, col), Some(0.0));
        }
    }
    let on_axis = grid.get(20, 12).unwrap();
    assert!(on_axis > 0.0);
    assert!(on_axis > grid.get(20, 30).unwrap());
    assert!(grid.get(20, 20).unwrap() > grid.get(17, 20).unwrap());

    let grids = model().predict(&grid, &[0.0; 2], &[0.0; 2], 2).unwrap();
    assert_approx_eq!(grids[2].total_mass(), grid.total_mass() * 0.95 * 0.95, 1e-6 * grid.total_mass());
    let (row, _) = centroid(&grids[2]);
    assert_approx_eq!(row, 20.0, 1e-6);
}

#[test]
fn test_calm_wind_keeps_plume_centred() {
    let grid = plume_grid(41, 41, 0.01, (20, 20), 300.0, 3.0);
    let grids = model().predict(&grid, &[0.0; 3], &[0.0; 3], 3).unwrap();
    let (row, col) = centroid(&grids[3]);
    assert_approx_eq!(row, 20.0, 1e-6);
    assert_approx_eq!(col, 20.0, 1e-6);
}

#[test]
fn test_westerly_wind_advects_east() {
    // 3.6 m/s for one hour moves one cell per step.
    let grid = plume_grid(60, 40, 0.01, (20, 15), 300.0, 3.0);
    let grids = model()
        .predict(&grid, &[270.0; 3], &[3.6; 3], 3)
        .unwrap();

    let (row0, col0) = centroid(&grids[0]);
    let (row3, col3) = centroid(&grids[3]);
    assert!((col3 - col0 - 3.0).abs() < 0.1, "moved {} cells", col3 - col0);
    assert!((row3 - row0).abs() < 0.1);
}

#[test]
fn test_southerly_wind_advects_north() {
    let grid = plume_grid(40, 60, 0.01, (40, 20), 300.0, 3.0);
    let grids = model()
        .predict(&grid, &[180.0; 2], &[7.2; 2], 2)
        .unwrap();

    let (row0, _) = centroid(&grids[0]);
    let (row2, _) = centroid(&grids[2]);
    // Row 0 is north, so moving north lowers the row index.
    assert!((row0 - row2 - 4.0).abs() < 0.1, "moved {} rows", row0 - row2);
}

#[test]
fn test_mass_leaves_through_downwind_edge() {
    let grid = block_grid(10, 10, 0.01, (4, 7, 6, 10), 100.0, 0.0);
    let initial = grid.total_mass();
    let grids = model().predict(&grid, &[270.0], &[3.6 * 4.0], 1).unwrap();
    assert!(grids[1].total_mass() < initial * 0.95 * 0.5);
}

#[test]
fn test_stronger_wind_spreads_more() {
    let grid = plume_grid(41, 41, 0.01, (20, 20), 300.0, 2.0);
    // Opposite directions cancel advection over two steps.
    let calm = model().predict(&grid, &[0.0; 2], &[0.0; 2], 2).unwrap();
    let windy = model()
        .predict(&grid, &[90.0, 270.0], &[3.6, 3.6], 2)
        .unwrap();

    let peak = |g: &ConcentrationGrid| g.values().iter().cloned().fold(f64::MIN, f64::max);
    assert!(peak(&windy[2]) < peak(&calm[2]));
}

#[test]
fn test_nan_cells_are_treated_as_zero() {
    let grid = block_grid(6, 6, 0.01, (0, 0, 2, 2), f64::NAN, 50.0);
    let grids = model().predict(&grid, &[0.0], &[1.0], 1).unwrap();
    assert!(grids[0].values()[0] == 0.0);
    assert!(grids.iter().all(|g| g.values().iter().all(|v| v.is_finite())));
}

#[test]
fn test_predict_is_deterministic() {
    let grid = plume_grid(30, 30, 0.01, (10, 12), 250.0, 4.0);
    let wind = generate_wind_forecast(200.0, 2.5, 4.0, 1.0, 7);
    let a = model().predict(&grid, &wind.directions, &wind.speeds, wind.len()).unwrap();
    let b = model().predict(&grid, &wind.directions, &wind.speeds, wind.len()).unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// Artifacts
// ============================================================================

#[derive(Default)]
struct RecordingWriter {
    names: Mutex<Vec<String>>,
}

impl ArtifactWriter for RecordingWriter {
    fn save(
        &self,
        _grid: &ConcentrationGrid,
        request: &ArtifactRequest,
        metadata: &serde_json::Value,
    ) -> AirResult<ArtifactPaths> {
        assert_eq!(metadata["pollutant"], "pm25");
        self.names.lock().unwrap().push(request.name.clone());
        Ok(ArtifactPaths {
            raster: format!("{}.asc", request.name).into(),
            visualization: format!("{}.png", request.name).into(),
            metadata: format!("{}_metadata.json", request.name).into(),
        })
    }
}

struct FailOnSecond {
    calls: Mutex<usize>,
}

impl ArtifactWriter for FailOnSecond {
    fn save(
        &self,
        _grid: &ConcentrationGrid,
        request: &ArtifactRequest,
        _metadata: &serde_json::Value,
    ) -> AirResult<ArtifactPaths> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls == 2 {
            return Err(AirError::Artifact("disk full".to_string()));
        }
        Ok(ArtifactPaths {
            raster: request.name.clone().into(),
            visualization: request.name.clone().into(),
            metadata: request.name.clone().into(),
        })
    }
}

#[test]
fn test_predict_and_save_names_each_step() {
    let writer = Arc::new(RecordingWriter::default());
    let model = model().with_artifact_writer(writer.clone());
    let grid = plume_grid(20, 20, 0.01, (10, 10), 200.0, 3.0);

    let output = model
        .predict_and_save(Pollutant::Pm25, &grid, &[270.0; 3], &[2.0; 3], 3)
        .unwrap();

    assert_eq!(output.grids.len(), 4);
    assert!(output.artifacts.iter().all(Option::is_some));

    let names = writer.names.lock().unwrap();
    assert_eq!(names.len(), 4);
    assert!(names[0].starts_with("pm25_dispersion_"));
    assert!(names[0].ends_with("_initial"));
    assert!(names[1].ends_with("_plus1h"));
    assert!(names[3].ends_with("_plus3h"));
}

#[test]
fn test_save_failure_does_not_abort_forecast() {
    let writer = Arc::new(FailOnSecond { calls: Mutex::new(0) });
    let model = model().with_artifact_writer(writer);
    let grid = uniform_grid(8, 8, 0.01, 20.0);

    let output = model
        .predict_and_save(Pollutant::No2, &grid, &[0.0; 2], &[1.0; 2], 2)
        .unwrap();

    assert_eq!(output.grids.len(), 3);
    assert!(output.artifacts[0].is_some());
    assert!(output.artifacts[1].is_none());
    assert!(output.artifacts[2].is_some());
}

#[test]
fn test_predict_and_save_without_writer() {
    let grid = uniform_grid(4, 4, 0.01, 20.0);
    let output = model()
        .predict_and_save(Pollutant::Co, &grid, &[0.0], &[1.0], 1)
        .unwrap();
    assert_eq!(output.artifacts, vec![None, None]);
}

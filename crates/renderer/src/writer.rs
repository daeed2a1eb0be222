//! Filesystem implementation of [`ArtifactWriter`].

use std::fs;
use std::path::{Path, PathBuf};

use air_common::{AirResult, ArtifactPaths, ArtifactRequest, ArtifactWriter, ConcentrationGrid};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::ascii_grid::{to_ascii_grid, WGS84_WKT};
use crate::colormap::{render_grid, RenderStyle};
use crate::error::Result;
use crate::png;

/// Writes `{name}.asc`, `{name}.prj`, `{name}.png` and
/// `{name}_metadata.json` into one output directory.
///
/// # Example
///
/// ```rust,ignore
/// let writer = Arc::new(FsArtifactWriter::new("output"));
/// let interpolator = Interpolator::new(config).with_artifact_writer(writer);
/// ```
#[derive(Debug, Clone)]
pub struct FsArtifactWriter {
    output_dir: PathBuf,
    style: RenderStyle,
}

impl FsArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            style: RenderStyle::default(),
        }
    }

    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_all(&self, grid: &ConcentrationGrid, request: &ArtifactRequest, metadata: &Value) -> Result<ArtifactPaths> {
        fs::create_dir_all(&self.output_dir)?;

        let raster = self.output_dir.join(format!("{}.asc", request.name));
        fs::write(&raster, to_ascii_grid(grid))?;
        fs::write(raster.with_extension("prj"), WGS84_WKT)?;

        let image = render_grid(grid, &self.style);
        let visualization = self.output_dir.join(format!("{}.png", request.name));
        fs::write(&visualization, png::encode(&image.pixels, image.width, image.height)?)?;

        let sidecar = self.output_dir.join(format!("{}_metadata.json", request.name));
        let document = sidecar_document(grid, request, metadata);
        fs::write(&sidecar, serde_json::to_vec_pretty(&document)?)?;

        debug!(
            name = %request.name,
            width = image.width,
            height = image.height,
            "Rendered grid image"
        );

        Ok(ArtifactPaths {
            raster,
            visualization,
            metadata: sidecar,
        })
    }
}

/// Caller metadata plus the title, legend, CRS, geotransform and value range.
///
/// Caller keys win when both define the same field.
fn sidecar_document(grid: &ConcentrationGrid, request: &ArtifactRequest, metadata: &Value) -> Value {
    let stats = grid.stats();
    let mut document = json!({
        "title": request.title,
        "legend": request.legend,
        "crs": grid.crs(),
        "geotransform": grid.transform().coefficients(),
        "width": grid.width(),
        "height": grid.height(),
        "min_value": stats.map(|s| s.min),
        "max_value": stats.map(|s| s.max),
        "mean_value": stats.map(|s| s.mean),
    });

    if let (Some(base), Some(extra)) = (document.as_object_mut(), metadata.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    document
}

impl ArtifactWriter for FsArtifactWriter {
    fn save(&self, grid: &ConcentrationGrid, request: &ArtifactRequest, metadata: &Value) -> AirResult<ArtifactPaths> {
        let paths = self.write_all(grid, request, metadata)?;
        info!(
            name = %request.name,
            raster = %paths.raster.display(),
            "Saved grid artifacts"
        );
        Ok(paths)
    }
}

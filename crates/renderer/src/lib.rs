//! Artifact rendering for concentration grids.
//!
//! - `ascii_grid`: ESRI ASCII raster + `.prj` WKT (EPSG:4326)
//! - `colormap`: jet colour ramp, NaN as transparent, optional colour bar
//! - `png`: indexed/truecolour PNG encoder
//! - `writer`: [`FsArtifactWriter`], the filesystem `ArtifactWriter`

pub mod ascii_grid;
pub mod colormap;
pub mod error;
pub mod png;
pub mod writer;

pub use colormap::{jet, render_grid, Color, RenderStyle, RgbaImage};
pub use error::{RenderError, Result};
pub use writer::FsArtifactWriter;

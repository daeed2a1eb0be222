//! ESRI ASCII grid raster with a `.prj` sidecar.
//!
//! ```text
//! ncols        21
//! nrows        21
//! xllcorner    77.104
//! yllcorner    28.5089
//! cellsize     0.01
//! NODATA_value -9999
//! <nrows lines, northernmost first>
//! ```

use std::fmt::Write;

use air_common::{ConcentrationGrid, GeoTransform};

use crate::error::{RenderError, Result};

/// Written in place of NaN cells.
pub const NODATA_VALUE: f64 = -9999.0;

/// WKT for EPSG:4326 as written to `.prj` files.
pub const WGS84_WKT: &str = concat!(
    "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],",
    "PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]]"
);

/// Serialise a grid.
pub fn to_ascii_grid(grid: &ConcentrationGrid) -> String {
    let t = grid.transform();
    let yll = t.origin_y - grid.height() as f64 * t.cell_size;

    let mut out = String::with_capacity(grid.width() * grid.height() * 8 + 128);
    let _ = writeln!(out, "ncols        {}", grid.width());
    let _ = writeln!(out, "nrows        {}", grid.height());
    let _ = writeln!(out, "xllcorner    {}", t.origin_x);
    let _ = writeln!(out, "yllcorner    {}", yll);
    let _ = writeln!(out, "cellsize     {}", t.cell_size);
    let _ = writeln!(out, "NODATA_value {}", NODATA_VALUE);

    for row in grid.values().chunks(grid.width()) {
        let line: Vec<String> = row
            .iter()
            .map(|v| {
                if v.is_finite() {
                    format!("{}", v)
                } else {
                    format!("{}", NODATA_VALUE)
                }
            })
            .collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

/// Parse a grid written by [`to_ascii_grid`]. NODATA cells become NaN.
pub fn parse_ascii_grid(text: &str) -> Result<ConcentrationGrid> {
    let mut lines = text.lines();
    let mut header = |key: &str| -> Result<f64> {
        let line = lines.next().ok_or_else(|| parse_error(format!("missing {}", key)))?;
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(k), Some(v)) if k.eq_ignore_ascii_case(key) => v
                .parse()
                .map_err(|_| parse_error(format!("bad {} value '{}'", key, v))),
            _ => Err(parse_error(format!("expected {} header, got '{}'", key, line))),
        }
    };

    let width = header("ncols")? as usize;
    let height = header("nrows")? as usize;
    let xll = header("xllcorner")?;
    let yll = header("yllcorner")?;
    let cell_size = header("cellsize")?;
    let nodata = header("NODATA_value")?;

    let values = lines
        .flat_map(str::split_whitespace)
        .map(|token| {
            token
                .parse::<f64>()
                .map(|v| if v == nodata { f64::NAN } else { v })
                .map_err(|_| parse_error(format!("bad cell value '{}'", token)))
        })
        .collect::<Result<Vec<f64>>>()?;

    let transform = GeoTransform::new(xll, yll + height as f64 * cell_size, cell_size);
    ConcentrationGrid::new(width, height, values, transform).map_err(|e| parse_error(e.to_string()))
}

fn parse_error(msg: String) -> RenderError {
    RenderError::Parse(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_row_order() {
        let grid = ConcentrationGrid::new(2, 2, vec![1.0, 2.0, 3.0, f64::NAN], GeoTransform::new(10.0, 20.0, 0.5))
            .unwrap();
        let text = to_ascii_grid(&grid);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ncols        2");
        assert_eq!(lines[3], "yllcorner    19");
        assert_eq!(lines[6], "1 2");
        assert_eq!(lines[7], "3 -9999");
    }

    #[test]
    fn test_parse_restores_geometry_and_nan() {
        let grid = ConcentrationGrid::new(3, 1, vec![0.25, f64::NAN, 7.0], GeoTransform::new(-1.0, 2.0, 0.1)).unwrap();
        let parsed = parse_ascii_grid(&to_ascii_grid(&grid)).unwrap();
        assert_eq!(parsed.width(), 3);
        assert_eq!(parsed.height(), 1);
        assert!((parsed.transform().origin_y - 2.0).abs() < 1e-12);
        assert_eq!(parsed.values()[0], 0.25);
        assert!(parsed.values()[1].is_nan());
    }

    #[test]
    fn test_parse_rejects_short_body() {
        let text = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n1 2 3\n";
        assert!(matches!(parse_ascii_grid(text), Err(RenderError::Parse(_))));
    }
}

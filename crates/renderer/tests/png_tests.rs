//! Tests for PNG encoding of rendered grids.

use std::io::Read;

use renderer::png::{encode, encode_rgba};
use renderer::{render_grid, RenderError, RenderStyle};
use test_utils::{block_grid, plume_grid};

// ============================================================================
// Helper functions
// ============================================================================

/// Split a PNG into `(type, data)` chunks, checking the signature.
fn chunks(png: &[u8]) -> Vec<(String, Vec<u8>)> {
    assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    let mut out = Vec::new();
    let mut pos = 8;
    while pos < png.len() {
        let len = u32::from_be_bytes(png[pos..pos + 4].try_into().unwrap()) as usize;
        let kind = String::from_utf8(png[pos + 4..pos + 8].to_vec()).unwrap();
        let data = png[pos + 8..pos + 8 + len].to_vec();
        let crc = u32::from_be_bytes(png[pos + 8 + len..pos + 12 + len].try_into().unwrap());
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(kind.as_bytes());
        hasher.update(&data);
        assert_eq!(crc, hasher.finalize(), "bad CRC in {kind}");
        out.push((kind, data));
        pos += 12 + len;
    }
    out
}

fn inflate(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_few_colours_use_indexed_png() {
    let pixels = [255, 0, 0, 255, 0, 255, 0, 255, 0, 255, 0, 255, 255, 0, 0, 255];
    let png = encode(&pixels, 2, 2).unwrap();
    let chunks = chunks(&png);

    let kinds: Vec<&str> = chunks.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(kinds, vec!["IHDR", "PLTE", "IDAT", "IEND"]);
    assert_eq!(chunks[0].1[9], 3);
    assert_eq!(chunks[1].1.len(), 6);
    assert_eq!(inflate(&chunks[2].1), vec![0, 0, 1, 0, 1, 0]);
}

#[test]
fn test_transparent_palette_entry_adds_trns() {
    let pixels = [0, 0, 0, 0, 10, 20, 30, 255];
    let chunks = chunks(&encode(&pixels, 2, 1).unwrap());
    let trns = chunks.iter().find(|(k, _)| k == "tRNS").expect("tRNS chunk");
    assert_eq!(trns.1, vec![0, 255]);
}

#[test]
fn test_many_colours_fall_back_to_rgba() {
    let pixels: Vec<u8> = (0..400u32)
        .flat_map(|i| [(i % 256) as u8, (i / 256) as u8, 7, 255])
        .collect();
    let chunks = chunks(&encode(&pixels, 20, 20).unwrap());
    assert_eq!(chunks[0].1[9], 6);
    assert_eq!(inflate(&chunks[1].1).len(), 20 * (1 + 20 * 4));
}

#[test]
fn test_rgba_scanlines_roundtrip() {
    let pixels: Vec<u8> = (0..2 * 3 * 4).map(|v| v as u8).collect();
    let chunks = chunks(&encode_rgba(&pixels, 2, 3).unwrap());
    let raw = inflate(&chunks[1].1);
    assert_eq!(raw[0], 0);
    assert_eq!(&raw[1..9], &pixels[0..8]);
    assert_eq!(raw[9], 0);
}

#[test]
fn test_dimension_mismatch_is_rejected() {
    assert!(matches!(
        encode(&[0, 0, 0, 255], 2, 2),
        Err(RenderError::Dimensions { width: 2, height: 2, len: 4 })
    ));
    assert!(encode(&[], 0, 0).is_err());
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_render_scales_and_appends_colorbar() {
    let grid = plume_grid(10, 6, 0.01, (3, 5), 100.0, 2.0);
    let style = RenderStyle {
        pixels_per_cell: 3,
        colorbar: true,
    };
    let image = render_grid(&grid, &style);
    assert_eq!(image.height, 18);
    assert_eq!(image.width, 30 + 4 + 12);
    assert_eq!(image.pixels.len(), image.width * image.height * 4);

    // Gap between map and colour bar is transparent.
    let gap = (image.width * 5 + 31) * 4;
    assert_eq!(image.pixels[gap + 3], 0);
}

#[test]
fn test_render_nan_is_transparent_and_peak_is_red() {
    let grid = block_grid(4, 4, 0.01, (0, 0, 1, 1), f64::NAN, 10.0);
    let mut rows = grid.values().to_vec();
    rows[15] = 50.0;
    let grid = grid.with_values(rows).unwrap();

    let style = RenderStyle {
        pixels_per_cell: 1,
        colorbar: false,
    };
    let image = render_grid(&grid, &style);
    assert_eq!(image.width, 4);
    assert_eq!(&image.pixels[0..4], &[0, 0, 0, 0]);
    assert_eq!(&image.pixels[15 * 4..16 * 4], &[128, 0, 0, 255]);
    assert_eq!(&image.pixels[4..8], &[0, 0, 128, 255]);
}

#[test]
fn test_rendered_grid_encodes() {
    let grid = plume_grid(32, 32, 0.01, (16, 16), 250.0, 6.0);
    let image = render_grid(&grid, &RenderStyle::default());
    let png = encode(&image.pixels, image.width, image.height).unwrap();
    let chunks = chunks(&png);
    let ihdr = &chunks[0].1;
    assert_eq!(u32::from_be_bytes(ihdr[0..4].try_into().unwrap()) as usize, image.width);
    assert_eq!(u32::from_be_bytes(ihdr[4..8].try_into().unwrap()) as usize, image.height);
}

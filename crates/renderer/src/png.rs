//! Minimal PNG encoder for RGBA buffers.
//!
//! Concentration maps use a continuous ramp but quantise to at most a few
//! hundred colours, so [`encode`] first tries an indexed image (colour type 3)
//! and only falls back to truecolour with alpha (colour type 6) when the
//! palette overflows.

use std::collections::HashMap;
use std::io::Write;

use crate::error::{RenderError, Result};

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Largest palette an 8-bit indexed PNG can carry.
const MAX_PALETTE_SIZE: usize = 256;

const COLOR_TYPE_INDEXED: u8 = 3;
const COLOR_TYPE_RGBA: u8 = 6;

type Rgba = [u8; 4];

/// Encode RGBA pixels, choosing indexed or truecolour output.
pub fn encode(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_dimensions(pixels, width, height)?;
    match build_palette(pixels) {
        Some((palette, indices)) => encode_indexed(width, height, &palette, &indices),
        None => encode_rgba(pixels, width, height),
    }
}

/// Encode RGBA pixels as colour type 6.
pub fn encode_rgba(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_dimensions(pixels, width, height)?;
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &header(width, height, COLOR_TYPE_RGBA));
    write_chunk(&mut png, b"IDAT", &compress_scanlines(pixels, width * 4, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn encode_indexed(width: usize, height: usize, palette: &[Rgba], indices: &[u8]) -> Result<Vec<u8>> {
    let mut png = SIGNATURE.to_vec();
    write_chunk(&mut png, b"IHDR", &header(width, height, COLOR_TYPE_INDEXED));

    let plte: Vec<u8> = palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect();
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    write_chunk(&mut png, b"IDAT", &compress_scanlines(indices, width, height)?);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn check_dimensions(pixels: &[u8], width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 || pixels.len() != width * height * 4 {
        return Err(RenderError::Dimensions {
            width,
            height,
            len: pixels.len(),
        });
    }
    Ok(())
}

/// Palette in first-seen order plus one index per pixel, or `None` when
/// the image has more than 256 colours.
fn build_palette(pixels: &[u8]) -> Option<(Vec<Rgba>, Vec<u8>)> {
    let mut lookup: HashMap<Rgba, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let color = [px[0], px[1], px[2], px[3]];
        let index = match lookup.get(&color) {
            Some(&i) => i,
            None => {
                if palette.len() == MAX_PALETTE_SIZE {
                    return None;
                }
                let i = palette.len() as u8;
                palette.push(color);
                lookup.insert(color, i);
                i
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

fn header(width: usize, height: usize, color_type: u8) -> Vec<u8> {
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    // bit depth, colour type, compression, filter, interlace
    ihdr.extend_from_slice(&[8, color_type, 0, 0, 0]);
    ihdr
}

/// Prefix every row with filter type 0 and zlib-compress the result.
fn compress_scanlines(data: &[u8], row_bytes: usize, height: usize) -> Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(height * (row_bytes + 1));
    for row in data.chunks_exact(row_bytes).take(height) {
        raw.push(0);
        raw.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder
        .write_all(&raw)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    encoder.finish().map_err(|e| RenderError::Encode(e.to_string()))
}

fn write_chunk(png: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(kind);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_reuses_indices() {
        let pixels = [255, 0, 0, 255, 0, 255, 0, 255, 255, 0, 0, 255];
        let (palette, indices) = build_palette(&pixels).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(indices, vec![0, 1, 0]);
    }

    #[test]
    fn test_palette_overflow() {
        let pixels: Vec<u8> = (0..300u32).flat_map(|i| [(i % 256) as u8, (i / 256) as u8, 0, 255]).collect();
        assert!(build_palette(&pixels).is_none());
    }

    #[test]
    fn test_header_layout() {
        let ihdr = header(3, 2, COLOR_TYPE_INDEXED);
        assert_eq!(ihdr, vec![0, 0, 0, 3, 0, 0, 0, 2, 8, 3, 0, 0, 0]);
    }

    #[test]
    fn test_chunk_crc_covers_type_and_data() {
        let mut png = Vec::new();
        write_chunk(&mut png, b"IEND", &[]);
        // Well-known CRC of an empty IEND chunk.
        assert_eq!(&png[8..], &[0xAE, 0x42, 0x60, 0x82]);
    }
}

//! Perceptual hash computation
//!
//! Computes a blurhash string from an image buffer: decode, expand to RGBA8
//! and encode over the configured component grid (default 4×4). Always runs
//! against the original buffer, never a variant.

use affix_core::BlurhashComponents;
use anyhow::{anyhow, Context, Result};

/// Encode `buffer` (any decodable image) into a blurhash string.
pub fn image_to_blurhash(buffer: &[u8], components: BlurhashComponents) -> Result<String> {
    let img = image::load_from_memory(buffer).context("failed to decode image for blurhash")?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    blurhash::encode(components.x, components.y, width, height, rgba.as_raw())
        .map_err(|e| anyhow!("blurhash encoding failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn solid_png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(pixel));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_encodes_image() {
        let data = solid_png(32, 32, [200, 40, 40, 255]);
        let hash = image_to_blurhash(&data, BlurhashComponents::default()).unwrap();
        assert!(!hash.is_empty());
    }

    #[test]
    fn test_component_grid_changes_hash_length() {
        let data = solid_png(32, 32, [10, 180, 70, 255]);
        let small = image_to_blurhash(&data, BlurhashComponents { x: 1, y: 1 }).unwrap();
        let large = image_to_blurhash(&data, BlurhashComponents { x: 8, y: 8 }).unwrap();
        assert!(large.len() > small.len());
    }

    #[test]
    fn test_rejects_non_image() {
        let err = image_to_blurhash(b"definitely not pixels", BlurhashComponents::default());
        assert!(err.is_err());
    }
}

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use log::info;
use thiserror::Error;

use super::{HeightField, MAX_HEIGHT};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot open height map {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Height map must be square, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },
    #[error("Height map needs at least 2x2 samples, got {0}x{0}")]
    TooSmall(u32),
}

/// Convert one 8-bit channel sample into a terrain height.
///
/// Samples are centred on mid-grey, so 0 maps to `-MAX_HEIGHT` and 255 to
/// `MAX_HEIGHT`.
pub fn sample_to_height(sample: u8) -> f32 {
    const HALF: f32 = 255.0 / 2.0;
    (sample as f32 - HALF) / HALF * MAX_HEIGHT
}

/// Load a height-map image from disk into a tile at the given origin.
pub fn load_height_map<P: AsRef<Path>>(
    path: P,
    origin_x: f32,
    origin_z: f32,
    size: f32,
) -> Result<HeightField, LoadError> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| LoadError::Image {
        path: path.display().to_string(),
        source,
    })?;

    let field = height_field_from_image(&image, origin_x, origin_z, size)?;
    let (min, max) = field.height_bounds();
    info!(
        "Loaded height map {}: {}x{} samples, heights {:.1} to {:.1}",
        path.display(),
        field.resolution(),
        field.resolution(),
        min,
        max
    );
    Ok(field)
}

/// Build a tile from an already decoded image, reading the red channel.
///
/// Pixel `(x, y)` becomes grid column `x`, row `y`.
pub fn height_field_from_image(
    image: &DynamicImage,
    origin_x: f32,
    origin_z: f32,
    size: f32,
) -> Result<HeightField, LoadError> {
    let (width, height) = image.dimensions();
    if width != height {
        return Err(LoadError::NotSquare { width, height });
    }
    if width < 2 {
        return Err(LoadError::TooSmall(width));
    }

    let rgba = image.to_rgba8();
    let heights = rgba.pixels().map(|p| sample_to_height(p.0[0])).collect();

    HeightField::new(origin_x, origin_z, size, width as usize, heights)
        .ok_or(LoadError::TooSmall(width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::GroundHeight;
    use image::{Rgba, RgbaImage};

    fn grey(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> DynamicImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            let v = f(x, y);
            Rgba([v, v, v, 255])
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_sample_range() {
        assert!((sample_to_height(0) + MAX_HEIGHT).abs() < 1e-4);
        assert!((sample_to_height(255) - MAX_HEIGHT).abs() < 1e-4);
        assert!(sample_to_height(127).abs() < 0.2);
    }

    #[test]
    fn test_pixels_map_to_grid() {
        let image = grey(3, 3, |x, y| if x == 2 && y == 0 { 255 } else { 0 });
        let field = height_field_from_image(&image, 0.0, 0.0, 2.0).unwrap();

        assert_eq!(field.resolution(), 3);
        assert!((field.grid_height(2, 0) - MAX_HEIGHT).abs() < 1e-4);
        assert!((field.grid_height(0, 2) + MAX_HEIGHT).abs() < 1e-4);
    }

    #[test]
    fn test_reads_red_channel_only() {
        let img = RgbaImage::from_fn(2, 2, |_, _| Rgba([255, 0, 0, 255]));
        let field = height_field_from_image(&DynamicImage::ImageRgba8(img), 0.0, 0.0, 1.0).unwrap();
        assert!((field.grid_height(1, 1) - MAX_HEIGHT).abs() < 1e-4);
    }

    #[test]
    fn test_rejects_non_square() {
        let image = grey(4, 3, |_, _| 0);
        let result = height_field_from_image(&image, 0.0, 0.0, 1.0);
        assert!(matches!(result, Err(LoadError::NotSquare { width: 4, height: 3 })));
    }

    #[test]
    fn test_rejects_single_pixel() {
        let image = grey(1, 1, |_, _| 0);
        let result = height_field_from_image(&image, 0.0, 0.0, 1.0);
        assert!(matches!(result, Err(LoadError::TooSmall(1))));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heightmap.png");
        grey(5, 5, |x, _| (x * 60) as u8).save(&path).unwrap();

        let field = load_height_map(&path, 0.0, 0.0, 4.0).unwrap();
        assert_eq!(field.resolution(), 5);
        assert!((field.height_at(2.0, 1.0) - sample_to_height(120)).abs() < 1e-4);
    }

    #[test]
    fn test_missing_file() {
        let result = load_height_map("/nonexistent/heightmap.png", 0.0, 0.0, 1.0);
        assert!(matches!(result, Err(LoadError::Image { .. })));
    }
}

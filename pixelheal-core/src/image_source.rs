//! Image decoding and grid sampling

use crate::error::EngineError;
use crate::particle::{ColorKey, Particle};
use crate::settings::ParticleSettings;
use glam::Vec2;
use image::RgbaImage;
use std::ops::Range;
use std::path::Path;

/// Decode an encoded image (PNG or JPEG) into RGBA8
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, EngineError> {
    let image = image::load_from_memory(bytes)?.into_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(EngineError::EmptyImage);
    }
    Ok(image)
}

/// Load an image file into RGBA8
pub fn load_image(path: impl AsRef<Path>) -> Result<RgbaImage, EngineError> {
    let image = image::open(path)?.into_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(EngineError::EmptyImage);
    }
    Ok(image)
}

/// Sampling step: `max(1, floor(sqrt(width * height / density)))`
pub fn grid_step(width: u32, height: u32, density: f32) -> u32 {
    let density = if density.is_finite() && density > 0.0 {
        density as f64
    } else {
        1.0
    };
    let step = ((width as f64 * height as f64) / density).sqrt().floor();
    (step as u32).max(1)
}

/// Split the canvas into `tile_size` squares, row-major
pub fn tile_regions(width: u32, height: u32, tile_size: u32) -> Vec<(Range<u32>, Range<u32>)> {
    let tile = tile_size.max(1);
    let mut tiles = Vec::new();
    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            tiles.push((x..(x + tile).min(width), y..(y + tile).min(height)));
            x += tile;
        }
        y += tile;
    }
    tiles
}

/// Append one particle per lattice point inside the region
pub fn sample_region(
    image: &RgbaImage,
    step: u32,
    xs: Range<u32>,
    ys: Range<u32>,
    settings: &ParticleSettings,
    out: &mut Vec<Particle>,
) {
    let step = step.max(1);
    let first = |start: u32| start.div_ceil(step) * step;
    let mut y = first(ys.start);
    while y < ys.end {
        let mut x = first(xs.start);
        while x < xs.end {
            let [r, g, b, a] = image.get_pixel(x, y).0;
            if a >= settings.alpha_threshold {
                out.push(Particle::new(
                    Vec2::new(x as f32, y as f32),
                    ColorKey::quantized(r, g, b),
                    settings.size,
                    settings.shape,
                ));
            }
            x += step;
        }
        y += step;
    }
}

/// Sample the whole image in one pass
pub fn sample_particles(image: &RgbaImage, settings: &ParticleSettings) -> Vec<Particle> {
    let step = grid_step(image.width(), image.height(), settings.density);
    let mut out = Vec::new();
    sample_region(image, step, 0..image.width(), 0..image.height(), settings, &mut out);
    out
}

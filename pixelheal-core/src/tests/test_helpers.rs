//! Test helper utilities for pixelheal tests

use crate::engine::Engine;
use crate::recording::{AnimationRecording, RecordedInput};
use crate::settings::ForceFieldSettings;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Check if two f64 values are approximately equal within tolerance
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// Check if two f32 values are approximately equal within tolerance
pub fn approx_eq_f32(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() <= tol
}

/// Image filled with a single color
pub fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
}

/// Image built from row-major pixels
pub fn image_from_pixels(width: u32, height: u32, pixels: &[[u8; 4]]) -> RgbaImage {
    assert_eq!(pixels.len(), (width * height) as usize, "pixel count");
    RgbaImage::from_fn(width, height, |x, y| Rgba(pixels[(y * width + x) as usize]))
}

/// Left half one color, right half another
pub fn split_image(width: u32, height: u32, left: [u8; 4], right: [u8; 4]) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, _| if x < width / 2 { Rgba(left) } else { Rgba(right) })
}

/// PNG-encode an image, as embedded in recordings
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Settings that sample one particle per pixel of a `width` x `height` image
pub fn pixel_perfect_settings(width: u32, height: u32) -> ForceFieldSettings {
    let mut settings = ForceFieldSettings::default();
    settings.particles.density = (width * height) as f32;
    settings
}

/// Engine with one particle per pixel of `image`
pub fn engine_for(image: &RgbaImage) -> Engine {
    let mut engine = Engine::new(pixel_perfect_settings(image.width(), image.height()));
    engine.generate_particles_from_image(image);
    engine
}

/// Recording of `image` with the given settings and inputs
pub fn make_recording(
    image: &RgbaImage,
    settings: ForceFieldSettings,
    duration_ms: f64,
    inputs: Vec<RecordedInput>,
) -> Result<AnimationRecording, Box<dyn std::error::Error>> {
    Ok(AnimationRecording {
        duration: duration_ms,
        fps: settings.fps,
        width: image.width(),
        height: image.height(),
        image_data: encode_png(image)?,
        initial_settings: settings,
        inputs,
    })
}

/// Largest distance any particle sits from its origin
pub fn max_displacement(engine: &Engine) -> f32 {
    engine
        .particles()
        .iter()
        .map(|p| p.distance_to_origin())
        .fold(0.0, f32::max)
}

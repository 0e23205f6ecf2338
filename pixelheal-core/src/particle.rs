use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of levels per channel kept by color quantization
pub const COLOR_LEVELS: u32 = 16;

/// Shape used when drawing a particle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParticleShape {
    #[default]
    Circle,
    Square,
    Triangle,
}

/// Opaque color key of the form `#rrggbb`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorKey(String);

impl ColorKey {
    /// Build a key from exact channel values
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{:02x}{:02x}{:02x}", r, g, b))
    }

    /// Build a key after snapping each channel to one of `COLOR_LEVELS` levels
    pub fn quantized(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgb(quantize_channel(r), quantize_channel(g), quantize_channel(b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the key back into channels; `None` for keys not in `#rrggbb` form
    pub fn rgb(&self) -> Option<[u8; 3]> {
        let hex = self.0.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some([channel(0)?, channel(2)?, channel(4)?])
    }

    /// Euclidean RGB distance between two keys, `None` if either is not decodable
    pub fn distance(&self, other: &ColorKey) -> Option<f32> {
        let a = self.rgb()?;
        let b = other.rgb()?;
        let sq: f32 = a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| {
                let d = *x as f32 - *y as f32;
                d * d
            })
            .sum();
        Some(sq.sqrt())
    }
}

impl From<&str> for ColorKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn quantize_channel(c: u8) -> u8 {
    let step = 255 / (COLOR_LEVELS - 1);
    let level = (c as u32 + step / 2) / step;
    (level * step).min(255) as u8
}

/// A particle sampled from one image pixel
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    origin: Vec2,
    pub color: ColorKey,
    pub size: f32,
    pub shape: ParticleShape,
    pub visible: bool,
    pub healing_multiplier: Option<f32>,
}

impl Particle {
    pub fn new(origin: Vec2, color: ColorKey, size: f32, shape: ParticleShape) -> Self {
        Self {
            pos: origin,
            vel: Vec2::ZERO,
            origin,
            color,
            size,
            shape,
            visible: true,
            healing_multiplier: None,
        }
    }

    /// Sample coordinate this particle heals back to
    #[inline]
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn distance_to_origin(&self) -> f32 {
        self.pos.distance(self.origin)
    }

    /// Zero velocity and snap back to the origin
    pub fn reset(&mut self) {
        self.pos = self.origin;
        self.vel = Vec2::ZERO;
    }
}

//! CPU rasteriser for particles
//!
//! Reads particle snapshots and writes pixels; it never touches simulation
//! state. Hidden particles are skipped just like in the physics step.

use crate::error::EngineError;
use crate::particle::{Particle, ParticleShape};
use crate::settings::RenderSettings;
use glam::Vec2;
use image::{Rgba, RgbaImage};

/// Largest surface the renderer will allocate, in bytes
pub const MAX_SURFACE_BYTES: u64 = 1 << 30;

const FALLBACK_COLOR: [u8; 3] = [255, 255, 255];

#[derive(Debug, Default)]
pub struct Renderer {
    drawn_last_frame: usize,
    frames: u64,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an off-screen surface filled with the background color
    pub fn allocate_surface(
        width: u32,
        height: u32,
        settings: &RenderSettings,
    ) -> Result<RgbaImage, EngineError> {
        let bytes = (width as u64) * (height as u64) * 4;
        if width == 0 || height == 0 || bytes > MAX_SURFACE_BYTES {
            return Err(EngineError::SurfaceAllocation { width, height });
        }
        Ok(RgbaImage::from_pixel(width, height, Rgba(settings.background)))
    }

    pub fn drawn_last_frame(&self) -> usize {
        self.drawn_last_frame
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Draw one frame; returns the number of particles drawn
    pub fn draw(
        &mut self,
        particles: &[Particle],
        settings: &RenderSettings,
        surface: &mut RgbaImage,
    ) -> usize {
        if settings.trails {
            fade_toward(surface, settings.background, settings.trail_fade);
        } else {
            clear(surface, settings.background);
        }

        let mut drawn = 0;
        for particle in particles.iter().filter(|p| p.visible) {
            let color = particle.color.rgb().unwrap_or(FALLBACK_COLOR);
            let center = particle.pos + Vec2::splat(0.5);
            let radius = (particle.size * 0.5).max(0.5);
            if !center.is_finite() {
                continue;
            }
            if settings.glow {
                glow(surface, center, radius * settings.glow_radius.max(1.0), color, settings.glow_intensity);
            }
            match particle.shape {
                ParticleShape::Circle => fill_circle(surface, center, radius, color),
                ParticleShape::Square => fill_square(surface, center, radius, color),
                ParticleShape::Triangle => fill_triangle(surface, center, radius, color),
            }
            drawn += 1;
        }

        self.drawn_last_frame = drawn;
        self.frames += 1;
        drawn
    }
}

fn clear(surface: &mut RgbaImage, background: [u8; 4]) {
    for px in surface.pixels_mut() {
        *px = Rgba(background);
    }
}

/// Move every pixel `fade` of the way toward the background
fn fade_toward(surface: &mut RgbaImage, background: [u8; 4], fade: f32) {
    let fade = fade.clamp(0.0, 1.0);
    for px in surface.pixels_mut() {
        for (c, bg) in px.0.iter_mut().zip(background.iter()) {
            let v = *c as f32 + (*bg as f32 - *c as f32) * fade;
            *c = v.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Pixel bounds of a box around `center`, clipped to the surface
fn bounds(surface: &RgbaImage, center: Vec2, reach: f32) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = (surface.width() as f32, surface.height() as f32);
    let x0 = (center.x - reach).floor().max(0.0);
    let y0 = (center.y - reach).floor().max(0.0);
    let x1 = (center.x + reach).ceil().min(w);
    let y1 = (center.y + reach).ceil().min(h);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

fn fill_where<F: Fn(Vec2) -> bool>(surface: &mut RgbaImage, center: Vec2, reach: f32, color: [u8; 3], inside: F) {
    let Some((x0, y0, x1, y1)) = bounds(surface, center, reach) else {
        return;
    };
    let mut hit = false;
    for y in y0..y1 {
        for x in x0..x1 {
            if inside(Vec2::new(x as f32 + 0.5, y as f32 + 0.5)) {
                surface.put_pixel(x, y, Rgba([color[0], color[1], color[2], 255]));
                hit = true;
            }
        }
    }
    // tiny shapes still cover the pixel under their center
    if !hit {
        let (x, y) = (center.x.floor(), center.y.floor());
        if x >= 0.0 && y >= 0.0 && (x as u32) < surface.width() && (y as u32) < surface.height() {
            surface.put_pixel(x as u32, y as u32, Rgba([color[0], color[1], color[2], 255]));
        }
    }
}

fn fill_circle(surface: &mut RgbaImage, center: Vec2, radius: f32, color: [u8; 3]) {
    let r2 = radius * radius;
    fill_where(surface, center, radius, color, |p| p.distance_squared(center) <= r2);
}

fn fill_square(surface: &mut RgbaImage, center: Vec2, radius: f32, color: [u8; 3]) {
    fill_where(surface, center, radius, color, |p| {
        (p.x - center.x).abs() <= radius && (p.y - center.y).abs() <= radius
    });
}

fn fill_triangle(surface: &mut RgbaImage, center: Vec2, radius: f32, color: [u8; 3]) {
    let a = center + Vec2::new(0.0, -radius);
    let b = center + Vec2::new(radius, radius);
    let c = center + Vec2::new(-radius, radius);
    let edge = |p: Vec2, q: Vec2, r: Vec2| (q - p).perp_dot(r - p);
    fill_where(surface, center, radius, color, |p| {
        let e0 = edge(a, b, p);
        let e1 = edge(b, c, p);
        let e2 = edge(c, a, p);
        (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0) || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0)
    });
}

/// Additive halo with quadratic falloff
fn glow(surface: &mut RgbaImage, center: Vec2, radius: f32, color: [u8; 3], intensity: f32) {
    let Some((x0, y0, x1, y1)) = bounds(surface, center, radius) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
            if d >= radius {
                continue;
            }
            let k = (1.0 - d / radius).powi(2) * intensity;
            let px = surface.get_pixel_mut(x, y);
            for (dst, src) in px.0.iter_mut().zip(color.iter()) {
                *dst = (*dst as f32 + *src as f32 * k).min(255.0) as u8;
            }
        }
    }
}

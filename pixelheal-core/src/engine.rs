use crate::forces::NoiseClock;
use crate::histogram::{color_histogram, ColorBucket};
use crate::image_source::{grid_step, sample_particles, sample_region, tile_regions};
use crate::integrator::{step, FrameStats, StepInputs};
use crate::particle::Particle;
use crate::pulse::{Canvas, ForcePulse, PulseQueue, PulseStart};
use crate::render::Renderer;
use crate::settings::{ColorFilterSettings, ForceFieldSettings, PerformanceSettings, SettingsPatch};
use crate::visibility::{adapt, apply_visibility};
use glam::Vec2;
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const HEALING_SEED_SALT: u64 = 0x4845_414c;

/// Particle totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleCount {
    pub total: usize,
    pub visible: usize,
}

/// The particle simulation.
///
/// Owns its particle store and pulse queue; nothing else mutates them.
/// Readers get `&[Particle]` snapshots and `Arc` settings snapshots.
#[derive(Debug)]
pub struct Engine {
    particles: Vec<Particle>,
    pulses: PulseQueue,
    settings: Arc<ForceFieldSettings>,
    pointer: Option<Vec2>,
    canvas: Canvas,
    frame: u64,
    /// Clock value and frame count at the last fps change
    clock_base: (f64, u64),
    visibility_dirty: bool,
    visible_count: usize,
}

impl Engine {
    pub fn new(settings: ForceFieldSettings) -> Self {
        let pulses = PulseQueue::new(settings.seed);
        Self {
            particles: Vec::new(),
            pulses,
            settings: Arc::new(settings),
            pointer: None,
            canvas: Canvas::new(1, 1),
            frame: 0,
            clock_base: (0.0, 0),
            visibility_dirty: true,
            visible_count: 0,
        }
    }

    /// Replace the particle store with a fresh sampling of `image`
    pub fn generate_particles_from_image(&mut self, image: &RgbaImage) -> usize {
        let particles = sample_particles(image, &self.settings.particles);
        self.install(particles, image.width(), image.height())
    }

    /// Same sampling as [`Engine::generate_particles_from_image`], one tile
    /// at a time; `on_tile(done, total)` runs after each tile.
    pub fn generate_particles_from_image_tiles<F>(
        &mut self,
        image: &RgbaImage,
        tile_size: u32,
        mut on_tile: F,
    ) -> usize
    where
        F: FnMut(usize, usize),
    {
        let settings = self.settings.particles;
        let step = grid_step(image.width(), image.height(), settings.density);
        let tiles = tile_regions(image.width(), image.height(), tile_size);
        let mut particles = Vec::new();
        for (i, (xs, ys)) in tiles.iter().enumerate() {
            sample_region(image, step, xs.clone(), ys.clone(), &settings, &mut particles);
            on_tile(i + 1, tiles.len());
        }
        self.install(particles, image.width(), image.height())
    }

    fn install(&mut self, particles: Vec<Particle>, width: u32, height: u32) -> usize {
        self.particles = particles;
        self.canvas = Canvas::new(width, height);
        self.pulses.clear();
        self.frame = 0;
        self.clock_base = (0.0, 0);
        self.assign_healing_multipliers();
        self.visibility_dirty = true;
        self.refresh_visibility();
        log::debug!(
            "generated {} particles from {}x{} image",
            self.particles.len(),
            width,
            height
        );
        self.particles.len()
    }

    /// Advance exactly one frame
    pub fn update_particles(&mut self) -> FrameStats {
        self.refresh_visibility();

        let now = self.time_ms();
        let live = self.pulses.begin_frame(now, self.canvas);
        let settings = Arc::clone(&self.settings);
        let active = settings.active_types();
        let inputs = StepInputs {
            settings: &settings,
            active: &active,
            pointer: self.pointer,
            canvas: self.canvas,
            clock: NoiseClock {
                frame: self.frame,
                seed: settings.seed,
            },
        };
        let stats = step(&mut self.particles, &mut self.pulses, live, &inputs);
        if stats.clamped > 0 {
            log::warn!("{} particles reached a non-finite state and were reset", stats.clamped);
        }

        self.frame += 1;
        self.pulses.retain_live(self.time_ms());
        stats
    }

    /// Draw the visible particles onto `surface`
    pub fn draw_particles(&self, renderer: &mut Renderer, surface: &mut RgbaImage) -> usize {
        renderer.draw(&self.particles, &self.settings.render, surface)
    }

    /// Pointer position in canvas coordinates, `None` when inactive
    pub fn set_mouse_position(&mut self, position: Option<Vec2>) {
        self.pointer = position.filter(|p| p.is_finite());
    }

    pub fn mouse_position(&self) -> Option<Vec2> {
        self.pointer
    }

    /// Shallow-merge `patch` into a new settings snapshot
    pub fn update_settings(&mut self, patch: &SettingsPatch) {
        if patch.is_empty() {
            return;
        }
        let next = self.settings.merged(patch);
        self.replace_settings(next);
    }

    /// Swap in a whole new settings snapshot
    pub fn replace_settings(&mut self, next: ForceFieldSettings) {
        let prev = Arc::clone(&self.settings);
        if next.fps != prev.fps {
            self.clock_base = (self.time_ms(), self.frame);
        }
        if next.seed != prev.seed {
            self.pulses.set_seed(next.seed);
        }
        if next.color_filter != prev.color_filter || next.performance != prev.performance {
            self.visibility_dirty = true;
        }
        let healing_changed = next.healing != prev.healing || next.seed != prev.seed;
        self.settings = Arc::new(next);
        if healing_changed {
            self.assign_healing_multipliers();
        }
        self.refresh_visibility();
    }

    pub fn settings(&self) -> Arc<ForceFieldSettings> {
        Arc::clone(&self.settings)
    }

    /// Zero every velocity and snap every particle to its origin
    pub fn reset_particles(&mut self) {
        for p in &mut self.particles {
            p.reset();
        }
    }

    pub fn enqueue_pulse(&mut self, pulse: ForcePulse, start: PulseStart) -> u64 {
        let now = self.time_ms();
        self.pulses.enqueue(pulse, start, now)
    }

    pub fn apply_color_filter(&mut self, filter: ColorFilterSettings) {
        self.update_settings(&SettingsPatch::color_filter(filter));
    }

    pub fn get_color_histogram(&self, tolerance: f32) -> Vec<ColorBucket> {
        color_histogram(&self.particles, tolerance)
    }

    pub fn get_particle_count(&self) -> ParticleCount {
        ParticleCount {
            total: self.particles.len(),
            visible: self.visible_count,
        }
    }

    /// Feed a measured frame time to the adaptive throttle.
    ///
    /// Returns the new performance settings when the visible fraction
    /// changed, so callers recording a session can log the change.
    pub fn record_frame_time(&mut self, frame_time_ms: f32) -> Option<PerformanceSettings> {
        let next = adapt(&self.settings.performance, frame_time_ms)?;
        log::debug!(
            "adaptive throttle: frame {:.1} ms, visible fraction {:.2} -> {:.2}",
            frame_time_ms,
            self.settings.performance.visible_fraction,
            next.visible_fraction
        );
        self.update_settings(&SettingsPatch::performance(next));
        Some(next)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn pulse_count(&self) -> usize {
        self.pulses.len()
    }

    pub fn live_pulse_count(&self) -> usize {
        self.pulses.live_count(self.time_ms())
    }

    pub fn has_pulse(&self, id: u64) -> bool {
        self.pulses.contains(id)
    }

    /// Engine clock in milliseconds; advances by one frame interval per update
    pub fn time_ms(&self) -> f64 {
        let (base_ms, base_frame) = self.clock_base;
        base_ms + (self.frame - base_frame) as f64 * self.settings.frame_interval_ms()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    fn refresh_visibility(&mut self) {
        if !self.visibility_dirty {
            return;
        }
        self.visible_count = apply_visibility(
            &mut self.particles,
            &self.settings.color_filter,
            &self.settings.performance,
        );
        self.visibility_dirty = false;
    }

    fn assign_healing_multipliers(&mut self) {
        let healing = self.settings.healing;
        let fraction = healing.partial_fraction.clamp(0.0, 1.0);
        if fraction <= 0.0 {
            for p in &mut self.particles {
                p.healing_multiplier = None;
            }
            return;
        }
        let mut rng = StdRng::seed_from_u64(self.settings.seed ^ HEALING_SEED_SALT);
        for p in &mut self.particles {
            p.healing_multiplier = if rng.gen::<f32>() < fraction {
                Some(healing.partial_multiplier.max(0.0))
            } else {
                None
            };
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(ForceFieldSettings::default())
    }
}

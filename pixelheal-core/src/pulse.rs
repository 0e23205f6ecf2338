//! One-off force pulses
//!
//! A pulse is a force source that does not follow the pointer. It starts at
//! a point on the engine clock, contributes every frame until its duration
//! has elapsed, and fades out with `(1 - progress)^2` so it never stops with
//! a jolt. Live pulses sit in an arena keyed by id; expiry is checked once
//! per frame after physics, and removal happens only then.
//!
//! Pulse kinds and their shape, with `s` the faded strength, `n` the unit
//! vector from the pulse origin to the particle and `fall = 1 - d/radius`:
//!
//! | kind | effect |
//! |---|---|
//! | gravity / gravityFlip | constant push along `direction` (down) / against it |
//! | wind / crosswind | sideways push, gusting with height / alternating per band |
//! | shear | sideways push proportional to height above origin |
//! | waterfall | downward push varying per column |
//! | tornado | swirl plus inward pull plus lift, inside radius |
//! | shockwave / ringBurst | outward push on an expanding front |
//! | ripple | radial push oscillating with distance and time |
//! | burst / implosion | outward / inward push scaled by `fall` |
//! | supernova | brief implosion, then a strong burst |
//! | multiBurst | four bursts around the origin |
//! | edgeBurst | push away from the nearest canvas edge |
//! | magnetPair | flow from a repelling pole to an attracting pole |
//! | swirlField | cellular swirl field over the whole canvas |
//! | ringSpin | tangential push on an annulus |
//! | spiralIn / spiralOut | tangential plus inward / outward |
//! | waveLeft / waveUp | travelling wave push left / up |
//! | noise / randomJitter | seeded per-particle random push, mild / strong |
//! | quake | horizontal shake with seeded vertical jitter |
//! | attraction / repulsion | pointer force model anchored at `origin` |

use crate::forces::{force_contribution, ForceType, NoiseClock, MIN_DISTANCE};
use crate::noise::value_noise;
use crate::settings::{ForceSettings, RadialForceSettings};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f32::consts::{PI, TAU};

/// Scale from pulse strength to per-frame velocity
pub const PULSE_SCALE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PulseKind {
    Gravity,
    Wind,
    Tornado,
    Shockwave,
    Noise,
    Ripple,
    Burst,
    Implosion,
    MagnetPair,
    Waterfall,
    GravityFlip,
    Shear,
    Crosswind,
    SwirlField,
    RingSpin,
    SpiralIn,
    SpiralOut,
    WaveLeft,
    WaveUp,
    RandomJitter,
    Supernova,
    RingBurst,
    EdgeBurst,
    MultiBurst,
    Quake,
    Attraction,
    Repulsion,
}

impl PulseKind {
    pub const ALL: [PulseKind; 27] = [
        PulseKind::Gravity,
        PulseKind::Wind,
        PulseKind::Tornado,
        PulseKind::Shockwave,
        PulseKind::Noise,
        PulseKind::Ripple,
        PulseKind::Burst,
        PulseKind::Implosion,
        PulseKind::MagnetPair,
        PulseKind::Waterfall,
        PulseKind::GravityFlip,
        PulseKind::Shear,
        PulseKind::Crosswind,
        PulseKind::SwirlField,
        PulseKind::RingSpin,
        PulseKind::SpiralIn,
        PulseKind::SpiralOut,
        PulseKind::WaveLeft,
        PulseKind::WaveUp,
        PulseKind::RandomJitter,
        PulseKind::Supernova,
        PulseKind::RingBurst,
        PulseKind::EdgeBurst,
        PulseKind::MultiBurst,
        PulseKind::Quake,
        PulseKind::Attraction,
        PulseKind::Repulsion,
    ];
}

/// A time-bounded force source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForcePulse {
    /// 0 lets the queue assign an id
    #[serde(default)]
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: PulseKind,
    pub duration_ms: f64,
    pub strength: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clockwise: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chaos: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
}

impl ForcePulse {
    pub fn new(kind: PulseKind, duration_ms: f64, strength: f32) -> Self {
        Self {
            id: 0,
            kind,
            duration_ms,
            strength,
            origin: None,
            direction: None,
            clockwise: None,
            frequency: None,
            chaos: None,
            radius: None,
        }
    }

    pub fn at(mut self, origin: Vec2) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn toward(mut self, direction: Vec2) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_chaos(mut self, chaos: f32) -> Self {
        self.chaos = Some(chaos);
        self
    }

    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn counter_clockwise(mut self) -> Self {
        self.clockwise = Some(false);
        self
    }
}

/// When a pulse begins, on the engine clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PulseStart {
    Now,
    At(f64),
    After(f64),
}

impl PulseStart {
    fn resolve(self, now: f64) -> f64 {
        match self {
            PulseStart::Now => now,
            PulseStart::At(t) => t,
            PulseStart::After(delay) => now + delay.max(0.0),
        }
    }
}

/// Size of the area particles live in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    /// Middle of the pixel lattice; particles sit on integer pixel coordinates
    pub fn center(&self) -> Vec2 {
        (Vec2::new(self.width, self.height) - Vec2::ONE).max(Vec2::ZERO) * 0.5
    }

    pub fn half_diagonal(&self) -> f32 {
        (Vec2::new(self.width, self.height).length() * 0.5).max(1.0)
    }
}

#[derive(Debug)]
struct ActivePulse {
    pulse: ForcePulse,
    start_ms: f64,
    rng: StdRng,
    /// Set by `begin_frame` when the pulse is live this frame
    frame: Option<PulseFrame>,
}

impl ActivePulse {
    fn elapsed(&self, now: f64) -> f64 {
        now - self.start_ms
    }

    fn is_expired(&self, now: f64) -> bool {
        self.elapsed(now) >= self.pulse.duration_ms
    }
}

#[derive(Debug, Clone, Copy)]
struct PulseFrame {
    progress: f32,
    elapsed_s: f32,
    scale: f32,
    origin: Vec2,
    radius: f32,
}

/// Arena of pending and live pulses, owned by one engine
#[derive(Debug)]
pub struct PulseQueue {
    pulses: BTreeMap<u64, ActivePulse>,
    next_id: u64,
    seed: u64,
}

impl PulseQueue {
    pub fn new(seed: u64) -> Self {
        Self {
            pulses: BTreeMap::new(),
            next_id: 1,
            seed,
        }
    }

    /// Add a pulse; returns its id. An id of 0, or one already queued, is
    /// replaced by a fresh id.
    pub fn enqueue(&mut self, mut pulse: ForcePulse, start: PulseStart, now: f64) -> u64 {
        if pulse.id == 0 || self.pulses.contains_key(&pulse.id) {
            while self.next_id == 0 || self.pulses.contains_key(&self.next_id) {
                self.next_id = self.next_id.wrapping_add(1);
            }
            pulse.id = self.next_id;
        }
        self.next_id = self.next_id.max(pulse.id.saturating_add(1));

        let id = pulse.id;
        let rng = StdRng::seed_from_u64(self.seed ^ id.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        let start_ms = start.resolve(now);
        log::trace!("pulse {} ({:?}) queued to start at {:.1} ms", id, pulse.kind, start_ms);
        self.pulses.insert(
            id,
            ActivePulse {
                pulse,
                start_ms,
                rng,
                frame: None,
            },
        );
        id
    }

    /// Seed for pulses enqueued from now on
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.pulses.contains_key(&id)
    }

    /// Drop every pulse and restart id assignment
    pub fn clear(&mut self) {
        self.pulses.clear();
        self.next_id = 1;
    }

    /// Number of pulses contributing at time `now`
    pub fn live_count(&self, now: f64) -> usize {
        self.pulses
            .values()
            .filter(|p| p.start_ms <= now && !p.is_expired(now))
            .count()
    }

    /// Mark which pulses are live for the frame starting at `now`
    pub fn begin_frame(&mut self, now: f64, canvas: Canvas) -> usize {
        let mut live = 0;
        for active in self.pulses.values_mut() {
            active.frame = if active.start_ms <= now && !active.is_expired(now) {
                live += 1;
                let elapsed = active.elapsed(now);
                let duration = active.pulse.duration_ms.max(f64::EPSILON);
                let progress = (elapsed / duration).clamp(0.0, 1.0) as f32;
                let fade = (1.0 - progress).powi(2);
                Some(PulseFrame {
                    progress,
                    elapsed_s: (elapsed / 1000.0) as f32,
                    scale: active.pulse.strength * PULSE_SCALE * fade,
                    origin: active.pulse.origin.unwrap_or_else(|| canvas.center()),
                    radius: active
                        .pulse
                        .radius
                        .filter(|r| *r > 0.0)
                        .unwrap_or_else(|| canvas.half_diagonal()),
                })
            } else {
                None
            };
        }
        live
    }

    /// Summed velocity delta of every live pulse on one particle
    pub fn contribution(&mut self, pos: Vec2, vel: Vec2, canvas: Canvas) -> Vec2 {
        let mut total = Vec2::ZERO;
        for active in self.pulses.values_mut() {
            if let Some(frame) = active.frame {
                total += pulse_delta(&active.pulse, &frame, &mut active.rng, pos, vel, canvas);
            }
        }
        total
    }

    /// Drop every pulse that has expired by `now`; returns the removed ids
    pub fn retain_live(&mut self, now: f64) -> Vec<u64> {
        let expired: Vec<u64> = self
            .pulses
            .iter()
            .filter(|(_, p)| p.is_expired(now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.pulses.remove(id);
            log::trace!("pulse {} expired at {:.1} ms", id, now);
        }
        expired
    }
}

fn pulse_delta(
    pulse: &ForcePulse,
    frame: &PulseFrame,
    rng: &mut StdRng,
    pos: Vec2,
    vel: Vec2,
    canvas: Canvas,
) -> Vec2 {
    let s = frame.scale;
    let radius = frame.radius;
    let offset = pos - frame.origin;
    let d = offset.length();
    let n = if d > MIN_DISTANCE { offset / d } else { Vec2::ZERO };
    let fall = (1.0 - d / radius).max(0.0);
    let tangent = if pulse.clockwise.unwrap_or(true) {
        n.perp()
    } else {
        -n.perp()
    };
    let direction = |default: Vec2| {
        pulse
            .direction
            .map(|d| d.normalize_or_zero())
            .filter(|d| *d != Vec2::ZERO)
            .unwrap_or(default)
    };
    let chaos = pulse.chaos.unwrap_or(1.0).clamp(0.0, 4.0);
    let t = frame.elapsed_s;

    match pulse.kind {
        PulseKind::Gravity => direction(Vec2::Y) * s,
        PulseKind::GravityFlip => -direction(Vec2::Y) * s,
        PulseKind::Wind => {
            let freq = pulse.frequency.unwrap_or(1.0);
            let gust = 1.0 + 0.3 * (pos.y * 0.05 + t * TAU * freq).sin();
            direction(Vec2::X) * s * gust
        }
        PulseKind::Crosswind => {
            let band_height = (canvas.height / 8.0).max(1.0);
            let band = (pos.y / band_height).floor() as i64;
            let sign = if band.rem_euclid(2) == 0 { 1.0 } else { -1.0 };
            direction(Vec2::X) * s * sign
        }
        PulseKind::Shear => {
            let half = (canvas.height * 0.5).max(1.0);
            direction(Vec2::X) * s * ((pos.y - frame.origin.y) / half)
        }
        PulseKind::Waterfall => {
            let column = value_noise(Vec2::new(pos.x * 0.05, 0.0), t, pulse.id as u32);
            Vec2::new(column * 0.15, 0.6 + 0.4 * column.abs()) * s
        }
        PulseKind::Tornado => {
            if fall <= 0.0 {
                return Vec2::ZERO;
            }
            (tangent - n * 0.35 - Vec2::Y * 0.2) * s * fall
        }
        PulseKind::Shockwave => front_push(n, d, frame.progress * radius, radius * 0.15) * s * 3.0,
        PulseKind::RingBurst => {
            let w = front_weight(d, frame.progress * radius, radius * 0.06);
            (n * 4.0 + tangent * 0.5) * s * w
        }
        PulseKind::Ripple => {
            let freq = pulse.frequency.unwrap_or(2.0);
            let wavelength = (radius / 6.0).max(1.0);
            n * s * (d * TAU / wavelength - t * TAU * freq).sin() * fall
        }
        PulseKind::Burst => n * s * 2.0 * fall,
        PulseKind::Implosion => -n * s * 2.0 * fall * (d / 10.0).min(1.0),
        PulseKind::Supernova => {
            if frame.progress < 0.2 {
                -n * s * fall * (d / 10.0).min(1.0)
            } else {
                n * s * 4.0 * fall
            }
        }
        PulseKind::MultiBurst => {
            let spread = radius * 0.5 * std::f32::consts::FRAC_1_SQRT_2;
            let sub_radius = radius * 0.5;
            [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)]
                .iter()
                .map(|(sx, sy)| {
                    let center = frame.origin + Vec2::new(*sx, *sy) * spread;
                    let off = pos - center;
                    let dist = off.length();
                    if dist < MIN_DISTANCE || dist >= sub_radius {
                        return Vec2::ZERO;
                    }
                    off / dist * s * 1.5 * (1.0 - dist / sub_radius)
                })
                .sum::<Vec2>()
        }
        PulseKind::EdgeBurst => {
            let edges = [
                (pos.x, Vec2::X),
                (canvas.width - pos.x, -Vec2::X),
                (pos.y, Vec2::Y),
                (canvas.height - pos.y, -Vec2::Y),
            ];
            let (dist, normal) = edges
                .iter()
                .copied()
                .fold((f32::MAX, Vec2::ZERO), |best, e| if e.0 < best.0 { e } else { best });
            let margin = (canvas.width.min(canvas.height) * 0.25).max(1.0);
            normal * s * 2.0 * (1.0 - dist.max(0.0) / margin).max(0.0)
        }
        PulseKind::MagnetPair => {
            let axis = direction(Vec2::X);
            let half_gap = radius * 0.25;
            let north = frame.origin + axis * half_gap;
            let south = frame.origin - axis * half_gap;
            let pull = |pole: Vec2| {
                let off = pole - pos;
                let dist = off.length();
                if dist < MIN_DISTANCE || dist >= radius {
                    Vec2::ZERO
                } else {
                    off / dist * (1.0 - dist / radius)
                }
            };
            (pull(north) - pull(south)) * s * 1.5
        }
        PulseKind::SwirlField => {
            let freq = pulse.frequency.unwrap_or(1.0).max(0.01);
            let cell = (radius / (3.0 * freq)).max(1.0);
            let sign = if pulse.clockwise.unwrap_or(true) { 1.0 } else { -1.0 };
            Vec2::new((pos.y / cell * PI).sin(), -(pos.x / cell * PI).sin()) * s * sign
        }
        PulseKind::RingSpin => {
            let w = front_weight(d, radius * 0.6, radius * 0.2);
            tangent * s * 2.0 * w
        }
        PulseKind::SpiralIn => (tangent * 0.8 - n * 0.6) * s * fall,
        PulseKind::SpiralOut => (tangent * 0.8 + n * 0.6) * s * fall,
        PulseKind::WaveLeft => {
            let freq = pulse.frequency.unwrap_or(1.0);
            let k = TAU * 2.0 / canvas.height.max(1.0);
            -Vec2::X * s * (0.5 + 0.5 * (pos.y * k + t * TAU * freq).sin())
        }
        PulseKind::WaveUp => {
            let freq = pulse.frequency.unwrap_or(1.0);
            let k = TAU * 2.0 / canvas.width.max(1.0);
            -Vec2::Y * s * (0.5 + 0.5 * (pos.x * k + t * TAU * freq).sin())
        }
        PulseKind::Noise => random_unit(rng) * s * chaos.min(1.0) * 2.0,
        PulseKind::RandomJitter => random_unit(rng) * s * chaos * 3.0,
        PulseKind::Quake => {
            let freq = pulse.frequency.unwrap_or(8.0);
            let shake = (t * TAU * freq).sin();
            Vec2::new(shake, rng.gen_range(-1.0f32..=1.0) * 0.3 * chaos) * s * 2.0
        }
        PulseKind::Attraction | PulseKind::Repulsion => {
            let (force, settings) = radial_settings(pulse.kind, pulse.strength, radius);
            let fade = (1.0 - frame.progress).powi(2);
            force_contribution(force, &settings, frame.origin, pos, vel, NoiseClock::default()) * fade
        }
    }
}

fn radial_settings(kind: PulseKind, strength: f32, radius: f32) -> (ForceType, ForceSettings) {
    let radial = RadialForceSettings { strength, radius };
    let mut settings = ForceSettings::default();
    if kind == PulseKind::Attraction {
        settings.attraction = radial;
        (ForceType::Attraction, settings)
    } else {
        settings.repulsion = radial;
        (ForceType::Repulsion, settings)
    }
}

/// Triangular weight around an expanding front
fn front_weight(d: f32, front: f32, band: f32) -> f32 {
    (1.0 - (d - front).abs() / band.max(1.0)).max(0.0)
}

fn front_push(n: Vec2, d: f32, front: f32, band: f32) -> Vec2 {
    n * front_weight(d, front, band)
}

fn random_unit(rng: &mut StdRng) -> Vec2 {
    Vec2::new(rng.gen_range(-1.0f32..=1.0), rng.gen_range(-1.0f32..=1.0))
}

//! Pointer force model
//!
//! One dispatch function over [`ForceType`]. The shared preamble (cutoff,
//! zero-distance guard, normalisation) runs once; each arm only supplies
//! its own magnitude and direction.

use crate::noise::value_noise;
use crate::settings::ForceSettings;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// Scale from user-facing strength to per-frame velocity
pub const FORCE_SCALE: f32 = 0.5;
/// Distance divisor for inverse-distance forces; distances under 1 count as 1
pub const FALLOFF: f32 = 0.1;
/// Below this distance a force has no defined direction and contributes nothing
pub const MIN_DISTANCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForceType {
    Attraction,
    #[default]
    Repulsion,
    Vortex,
    Collider,
    Turbulence,
}

impl ForceType {
    pub const ALL: [ForceType; 5] = [
        ForceType::Attraction,
        ForceType::Repulsion,
        ForceType::Vortex,
        ForceType::Collider,
        ForceType::Turbulence,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ForceType::Attraction => "attraction",
            ForceType::Repulsion => "repulsion",
            ForceType::Vortex => "vortex",
            ForceType::Collider => "collider",
            ForceType::Turbulence => "turbulence",
        }
    }
}

/// Inputs for the time-varying force types
#[derive(Debug, Clone, Copy, Default)]
pub struct NoiseClock {
    pub frame: u64,
    pub seed: u64,
}

/// Velocity delta one force type applies to a particle at `pos`
pub fn force_contribution(
    force: ForceType,
    settings: &ForceSettings,
    source: Vec2,
    pos: Vec2,
    vel: Vec2,
    clock: NoiseClock,
) -> Vec2 {
    let offset = pos - source;
    let d = offset.length();
    if !d.is_finite() || d < MIN_DISTANCE || d >= settings.radius_of(force) {
        return Vec2::ZERO;
    }
    let away = offset / d;
    let inverse = |strength: f32| strength * FORCE_SCALE / (d.max(1.0) * FALLOFF);

    match force {
        ForceType::Repulsion => away * inverse(settings.repulsion.strength),
        ForceType::Attraction => -away * inverse(settings.attraction.strength),
        ForceType::Vortex => {
            let tangent = if settings.vortex.clockwise {
                away.perp()
            } else {
                -away.perp()
            };
            tangent * inverse(settings.vortex.strength)
        }
        ForceType::Collider => {
            let c = &settings.collider;
            let hardness = c.hardness.clamp(0.0, 1.0);
            let falloff = (-d / c.radius.max(MIN_DISTANCE)).exp();
            let mut delta = away * c.impact_force * FORCE_SCALE * hardness * falloff;
            let inward = vel.dot(away);
            if inward < 0.0 {
                let restitution = 2.0 - c.bounce_damping.clamp(0.0, 1.0);
                delta -= away * inward * restitution * hardness;
            }
            delta
        }
        ForceType::Turbulence => {
            let t = &settings.turbulence;
            let time = clock.frame as f32 * 0.05;
            let seed = clock.seed as u32;
            let scaled = pos * t.frequency;
            let modulation = 0.5 + 0.5 * value_noise(scaled, time, seed);
            let angle = value_noise(scaled + Vec2::splat(101.0), time, seed ^ 0x9e37_79b9)
                * t.chaos.clamp(0.0, 1.0)
                * FRAC_PI_2;
            Vec2::from_angle(angle).rotate(away) * inverse(t.strength) * modulation
        }
    }
}

/// Sum of the contributions of every active force type
pub fn pointer_contribution(
    forces: &[ForceType],
    settings: &ForceSettings,
    source: Vec2,
    pos: Vec2,
    vel: Vec2,
    clock: NoiseClock,
) -> Vec2 {
    forces
        .iter()
        .map(|f| force_contribution(*f, settings, source, pos, vel, clock))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(force: ForceType, pos: Vec2) -> Vec2 {
        force_contribution(
            force,
            &ForceSettings::default(),
            Vec2::ZERO,
            pos,
            Vec2::ZERO,
            NoiseClock::default(),
        )
    }

    #[test]
    fn repulsion_follows_inverse_distance() {
        let delta = sample(ForceType::Repulsion, Vec2::new(10.0, 0.0));
        // 10 * 0.5 / (10 * 0.1)
        assert!((delta.x - 5.0).abs() < 1e-5);
        assert_eq!(delta.y, 0.0);
    }

    #[test]
    fn inverse_distance_is_capped_inside_one_pixel() {
        // 10 * 0.5 / (max(0.5, 1) * 0.1), not 10 * 0.5 / (0.5 * 0.1)
        let close = sample(ForceType::Repulsion, Vec2::new(0.5, 0.0));
        let one = sample(ForceType::Repulsion, Vec2::new(1.0, 0.0));
        assert!((close.x - 50.0).abs() < 1e-4);
        assert_eq!(close, one);
        let attract = sample(ForceType::Attraction, Vec2::new(0.0, 0.5));
        assert!((attract.y + 50.0).abs() < 1e-4);
    }

    #[test]
    fn hard_cutoff_at_radius() {
        let radius = ForceSettings::default().repulsion.radius;
        assert_eq!(sample(ForceType::Repulsion, Vec2::new(radius, 0.0)), Vec2::ZERO);
        assert_ne!(sample(ForceType::Repulsion, Vec2::new(radius - 0.5, 0.0)), Vec2::ZERO);
    }

    #[test]
    fn zero_distance_contributes_nothing() {
        for force in ForceType::ALL {
            assert_eq!(sample(force, Vec2::ZERO), Vec2::ZERO);
        }
    }

    #[test]
    fn vortex_is_perpendicular_and_flips_with_direction() {
        let mut settings = ForceSettings::default();
        let pos = Vec2::new(20.0, 0.0);
        let cw = force_contribution(ForceType::Vortex, &settings, Vec2::ZERO, pos, Vec2::ZERO, NoiseClock::default());
        settings.vortex.clockwise = false;
        let ccw = force_contribution(ForceType::Vortex, &settings, Vec2::ZERO, pos, Vec2::ZERO, NoiseClock::default());
        assert!(cw.dot(pos).abs() < 1e-5);
        assert!((cw + ccw).length() < 1e-6);
        assert!(cw.y > 0.0);
    }

    #[test]
    fn collider_decays_exponentially() {
        let near = sample(ForceType::Collider, Vec2::new(5.0, 0.0));
        let far = sample(ForceType::Collider, Vec2::new(45.0, 0.0));
        assert!(near.x > far.x && far.x > 0.0);
        let expected = (-40.0f32 / 60.0).exp();
        assert!((far.x / near.x - expected).abs() < 1e-4);
    }

    #[test]
    fn collider_cancels_inward_motion() {
        let settings = ForceSettings::default();
        let pos = Vec2::new(50.0, 0.0);
        let vel = Vec2::new(-3.0, 0.0);
        let delta = force_contribution(ForceType::Collider, &settings, Vec2::ZERO, pos, vel, NoiseClock::default());
        assert!((vel + delta).x > 0.0, "particle should bounce outward");
    }

    #[test]
    fn turbulence_stays_within_cone() {
        for i in 1..60 {
            let pos = Vec2::new(i as f32 * 1.7, i as f32 * -0.9);
            let clock = NoiseClock { frame: i, seed: 9 };
            let delta = force_contribution(ForceType::Turbulence, &ForceSettings::default(), Vec2::ZERO, pos, Vec2::ZERO, clock);
            // chaos 0.5 limits rotation to 45 degrees
            assert!(delta.normalize_or_zero().dot(pos.normalize()) >= (std::f32::consts::FRAC_PI_4).cos() - 1e-4);
        }
    }
}

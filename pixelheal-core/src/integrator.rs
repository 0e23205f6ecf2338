use crate::forces::{pointer_contribution, ForceType, NoiseClock};
use crate::particle::Particle;
use crate::pulse::{Canvas, PulseQueue};
use crate::settings::ForceFieldSettings;
use glam::Vec2;

/// Highest damping factor accepted; velocity must always lose energy
pub const MAX_DAMPING: f32 = 0.999;

/// Everything one frame step reads besides the particles themselves
pub struct StepInputs<'a> {
    pub settings: &'a ForceFieldSettings,
    pub active: &'a [ForceType],
    pub pointer: Option<Vec2>,
    pub canvas: Canvas,
    pub clock: NoiseClock,
}

/// Operation counts for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub updated: usize,
    pub skipped: usize,
    /// Particles whose state went non-finite and were snapped home
    pub clamped: usize,
    pub live_pulses: usize,
}

/// Advance every visible particle by one frame.
///
/// Order per particle: healing, pointer force, pulses, damping, then
/// position integration (semi-implicit Euler with a unit frame step).
pub fn step(
    particles: &mut [Particle],
    pulses: &mut PulseQueue,
    live_pulses: usize,
    inputs: &StepInputs<'_>,
) -> FrameStats {
    let settings = inputs.settings;
    let damping = settings.damping.clamp(0.0, MAX_DAMPING);
    let healing = settings.healing.factor;
    let mut stats = FrameStats {
        live_pulses,
        ..FrameStats::default()
    };

    for particle in particles.iter_mut() {
        if !particle.visible {
            stats.skipped += 1;
            continue;
        }

        let heal = healing * particle.healing_multiplier.unwrap_or(1.0);
        let mut dv = (particle.origin() - particle.pos) * heal;

        if let Some(source) = inputs.pointer {
            dv += pointer_contribution(
                inputs.active,
                &settings.forces,
                source,
                particle.pos,
                particle.vel,
                inputs.clock,
            );
        }

        if live_pulses > 0 {
            dv += pulses.contribution(particle.pos, particle.vel, inputs.canvas);
        }

        particle.vel = (particle.vel + dv) * damping;
        particle.pos += particle.vel;

        if !particle.pos.is_finite() || !particle.vel.is_finite() {
            particle.reset();
            stats.clamped += 1;
        }
        stats.updated += 1;
    }

    stats
}

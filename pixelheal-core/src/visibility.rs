//! Visibility masks
//!
//! A particle is visible when both the color filter and the performance
//! throttle keep it. Hidden particles are skipped by physics and rendering
//! alike, so the mask is also the knob that scales per-frame cost.

use crate::particle::{ColorKey, Particle};
use crate::settings::{ColorFilterSettings, FilterMode, PerformanceSettings};

/// Frame time below `HEADROOM * budget` counts as comfortably under budget
pub const HEADROOM: f32 = 0.8;

/// Color filter membership, honouring the clustering tolerance
pub fn is_selected(color: &ColorKey, filter: &ColorFilterSettings) -> bool {
    if filter.selected_colors.contains(color) {
        return true;
    }
    filter.tolerance > 0.0
        && filter
            .selected_colors
            .iter()
            .any(|s| matches!(s.distance(color), Some(d) if d <= filter.tolerance))
}

/// Color half of the mask
pub fn color_visible(color: &ColorKey, filter: &ColorFilterSettings) -> bool {
    if !filter.enabled {
        return true;
    }
    is_selected(color, filter) ^ (filter.mode == FilterMode::Hide)
}

/// Stable evenly spaced subset: index `i` is kept iff
/// `floor((i + 1) f) > floor(i f)`, which keeps exactly `floor(n f)` of `n`.
#[inline]
pub fn throttle_keeps(index: usize, fraction: f32) -> bool {
    if fraction >= 1.0 {
        return true;
    }
    let f = fraction.max(0.0) as f64;
    ((index + 1) as f64 * f).floor() > (index as f64 * f).floor()
}

/// Write the combined mask into every particle; returns the visible count
pub fn apply_visibility(
    particles: &mut [Particle],
    filter: &ColorFilterSettings,
    performance: &PerformanceSettings,
) -> usize {
    let fraction = performance.normalized().visible_fraction;
    let mut visible = 0;
    for (i, particle) in particles.iter_mut().enumerate() {
        particle.visible = throttle_keeps(i, fraction) && color_visible(&particle.color, filter);
        if particle.visible {
            visible += 1;
        }
    }
    visible
}

/// Feed one measured frame time into the adaptive throttle.
///
/// Returns the replacement settings when the visible fraction moves, `None`
/// when adaptation is off or the frame landed inside the dead band.
pub fn adapt(performance: &PerformanceSettings, frame_time_ms: f32) -> Option<PerformanceSettings> {
    if !performance.adaptive || !frame_time_ms.is_finite() || performance.target_fps <= 0.0 {
        return None;
    }
    let current = performance.normalized();
    let budget = 1000.0 / current.target_fps;
    let step = current.adjust_step.abs();

    let fraction = if frame_time_ms > budget {
        (current.visible_fraction - step).max(current.min_visible_fraction)
    } else if frame_time_ms < budget * HEADROOM {
        (current.visible_fraction + step).min(1.0)
    } else {
        return None;
    };

    if (fraction - current.visible_fraction).abs() < f32::EPSILON {
        return None;
    }
    Some(PerformanceSettings {
        visible_fraction: fraction,
        ..current
    })
}

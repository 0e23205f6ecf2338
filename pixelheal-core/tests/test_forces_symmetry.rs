//! Attraction and repulsion mirror each other

use glam::Vec2;
use pixelheal_core::forces::{force_contribution, pointer_contribution, ForceType, NoiseClock};
use pixelheal_core::settings::ForceSettings;
use pixelheal_core::tests::test_helpers::approx_eq_f32;

fn contribution(force: ForceType, settings: &ForceSettings, pos: Vec2) -> Vec2 {
    force_contribution(force, settings, Vec2::new(3.0, -2.0), pos, Vec2::ZERO, NoiseClock::default())
}

#[test]
fn test_attraction_is_negated_repulsion() {
    let settings = ForceSettings::default();
    let points = [
        Vec2::new(4.0, -2.0),
        Vec2::new(-30.0, 12.5),
        Vec2::new(50.0, 60.0),
        Vec2::new(3.5, -1.5),
    ];
    for pos in points {
        let attract = contribution(ForceType::Attraction, &settings, pos);
        let repel = contribution(ForceType::Repulsion, &settings, pos);
        assert!(approx_eq_f32(attract.x, -repel.x, 1e-5), "{:?}", pos);
        assert!(approx_eq_f32(attract.y, -repel.y, 1e-5), "{:?}", pos);
    }
}

#[test]
fn test_symmetry_breaks_only_when_settings_differ() {
    let mut settings = ForceSettings::default();
    settings.attraction.strength = 20.0;
    let pos = Vec2::new(13.0, -2.0);
    let attract = contribution(ForceType::Attraction, &settings, pos);
    let repel = contribution(ForceType::Repulsion, &settings, pos);
    assert!(approx_eq_f32(attract.length(), 2.0 * repel.length(), 1e-4));
}

#[test]
fn test_combined_attraction_and_repulsion_cancel() {
    let settings = ForceSettings::default();
    let total = pointer_contribution(
        &[ForceType::Attraction, ForceType::Repulsion],
        &settings,
        Vec2::ZERO,
        Vec2::new(7.0, 9.0),
        Vec2::ZERO,
        NoiseClock::default(),
    );
    assert!(total.length() < 1e-5);
}

#[test]
fn test_outside_radius_both_vanish() {
    let settings = ForceSettings::default();
    let far = Vec2::new(3.0 + settings.repulsion.radius + 1.0, -2.0);
    assert_eq!(contribution(ForceType::Attraction, &settings, far), Vec2::ZERO);
    assert_eq!(contribution(ForceType::Repulsion, &settings, far), Vec2::ZERO);
}

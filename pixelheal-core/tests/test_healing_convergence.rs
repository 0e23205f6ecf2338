//! Healing pulls displaced particles back to their sample points

use glam::Vec2;
use pixelheal_core::pulse::{ForcePulse, PulseKind, PulseStart};
use pixelheal_core::tests::test_helpers::{engine_for, max_displacement, split_image};

#[test]
fn test_particles_return_home_after_disturbance() {
    let image = split_image(12, 8, [255, 0, 0, 255], [0, 0, 255, 255]);
    let mut engine = engine_for(&image);
    engine.enqueue_pulse(
        ForcePulse::new(PulseKind::Burst, 50.0, 20.0).at(Vec2::new(6.0, 4.0)),
        PulseStart::Now,
    );
    for _ in 0..4 {
        engine.update_particles();
    }
    assert!(max_displacement(&engine) > 1.0, "pulse should displace particles");

    for _ in 0..800 {
        engine.update_particles();
    }
    assert!(max_displacement(&engine) <= 0.5);
}

#[test]
fn test_rest_state_is_a_fixed_point() {
    let image = split_image(6, 6, [10, 200, 10, 255], [200, 10, 10, 255]);
    let mut engine = engine_for(&image);
    for _ in 0..100 {
        engine.update_particles();
        assert_eq!(max_displacement(&engine), 0.0);
    }
}

#[test]
fn test_converged_particles_stay_converged() {
    let image = split_image(8, 8, [255, 255, 0, 255], [0, 255, 255, 255]);
    let mut engine = engine_for(&image);
    engine.enqueue_pulse(ForcePulse::new(PulseKind::Wind, 100.0, 15.0), PulseStart::Now);
    for _ in 0..800 {
        engine.update_particles();
    }
    for _ in 0..200 {
        engine.update_particles();
        assert!(max_displacement(&engine) <= 0.5);
    }
}

#[test]
fn test_pointer_release_lets_particles_heal() {
    let image = split_image(10, 10, [255, 255, 255, 255], [128, 128, 128, 255]);
    let mut engine = engine_for(&image);
    engine.set_mouse_position(Some(Vec2::new(4.5, 4.5)));
    for _ in 0..10 {
        engine.update_particles();
    }
    assert!(max_displacement(&engine) > 1.0);

    engine.set_mouse_position(None);
    for _ in 0..800 {
        engine.update_particles();
    }
    assert!(max_displacement(&engine) <= 0.5);
}

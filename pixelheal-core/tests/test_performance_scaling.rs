//! Hidden particles cost nothing in physics or rendering

use pixelheal_core::render::Renderer;
use pixelheal_core::settings::{PerformanceSettings, SettingsPatch};
use pixelheal_core::tests::test_helpers::{engine_for, split_image};
use pixelheal_core::Engine;

fn work_per_frame(engine: &mut Engine) -> usize {
    let canvas = engine.canvas();
    let render = engine.settings().render;
    let mut surface = Renderer::allocate_surface(canvas.width as u32, canvas.height as u32, &render).unwrap();
    let mut renderer = Renderer::new();
    let stats = engine.update_particles();
    let drawn = engine.draw_particles(&mut renderer, &mut surface);
    stats.updated + drawn
}

fn throttled(fraction: f32) -> Engine {
    let mut engine = engine_for(&split_image(40, 25, [255, 0, 0, 255], [0, 255, 0, 255]));
    engine.update_settings(&SettingsPatch::performance(PerformanceSettings {
        min_visible_fraction: 0.0,
        visible_fraction: fraction,
        ..PerformanceSettings::default()
    }));
    engine
}

#[test]
fn test_work_scales_with_visible_fraction() {
    let baseline = work_per_frame(&mut throttled(1.0)) as f32;
    assert_eq!(baseline, 2000.0);
    for hidden in [0.1f32, 0.25, 0.5, 0.75, 0.9] {
        let work = work_per_frame(&mut throttled(1.0 - hidden)) as f32;
        let expected = baseline * (1.0 - hidden);
        assert!(
            (work - expected).abs() <= baseline * 0.1,
            "hidden {} gave {} expected {}",
            hidden,
            work,
            expected
        );
    }
}

#[test]
fn test_throttle_keeps_exact_share() {
    for fraction in [0.2f32, 0.4, 0.6] {
        let engine = {
            let mut e = throttled(fraction);
            e.update_particles();
            e
        };
        let count = engine.get_particle_count();
        assert_eq!(count.visible, (count.total as f32 * fraction).floor() as usize);
    }
}

#[test]
fn test_adaptive_throttle_sheds_and_recovers() {
    let mut engine = engine_for(&split_image(10, 10, [255, 0, 0, 255], [0, 0, 255, 255]));
    engine.update_settings(&SettingsPatch::performance(PerformanceSettings {
        adaptive: true,
        target_fps: 50.0,
        min_visible_fraction: 0.5,
        adjust_step: 0.25,
        visible_fraction: 1.0,
    }));

    let slower = engine.record_frame_time(40.0).unwrap();
    assert_eq!(slower.visible_fraction, 0.75);
    let floor = engine.record_frame_time(40.0).unwrap();
    assert_eq!(floor.visible_fraction, 0.5);
    assert!(engine.record_frame_time(40.0).is_none());
    engine.update_particles();
    assert_eq!(engine.get_particle_count().visible, 50);

    // inside the dead band nothing changes
    assert!(engine.record_frame_time(18.0).is_none());
    let faster = engine.record_frame_time(5.0).unwrap();
    assert_eq!(faster.visible_fraction, 0.75);
}

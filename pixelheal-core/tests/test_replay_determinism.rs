//! Replays are reproducible and match the live session they came from

use glam::Vec2;
use pixelheal_core::forces::ForceType;
use pixelheal_core::pulse::{ForcePulse, PulseKind, PulseStart};
use pixelheal_core::recording::{AnimationRecording, RecordedInput, SessionRecorder};
use pixelheal_core::render::Renderer;
use pixelheal_core::replay::render_frames;
use pixelheal_core::settings::SettingsPatch;
use pixelheal_core::tests::test_helpers::{encode_png, engine_for, make_recording, pixel_perfect_settings, split_image};

fn busy_recording() -> AnimationRecording {
    let image = split_image(16, 12, [255, 128, 0, 255], [0, 64, 255, 255]);
    let mut settings = pixel_perfect_settings(16, 12);
    settings.fps = 30.0;
    let interval = settings.frame_interval_ms();
    let inputs = vec![
        RecordedInput::pulse(0.0, ForcePulse::new(PulseKind::RandomJitter, 200.0, 6.0)),
        RecordedInput::settings(2.0 * interval, SettingsPatch::active_force(ForceType::Turbulence)),
        RecordedInput::pointer(2.0 * interval, Some(Vec2::new(8.0, 6.0))),
        RecordedInput::pulse(5.0 * interval, ForcePulse::new(PulseKind::Noise, 300.0, 4.0)),
        RecordedInput::pulse(5.0 * interval, ForcePulse::new(PulseKind::Waterfall, 300.0, 4.0)),
        RecordedInput::pointer(9.0 * interval, None),
    ];
    make_recording(&image, settings, 20.0 * interval, inputs).unwrap()
}

#[test]
fn test_two_replays_emit_identical_frames() {
    let recording = busy_recording();
    let first = render_frames(&recording).unwrap();
    let second = render_frames(&recording).unwrap();
    assert_eq!(first.len(), recording.total_frames());
    assert_eq!(first.len(), 20);
    assert!(first == second, "replay frames diverged");
}

#[test]
fn test_replay_survives_json_round_trip() {
    let recording = busy_recording();
    let reloaded = AnimationRecording::from_json(&recording.to_json().unwrap()).unwrap();
    assert!(render_frames(&recording).unwrap() == render_frames(&reloaded).unwrap());
}

#[test]
fn test_inputs_change_the_output() {
    let mut quiet = busy_recording();
    quiet.inputs.clear();
    let busy = render_frames(&busy_recording()).unwrap();
    let still = render_frames(&quiet).unwrap();
    assert!(still.windows(2).all(|w| w[0] == w[1]));
    assert!(busy != still);
}

#[test]
fn test_replay_reproduces_live_session() {
    let image = split_image(12, 10, [200, 30, 30, 255], [30, 30, 200, 255]);
    let mut engine = engine_for(&image);
    let mut recorder = SessionRecorder::begin(&engine, encode_png(&image).unwrap());
    let mut live_frames = Vec::new();
    let mut renderer = Renderer::new();

    for frame in 0..24 {
        let now = engine.time_ms();
        if frame == 3 {
            let pulse = ForcePulse::new(PulseKind::Quake, 150.0, 5.0);
            recorder.record_pulse(now, pulse.clone());
            engine.enqueue_pulse(pulse, PulseStart::Now);
        }
        if frame == 6 {
            let patch = SettingsPatch::active_force(ForceType::Vortex);
            recorder.record_settings(now, patch.clone());
            engine.update_settings(&patch);
            recorder.record_pointer(now, Some(Vec2::new(5.0, 5.0)));
            engine.set_mouse_position(Some(Vec2::new(5.0, 5.0)));
        }
        if frame == 15 {
            recorder.record_pointer(now, None);
            engine.set_mouse_position(None);
        }
        engine.update_particles();
        let render = engine.settings().render;
        let mut surface = Renderer::allocate_surface(12, 10, &render).unwrap();
        engine.draw_particles(&mut renderer, &mut surface);
        live_frames.push(surface);
    }

    let recording = recorder.finish(engine.time_ms());
    assert_eq!(recording.inputs.len(), 4);
    assert_eq!(recording.total_frames(), 24);
    let replayed = render_frames(&recording).unwrap();
    assert_eq!(replayed.len(), live_frames.len());
    for (i, (a, b)) in live_frames.iter().zip(replayed.iter()).enumerate() {
        assert!(a == b, "frame {} differs", i);
    }
}

fn render_live(engine: &pixelheal_core::Engine, renderer: &mut Renderer, width: u32, height: u32) -> image::RgbaImage {
    let render = engine.settings().render;
    let mut surface = Renderer::allocate_surface(width, height, &render).unwrap();
    engine.draw_particles(renderer, &mut surface);
    surface
}

fn assert_frames_match(live: &[image::RgbaImage], recording: &AnimationRecording) {
    let replayed = render_frames(recording).unwrap();
    assert_eq!(replayed.len(), live.len());
    for (i, (a, b)) in live.iter().zip(replayed.iter()).enumerate() {
        assert!(a == b, "frame {} differs", i);
    }
}

#[test]
fn test_replay_reproduces_reset_mid_session() {
    let image = split_image(12, 10, [200, 30, 30, 255], [30, 30, 200, 255]);
    let mut engine = engine_for(&image);
    let mut recorder = SessionRecorder::begin(&engine, encode_png(&image).unwrap());
    let mut renderer = Renderer::new();
    let mut live_frames = Vec::new();

    for frame in 0..20 {
        let now = engine.time_ms();
        if frame == 2 {
            let pulse = ForcePulse::new(PulseKind::Burst, 300.0, 6.0);
            recorder.record_pulse(now, pulse.clone());
            engine.enqueue_pulse(pulse, PulseStart::Now);
        }
        if frame == 6 {
            recorder.record_reset(now);
            engine.reset_particles();
        }
        engine.update_particles();
        live_frames.push(render_live(&engine, &mut renderer, 12, 10));
    }

    let recording = recorder.finish(engine.time_ms());
    assert!(recording.inputs.iter().any(|input| input.reset));
    assert_frames_match(&live_frames, &recording);
}

#[test]
fn test_fps_change_while_recording_keeps_replay_in_step() {
    let image = split_image(12, 10, [200, 30, 30, 255], [30, 30, 200, 255]);
    let mut engine = engine_for(&image);
    let fps = engine.settings().fps;
    let mut recorder = SessionRecorder::begin(&engine, encode_png(&image).unwrap());
    let mut renderer = Renderer::new();
    let mut live_frames = Vec::new();

    for frame in 0..30 {
        let now = engine.time_ms();
        if frame == 1 {
            let patch = SettingsPatch {
                fps: Some(fps / 2.0),
                damping: Some(0.9),
                ..SettingsPatch::default()
            };
            let applied = recorder.record_settings(now, patch);
            engine.update_settings(&applied);
        }
        if frame == 10 {
            let pulse = ForcePulse::new(PulseKind::Burst, 200.0, 6.0);
            recorder.record_pulse(now, pulse.clone());
            engine.enqueue_pulse(pulse, PulseStart::Now);
        }
        engine.update_particles();
        live_frames.push(render_live(&engine, &mut renderer, 12, 10));
    }

    assert_eq!(engine.settings().fps, fps);
    let recording = recorder.finish(engine.time_ms());
    assert_eq!(recording.total_frames(), 30);
    assert_frames_match(&live_frames, &recording);
}

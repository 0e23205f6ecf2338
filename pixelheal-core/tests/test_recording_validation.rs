//! Loading recordings from JSON and rejecting broken ones

use pixelheal_core::pulse::{ForcePulse, PulseKind};
use pixelheal_core::recording::{AnimationRecording, RecordedInput, SessionRecorder};
use pixelheal_core::settings::SettingsPatch;
use pixelheal_core::tests::test_helpers::{approx_eq, encode_png, engine_for, make_recording, pixel_perfect_settings, solid_image};
use pixelheal_core::RecordingError;

fn sample() -> AnimationRecording {
    let image = solid_image(3, 3, [10, 20, 30, 255]);
    make_recording(&image, pixel_perfect_settings(3, 3), 500.0, Vec::new()).unwrap()
}

#[test]
fn test_unsorted_json_is_rejected() {
    let mut recording = sample();
    recording.inputs = vec![
        RecordedInput::pulse(40.0, ForcePulse::new(PulseKind::Burst, 100.0, 2.0)),
        RecordedInput::pulse(20.0, ForcePulse::new(PulseKind::Burst, 100.0, 2.0)),
    ];
    let json = serde_json::to_string(&recording).unwrap();
    assert!(matches!(
        AnimationRecording::from_json(&json),
        Err(RecordingError::UnsortedInputs { index: 1 })
    ));
}

#[test]
fn test_malformed_json_is_rejected() {
    assert!(matches!(AnimationRecording::from_json("{\"fps\": 30}"), Err(RecordingError::Json(_))));
    assert!(matches!(AnimationRecording::from_json("[]"), Err(RecordingError::Json(_))));
}

#[test]
fn test_partial_settings_fill_defaults() {
    let recording = sample();
    let mut value: serde_json::Value = serde_json::from_str(&recording.to_json().unwrap()).unwrap();
    value["initialSettings"] = serde_json::json!({ "damping": 0.9 });
    let loaded = AnimationRecording::from_json(&value.to_string()).unwrap();
    assert_eq!(loaded.initial_settings.damping, 0.9);
    assert_eq!(loaded.initial_settings.fps, 60.0);
}

#[test]
fn test_recorder_stamps_relative_engine_time() {
    let image = solid_image(4, 4, [0, 0, 0, 255]);
    let mut engine = engine_for(&image);
    for _ in 0..5 {
        engine.update_particles();
    }
    let mut recorder = SessionRecorder::begin(&engine, encode_png(&image).unwrap());
    let interval = engine.settings().frame_interval_ms();
    for _ in 0..3 {
        engine.update_particles();
    }
    recorder.record_pulse(engine.time_ms(), ForcePulse::new(PulseKind::Shockwave, 200.0, 3.0));
    recorder.record_settings(engine.time_ms(), SettingsPatch::default());
    recorder.record_pointer(engine.time_ms(), None);
    recorder.record_pointer(engine.time_ms(), None);
    assert_eq!(recorder.input_count(), 2);

    let recording = recorder.finish(engine.time_ms());
    assert!(approx_eq(recording.inputs[0].timestamp, 3.0 * interval, 1e-9));
    assert!(approx_eq(recording.duration, 3.0 * interval, 1e-9));
    assert_eq!((recording.width, recording.height), (4, 4));
    assert!(recording.validate().is_ok());
}

#[test]
fn test_empty_recording_lasts_one_frame() {
    let image = solid_image(2, 2, [0, 0, 0, 255]);
    let engine = engine_for(&image);
    let recording = SessionRecorder::begin(&engine, encode_png(&image).unwrap()).finish(engine.time_ms());
    assert_eq!(recording.total_frames(), 1);
    assert!(recording.validate().is_ok());
}

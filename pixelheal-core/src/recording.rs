//! Recorded interactive sessions
//!
//! A recording holds everything needed to rebuild a session off-line: the
//! source image bytes, the settings it started from, and every input with
//! the engine-clock time it was applied at.
//!
//! The frame rate is fixed for the length of a recording: replays step at
//! `fps`, so `fps` in a recorded settings patch is ignored.

use crate::engine::Engine;
use crate::error::RecordingError;
use crate::pulse::{ForcePulse, PulseStart};
use crate::settings::{ForceFieldSettings, SettingsPatch};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Slack when comparing input timestamps to frame times
pub const TIME_EPSILON_MS: f64 = 1e-6;

/// Pointer state change; `position: None` releases the pointer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerInput {
    pub position: Option<Vec2>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedInput {
    /// Milliseconds since the recording started, on the engine clock
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<ForcePulse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_change: Option<SettingsPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<PointerInput>,
    /// Snap every particle back to its origin
    #[serde(default, skip_serializing_if = "is_false")]
    pub reset: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl RecordedInput {
    pub fn pulse(timestamp: f64, pulse: ForcePulse) -> Self {
        Self {
            timestamp,
            pulse: Some(pulse),
            settings_change: None,
            pointer: None,
            reset: false,
        }
    }

    pub fn settings(timestamp: f64, patch: SettingsPatch) -> Self {
        Self {
            timestamp,
            pulse: None,
            settings_change: Some(patch),
            pointer: None,
            reset: false,
        }
    }

    pub fn pointer(timestamp: f64, position: Option<Vec2>) -> Self {
        Self {
            timestamp,
            pulse: None,
            settings_change: None,
            pointer: Some(PointerInput { position }),
            reset: false,
        }
    }

    pub fn reset(timestamp: f64) -> Self {
        Self {
            timestamp,
            pulse: None,
            settings_change: None,
            pointer: None,
            reset: true,
        }
    }

    /// Apply to an engine: settings, reset, pointer, then pulse
    pub fn apply_to(&self, engine: &mut Engine) {
        if let Some(patch) = &self.settings_change {
            engine.update_settings(&patch.clone().without_fps());
        }
        if self.reset {
            engine.reset_particles();
        }
        if let Some(pointer) = &self.pointer {
            engine.set_mouse_position(pointer.position);
        }
        if let Some(pulse) = &self.pulse {
            engine.enqueue_pulse(pulse.clone(), PulseStart::Now);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationRecording {
    /// Length in milliseconds
    pub duration: f64,
    pub fps: f32,
    pub width: u32,
    pub height: u32,
    /// Encoded source image (PNG or JPEG)
    pub image_data: Vec<u8>,
    pub initial_settings: ForceFieldSettings,
    pub inputs: Vec<RecordedInput>,
}

impl AnimationRecording {
    pub fn validate(&self) -> Result<(), RecordingError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(RecordingError::InvalidFps(self.fps));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(RecordingError::InvalidDuration(self.duration));
        }
        if self.image_data.is_empty() {
            return Err(RecordingError::MissingImage);
        }
        if let Some(index) = self
            .inputs
            .windows(2)
            .position(|w| !(w[0].timestamp <= w[1].timestamp))
        {
            return Err(RecordingError::UnsortedInputs { index: index + 1 });
        }
        Ok(())
    }

    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.fps as f64
    }

    /// `ceil(duration / frame_interval)`
    pub fn total_frames(&self) -> usize {
        (self.duration / self.frame_interval_ms() - TIME_EPSILON_MS).ceil().max(0.0) as usize
    }

    pub fn from_json(json: &str) -> Result<Self, RecordingError> {
        let recording: Self = serde_json::from_str(json)?;
        recording.validate()?;
        Ok(recording)
    }

    pub fn to_json(&self) -> Result<String, RecordingError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordingError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RecordingError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Captures a live session into an [`AnimationRecording`].
///
/// Start it right after particles are generated, so the replay engine
/// (which regenerates from the same image) begins from the same state.
#[derive(Debug)]
pub struct SessionRecorder {
    start_ms: f64,
    width: u32,
    height: u32,
    image_data: Vec<u8>,
    initial_settings: ForceFieldSettings,
    inputs: Vec<RecordedInput>,
}

impl SessionRecorder {
    pub fn begin(engine: &Engine, image_data: Vec<u8>) -> Self {
        let canvas = engine.canvas();
        let settings = engine.settings();
        Self {
            start_ms: engine.time_ms(),
            width: canvas.width as u32,
            height: canvas.height as u32,
            image_data,
            initial_settings: (*settings).clone(),
            inputs: Vec::new(),
        }
    }

    fn stamp(&self, engine_time_ms: f64) -> f64 {
        let t = (engine_time_ms - self.start_ms).max(0.0);
        // keep the log sorted even if a caller passes a stale time
        self.inputs.last().map_or(t, |last| t.max(last.timestamp))
    }

    pub fn record_pulse(&mut self, engine_time_ms: f64, pulse: ForcePulse) {
        let t = self.stamp(engine_time_ms);
        self.inputs.push(RecordedInput::pulse(t, pulse));
    }

    /// Log a settings change and return the patch the live engine should
    /// apply, which has `fps` removed.
    pub fn record_settings(&mut self, engine_time_ms: f64, patch: SettingsPatch) -> SettingsPatch {
        if patch.fps.is_some_and(|fps| fps != self.initial_settings.fps) {
            log::info!("frame rate is fixed while recording; fps change ignored");
        }
        let patch = patch.without_fps();
        if !patch.is_empty() {
            let t = self.stamp(engine_time_ms);
            self.inputs.push(RecordedInput::settings(t, patch.clone()));
        }
        patch
    }

    pub fn record_reset(&mut self, engine_time_ms: f64) {
        let t = self.stamp(engine_time_ms);
        self.inputs.push(RecordedInput::reset(t));
    }

    pub fn record_pointer(&mut self, engine_time_ms: f64, position: Option<Vec2>) {
        let t = self.stamp(engine_time_ms);
        if let Some(last) = self.inputs.last() {
            if last.pointer.map(|p| p.position) == Some(position) {
                return;
            }
        }
        self.inputs.push(RecordedInput::pointer(t, position));
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Close the recording at `engine_time_ms`
    pub fn finish(self, engine_time_ms: f64) -> AnimationRecording {
        let fps = self.initial_settings.fps;
        let min_duration = 1000.0 / fps as f64;
        AnimationRecording {
            duration: (engine_time_ms - self.start_ms).max(min_duration),
            fps,
            width: self.width,
            height: self.height,
            image_data: self.image_data,
            initial_settings: self.initial_settings,
            inputs: self.inputs,
        }
    }
}

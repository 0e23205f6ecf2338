//! Error types for pixelheal
//!
//! Physics itself never fails; errors only come from decoding inputs,
//! allocating raster surfaces, and driving a replay.

use thiserror::Error;

/// Errors raised by the engine while loading images or allocating surfaces
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("image has no pixels")]
    EmptyImage,
    #[error("cannot allocate a {width}x{height} raster surface")]
    SurfaceAllocation { width: u32, height: u32 },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading or validating an animation recording
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("recording fps must be positive, got {0}")]
    InvalidFps(f32),
    #[error("recording duration must be positive, got {0} ms")]
    InvalidDuration(f64),
    #[error("recording inputs are not sorted by timestamp (input {index})")]
    UnsortedInputs { index: usize },
    #[error("recording has no embedded image")]
    MissingImage,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid recording json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that abort a replay
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Recording(#[from] RecordingError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("decoded image is {actual_width}x{actual_height}, recording expects {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("invalid replay state transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: crate::replay::ReplayState,
        to: crate::replay::ReplayState,
    },
    #[error("replay cancelled")]
    Cancelled,
}

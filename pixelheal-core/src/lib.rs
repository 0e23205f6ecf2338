pub mod engine;
pub mod error;
pub mod filter_store;
pub mod forces;
pub mod histogram;
pub mod image_source;
pub mod integrator;
pub mod noise;
pub mod particle;
pub mod pulse;
pub mod recording;
pub mod render;
pub mod replay;
pub mod settings;
pub mod visibility;

pub use engine::{Engine, ParticleCount};
pub use error::{EngineError, RecordingError, ReplayError};
pub use filter_store::{image_content_hash, ColorFilterStore};
pub use forces::ForceType;
pub use histogram::ColorBucket;
pub use image_source::{decode_image, load_image};
pub use integrator::FrameStats;
pub use particle::{ColorKey, Particle, ParticleShape};
pub use pulse::{Canvas, ForcePulse, PulseKind, PulseStart};
pub use recording::{AnimationRecording, PointerInput, RecordedInput, SessionRecorder};
pub use render::Renderer;
pub use replay::{render_frames, ReplayDriver, ReplayMessage, ReplayRequest, ReplayState, ReplayWorker};
pub use settings::{ColorFilterSettings, FilterMode, ForceFieldSettings, PerformanceSettings, SettingsPatch};

// Shared by unit and integration tests, so it is always compiled
pub mod tests;

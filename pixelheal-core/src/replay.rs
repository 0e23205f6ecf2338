//! Deterministic replay of recorded sessions
//!
//! The driver rebuilds a session in a fresh engine and renders it frame by
//! frame with no wall-clock reads. [`ReplayWorker`] runs the driver on its
//! own thread and talks to the host only through channels.

use crate::engine::Engine;
use crate::error::ReplayError;
use crate::image_source::decode_image;
use crate::recording::{AnimationRecording, TIME_EPSILON_MS};
use crate::render::Renderer;
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Idle,
    DecodingImage,
    GeneratingParticles,
    FrameLoop,
    Complete,
    Error,
}

impl ReplayState {
    pub fn can_transition_to(self, next: ReplayState) -> bool {
        use ReplayState::*;
        matches!(
            (self, next),
            (Idle, DecodingImage)
                | (DecodingImage, GeneratingParticles)
                | (GeneratingParticles, FrameLoop)
                | (FrameLoop, Complete)
                | (Idle | DecodingImage | GeneratingParticles | FrameLoop, Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReplayState::Complete | ReplayState::Error)
    }
}

/// Host to worker
#[derive(Debug)]
pub enum ReplayRequest {
    Render(Box<AnimationRecording>),
}

/// Worker to host
#[derive(Debug)]
pub enum ReplayMessage {
    Progress {
        frame: usize,
        total_frames: usize,
        percentage: f32,
    },
    /// The frame buffer is moved to the receiver
    Frame {
        frame_number: usize,
        image: RgbaImage,
    },
    Complete,
    Error {
        error: String,
    },
}

/// Decides which frames get a progress notification: the first, the last,
/// and the first frame to reach each further 10%.
#[derive(Debug)]
struct ProgressGate {
    total: usize,
    last_decile: usize,
}

impl ProgressGate {
    fn new(total: usize) -> Self {
        Self {
            total,
            last_decile: 0,
        }
    }

    fn check(&mut self, frame: usize) -> Option<ReplayMessage> {
        let done = frame + 1;
        let decile = done * 10 / self.total.max(1);
        let report = frame == 0 || done == self.total || decile > self.last_decile;
        if !report {
            return None;
        }
        self.last_decile = self.last_decile.max(decile);
        Some(ReplayMessage::Progress {
            frame,
            total_frames: self.total,
            percentage: done as f32 * 100.0 / self.total.max(1) as f32,
        })
    }
}

/// Runs one recording through a fresh engine
#[derive(Debug)]
pub struct ReplayDriver {
    state: ReplayState,
    cancel: Arc<AtomicBool>,
}

impl ReplayDriver {
    pub fn new() -> Self {
        Self::with_cancel_flag(Arc::new(AtomicBool::new(false)))
    }

    /// Driver that stops between frames once `cancel` is set
    pub fn with_cancel_flag(cancel: Arc<AtomicBool>) -> Self {
        Self {
            state: ReplayState::Idle,
            cancel,
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    fn transition(&mut self, next: ReplayState) -> Result<(), ReplayError> {
        if !self.state.can_transition_to(next) {
            log::warn!("rejected replay transition {:?} -> {:?}", self.state, next);
            return Err(ReplayError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        log::debug!("replay {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Replay `recording`, handing every message to `sink`.
    ///
    /// `sink` returns `false` when the host has gone away, which cancels the
    /// replay. On failure a single `Error` message is sent and frames already
    /// delivered must be discarded. Returns the number of frames emitted.
    pub fn run<F>(&mut self, recording: &AnimationRecording, mut sink: F) -> Result<usize, ReplayError>
    where
        F: FnMut(ReplayMessage) -> bool,
    {
        match self.drive(recording, &mut sink) {
            Ok(frames) => {
                self.transition(ReplayState::Complete)?;
                log::info!("replay complete: {} frames", frames);
                sink(ReplayMessage::Complete);
                Ok(frames)
            }
            Err(e) => {
                if !self.state.is_terminal() {
                    self.state = ReplayState::Error;
                }
                log::info!("replay aborted: {}", e);
                sink(ReplayMessage::Error {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn drive<F>(&mut self, recording: &AnimationRecording, sink: &mut F) -> Result<usize, ReplayError>
    where
        F: FnMut(ReplayMessage) -> bool,
    {
        recording.validate()?;

        self.transition(ReplayState::DecodingImage)?;
        let image = decode_image(&recording.image_data)?;
        if image.width() != recording.width || image.height() != recording.height {
            return Err(ReplayError::DimensionMismatch {
                width: recording.width,
                height: recording.height,
                actual_width: image.width(),
                actual_height: image.height(),
            });
        }

        self.transition(ReplayState::GeneratingParticles)?;
        let mut settings = recording.initial_settings.clone();
        settings.fps = recording.fps;
        let mut engine = Engine::new(settings);
        engine.generate_particles_from_image(&image);

        self.transition(ReplayState::FrameLoop)?;
        let total = recording.total_frames();
        let interval = recording.frame_interval_ms();
        log::info!(
            "replaying {} frames at {} fps ({} inputs)",
            total,
            recording.fps,
            recording.inputs.len()
        );

        let mut renderer = Renderer::new();
        let mut gate = ProgressGate::new(total);
        let mut next_input = 0;
        let mut surface: Option<RgbaImage> = None;

        for frame in 0..total {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(ReplayError::Cancelled);
            }

            let time = frame as f64 * interval;
            while let Some(input) = recording.inputs.get(next_input) {
                if input.timestamp > time + TIME_EPSILON_MS {
                    break;
                }
                input.apply_to(&mut engine);
                next_input += 1;
            }

            engine.update_particles();

            let render = engine.settings().render;
            let mut target = match surface.take() {
                Some(previous) if render.trails => previous,
                _ => Renderer::allocate_surface(recording.width, recording.height, &render)?,
            };
            engine.draw_particles(&mut renderer, &mut target);

            // trails need the previous frame, so keep a copy to draw over
            let image = if render.trails {
                let emitted = target.clone();
                surface = Some(target);
                emitted
            } else {
                target
            };

            if !sink(ReplayMessage::Frame {
                frame_number: frame,
                image,
            }) {
                return Err(ReplayError::Cancelled);
            }
            if let Some(progress) = gate.check(frame) {
                if !sink(progress) {
                    return Err(ReplayError::Cancelled);
                }
            }
        }

        Ok(total)
    }
}

impl Default for ReplayDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Replay a recording synchronously and collect its frames
pub fn render_frames(recording: &AnimationRecording) -> Result<Vec<RgbaImage>, ReplayError> {
    let mut frames = Vec::new();
    ReplayDriver::new().run(recording, |msg| {
        if let ReplayMessage::Frame { image, .. } = msg {
            frames.push(image);
        }
        true
    })?;
    Ok(frames)
}

/// Handle to a replay running on its own thread
#[derive(Debug)]
pub struct ReplayWorker {
    requests: Option<Sender<ReplayRequest>>,
    messages: Receiver<ReplayMessage>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ReplayWorker {
    pub fn spawn() -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<ReplayRequest>();
        let (message_tx, message_rx) = mpsc::channel::<ReplayMessage>();
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name("pixelheal-replay".into())
            .spawn(move || {
                while let Ok(request) = request_rx.recv() {
                    match request {
                        ReplayRequest::Render(recording) => {
                            let mut driver = ReplayDriver::with_cancel_flag(Arc::clone(&worker_cancel));
                            let _ = driver.run(&recording, |msg| message_tx.send(msg).is_ok());
                        }
                    }
                    if worker_cancel.load(Ordering::Relaxed) {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: Some(request_tx),
            messages: message_rx,
            cancel,
            handle: Some(handle),
        })
    }

    /// Queue a render; `false` if the worker is gone
    pub fn render(&self, recording: AnimationRecording) -> bool {
        self.requests
            .as_ref()
            .is_some_and(|tx| tx.send(ReplayRequest::Render(Box::new(recording))).is_ok())
    }

    /// Block until the next message; `None` once the worker has exited
    pub fn recv(&self) -> Option<ReplayMessage> {
        self.messages.recv().ok()
    }

    pub fn try_recv(&self) -> Option<ReplayMessage> {
        self.messages.try_recv().ok()
    }

    /// Stop the worker between frames and wait for its thread to exit
    pub fn terminate(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("replay worker panicked");
            }
        }
    }
}

impl Drop for ReplayWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_allows_only_forward_steps() {
        use ReplayState::*;
        assert!(Idle.can_transition_to(DecodingImage));
        assert!(FrameLoop.can_transition_to(Complete));
        assert!(GeneratingParticles.can_transition_to(Error));
        assert!(!Idle.can_transition_to(FrameLoop));
        assert!(!Complete.can_transition_to(Error));
        assert!(!Error.can_transition_to(Idle));
    }

    #[test]
    fn progress_covers_first_last_and_deciles() {
        let mut gate = ProgressGate::new(95);
        let reported: Vec<usize> = (0..95).filter(|f| gate.check(*f).is_some()).collect();
        assert_eq!(reported.first(), Some(&0));
        assert_eq!(reported.last(), Some(&94));
        assert_eq!(reported.len(), 11);
    }

    #[test]
    fn progress_on_tiny_replays() {
        let mut gate = ProgressGate::new(1);
        assert!(gate.check(0).is_some());
        let mut gate = ProgressGate::new(3);
        assert_eq!((0..3).filter(|f| gate.check(*f).is_some()).count(), 3);
    }
}

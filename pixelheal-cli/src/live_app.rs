//! Interactive viewer
//!
//! Runs one engine step and one render per display frame. The settings
//! file is watched and hot reloaded; F9 captures the session into an
//! [`AnimationRecording`] that `pixelheal replay` can render later.

use eframe::egui;
use glam::Vec2;
use image::RgbaImage;
use notify::{Event, RecommendedWatcher, Watcher};
use pixelheal_core::{
    image_content_hash, ColorFilterSettings, ColorFilterStore, ColorKey, Engine, FilterMode, ForceFieldSettings,
    ForcePulse, ForceType, PulseKind, PulseStart, Renderer, SessionRecorder, SettingsPatch,
};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

const PULSE_DURATION_MS: f64 = 1200.0;
const PULSE_STRENGTH: f32 = 10.0;
const HISTOGRAM_ROWS: usize = 16;

/// Pulses bound to the number keys 1-9
const PULSE_KEYS: [(egui::Key, PulseKind); 9] = [
    (egui::Key::Num1, PulseKind::Burst),
    (egui::Key::Num2, PulseKind::Shockwave),
    (egui::Key::Num3, PulseKind::Tornado),
    (egui::Key::Num4, PulseKind::Ripple),
    (egui::Key::Num5, PulseKind::Implosion),
    (egui::Key::Num6, PulseKind::Wind),
    (egui::Key::Num7, PulseKind::Quake),
    (egui::Key::Num8, PulseKind::SpiralOut),
    (egui::Key::Num9, PulseKind::Repulsion),
];

pub struct LiveOptions {
    pub image_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub record_path: PathBuf,
    pub filters_path: Option<PathBuf>,
}

pub struct LiveApp {
    options: LiveOptions,
    image_bytes: Vec<u8>,
    image_hash: String,
    source: RgbaImage,
    engine: Engine,
    renderer: Renderer,
    surface: RgbaImage,
    texture: Option<egui::TextureHandle>,
    filters: ColorFilterStore,
    histogram_tolerance: f32,
    recorder: Option<SessionRecorder>,
    playing: bool,
    status: Option<String>,
    #[allow(dead_code)] // dropping the watcher stops the events
    settings_watcher: Option<RecommendedWatcher>,
    settings_events: mpsc::Receiver<notify::Result<Event>>,
}

impl LiveApp {
    pub fn new(
        options: LiveOptions,
        image_bytes: Vec<u8>,
        source: RgbaImage,
        settings: ForceFieldSettings,
        _cc: &eframe::CreationContext<'_>,
    ) -> Self {
        let image_hash = image_content_hash(&image_bytes);
        let mut engine = Engine::new(settings);
        let count = engine.generate_particles_from_image(&source);
        log::info!("{} particles from {}", count, options.image_path.display());

        let mut status = None;
        let filters = match &options.filters_path {
            Some(path) => ColorFilterStore::load(path).unwrap_or_else(|e| {
                status = Some(format!("Could not read filters: {}", e));
                ColorFilterStore::default()
            }),
            None => ColorFilterStore::default(),
        };
        if let Some(filter) = filters.load_for(Some(image_hash.as_str())) {
            engine.apply_color_filter(filter);
        }

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .ok();
        if let (Some(w), Some(path)) = (watcher.as_mut(), &options.settings_path) {
            if let Err(e) = w.watch(path, notify::RecursiveMode::NonRecursive) {
                log::warn!("not watching {}: {}", path.display(), e);
            }
        }

        let render = engine.settings().render;
        let surface = RgbaImage::from_pixel(source.width(), source.height(), image::Rgba(render.background));

        Self {
            options,
            image_bytes,
            image_hash,
            source,
            engine,
            renderer: Renderer::new(),
            surface,
            texture: None,
            filters,
            histogram_tolerance: 0.0,
            recorder: None,
            playing: true,
            status,
            settings_watcher: watcher,
            settings_events: rx,
        }
    }

    fn check_settings_changes(&mut self) {
        let Some(path) = self.options.settings_path.clone() else {
            return;
        };
        let mut changed = false;
        while let Ok(event) = self.settings_events.try_recv() {
            match event {
                Ok(Event {
                    kind: notify::EventKind::Modify(_),
                    paths,
                    ..
                }) => changed |= paths.iter().any(|p| p.ends_with(path.file_name().unwrap_or_default())),
                Ok(_) => {}
                Err(e) => log::warn!("settings watcher error: {}", e),
            }
        }
        if !changed {
            return;
        }

        match ForceFieldSettings::load(&path) {
            Ok(next) => {
                let resample = next.particles != self.engine.settings().particles;
                self.apply_patch(SettingsPatch::full(&next));
                if resample && self.recorder.is_none() {
                    self.engine.generate_particles_from_image(&self.source);
                } else if resample {
                    log::warn!("particle sampling changed while recording; resample after the recording stops");
                }
                self.status = Some(format!("Reloaded {}", path.display()));
            }
            Err(e) => self.status = Some(format!("Settings error: {}", e)),
        }
    }

    /// Apply a settings patch and log it to the running recording
    fn apply_patch(&mut self, patch: SettingsPatch) {
        let patch = match self.recorder.as_mut() {
            Some(recorder) => recorder.record_settings(self.engine.time_ms(), patch),
            None => patch,
        };
        self.engine.update_settings(&patch);
    }

    fn reset(&mut self) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record_reset(self.engine.time_ms());
        }
        self.engine.reset_particles();
    }

    fn set_pointer(&mut self, position: Option<Vec2>) {
        if position == self.engine.mouse_position() {
            return;
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record_pointer(self.engine.time_ms(), position);
        }
        self.engine.set_mouse_position(position);
    }

    fn fire_pulse(&mut self, kind: PulseKind) {
        let mut pulse = ForcePulse::new(kind, PULSE_DURATION_MS, PULSE_STRENGTH);
        if let Some(origin) = self.engine.mouse_position() {
            pulse = pulse.at(origin);
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record_pulse(self.engine.time_ms(), pulse.clone());
        }
        self.engine.enqueue_pulse(pulse, PulseStart::Now);
    }

    fn set_color_filter(&mut self, filter: ColorFilterSettings) {
        self.apply_patch(SettingsPatch::color_filter(filter.clone()));
        self.filters.save_for(Some(self.image_hash.as_str()), filter);
        if let Some(path) = &self.options.filters_path {
            if let Err(e) = self.filters.save(path) {
                self.status = Some(format!("Could not save filters: {}", e));
            }
        }
    }

    fn toggle_recording(&mut self) {
        match self.recorder.take() {
            Some(recorder) => {
                let recording = recorder.finish(self.engine.time_ms());
                let path = &self.options.record_path;
                self.status = Some(match recording.save(path) {
                    Ok(()) => format!(
                        "Saved {} frames, {} inputs to {}",
                        recording.total_frames(),
                        recording.inputs.len(),
                        path.display()
                    ),
                    Err(e) => format!("Recording not saved: {}", e),
                });
            }
            None => {
                // replay starts from freshly sampled particles, so start there too
                self.engine.generate_particles_from_image(&self.source);
                let mut recorder = SessionRecorder::begin(&self.engine, self.image_bytes.clone());
                recorder.record_pointer(self.engine.time_ms(), self.engine.mouse_position());
                self.recorder = Some(recorder);
                self.status = Some("Recording (F9 to stop)".to_string());
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (pulses, reset, pause, record) = ctx.input(|i| {
            let pulses: Vec<PulseKind> = PULSE_KEYS
                .iter()
                .filter(|(key, _)| i.key_pressed(*key))
                .map(|(_, kind)| *kind)
                .collect();
            (
                pulses,
                i.key_pressed(egui::Key::R),
                i.key_pressed(egui::Key::Space),
                i.key_pressed(egui::Key::F9),
            )
        });
        for kind in pulses {
            self.fire_pulse(kind);
        }
        if reset {
            self.reset();
        }
        if pause {
            self.playing = !self.playing;
        }
        if record {
            self.toggle_recording();
        }
    }

    fn step_and_render(&mut self, ctx: &egui::Context) {
        let started = Instant::now();
        if self.playing {
            self.engine.update_particles();
        }
        self.engine.draw_particles(&mut self.renderer, &mut self.surface);

        let size = [self.surface.width() as usize, self.surface.height() as usize];
        let frame = egui::ColorImage::from_rgba_unmultiplied(size, self.surface.as_raw());
        match self.texture.as_mut() {
            Some(texture) => texture.set(frame, egui::TextureOptions::NEAREST),
            None => self.texture = Some(ctx.load_texture("particles", frame, egui::TextureOptions::NEAREST)),
        }

        if self.playing {
            let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;
            if let Some(performance) = self.engine.record_frame_time(elapsed_ms) {
                if let Some(recorder) = self.recorder.as_mut() {
                    recorder.record_settings(self.engine.time_ms(), SettingsPatch::performance(performance));
                }
            }
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button(if self.playing { "⏸ Pause" } else { "▶ Play" }).clicked() {
                self.playing = !self.playing;
            }
            if ui.button("⏮ Reset").clicked() {
                self.reset();
            }
            if ui.button("⏭ Step").clicked() {
                self.engine.update_particles();
            }

            ui.separator();

            let mut active = self.engine.settings().active_force;
            egui::ComboBox::from_label("Force")
                .selected_text(active.label())
                .show_ui(ui, |ui| {
                    for force in ForceType::ALL {
                        ui.selectable_value(&mut active, force, force.label());
                    }
                });
            if active != self.engine.settings().active_force {
                self.apply_patch(SettingsPatch::active_force(active));
            }

            ui.separator();

            let record_label = if self.recorder.is_some() { "⏹ Stop recording" } else { "⏺ Record" };
            if ui.button(record_label).clicked() {
                self.toggle_recording();
            }

            ui.separator();

            let count = self.engine.get_particle_count();
            ui.label(format!(
                "Frame: {}  Particles: {} / {}  Pulses: {}",
                self.engine.frame(),
                count.visible,
                count.total,
                self.engine.pulse_count()
            ));
        });
    }

    fn filter_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Colors");
        let mut filter = self.engine.settings().color_filter.clone();
        let before = filter.clone();

        ui.checkbox(&mut filter.enabled, "Filter enabled");
        ui.horizontal(|ui| {
            ui.radio_value(&mut filter.mode, FilterMode::Show, "Show");
            ui.radio_value(&mut filter.mode, FilterMode::Hide, "Hide");
        });
        ui.add(egui::Slider::new(&mut filter.tolerance, 0.0..=120.0).text("match tolerance"));
        ui.add(egui::Slider::new(&mut self.histogram_tolerance, 0.0..=120.0).text("group tolerance"));
        ui.separator();

        let buckets = self.engine.get_color_histogram(self.histogram_tolerance);
        egui::ScrollArea::vertical().show(ui, |ui| {
            for bucket in buckets.iter().take(HISTOGRAM_ROWS) {
                let mut selected = bucket.members.iter().any(|c| filter.selected_colors.contains(c));
                ui.horizontal(|ui| {
                    let [r, g, b] = bucket.color.rgb().unwrap_or([255, 255, 255]);
                    let (swatch, _) = ui.allocate_exact_size(egui::vec2(14.0, 14.0), egui::Sense::hover());
                    ui.painter().rect_filled(swatch, 2.0, egui::Color32::from_rgb(r, g, b));
                    if ui.checkbox(&mut selected, format!("{} ({})", bucket.color, bucket.count)).changed() {
                        toggle_bucket(&mut filter, &bucket.members, selected);
                    }
                });
            }
        });

        if filter != before {
            self.set_color_filter(filter);
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let Some(texture) = self.texture.as_ref() else {
            return;
        };
        let image_size = egui::vec2(self.surface.width() as f32, self.surface.height() as f32);
        let available = ui.available_size();
        let scale = (available.x / image_size.x).min(available.y / image_size.y).max(0.01);
        let (rect, response) = ui.allocate_exact_size(image_size * scale, egui::Sense::hover());
        ui.painter().image(
            texture.id(),
            rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let pointer = response.hover_pos().map(|pos| {
            let local = (pos - rect.min) / scale;
            Vec2::new(local.x, local.y)
        });
        self.set_pointer(pointer);
    }
}

fn toggle_bucket(filter: &mut ColorFilterSettings, members: &[ColorKey], selected: bool) {
    for color in members {
        if selected {
            filter.selected_colors.insert(color.clone());
        } else {
            filter.selected_colors.remove(color);
        }
    }
}

impl eframe::App for LiveApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_settings_changes();
        self.handle_keys(ctx);

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.controls(ui));

        egui::SidePanel::right("colors")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| self.filter_panel(ui));

        if let Some(status) = self.status.clone() {
            egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
                ui.label(status);
            });
        }

        // pointer is read while laying out the canvas, before the step
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| self.canvas(ui));

        self.step_and_render(ctx);
        ctx.request_repaint();
    }
}

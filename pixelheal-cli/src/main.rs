mod live_app;

use clap::{Parser, Subcommand};
use live_app::{LiveApp, LiveOptions};
use pixelheal_core::{
    decode_image, image_content_hash, AnimationRecording, Engine, ForceFieldSettings, ReplayMessage,
    ReplayWorker,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pixelheal")]
#[command(about = "pixelheal - images as self-healing particle fields", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an image in the interactive viewer
    View {
        /// Image to sample (PNG or JPEG)
        image: PathBuf,
        /// Settings JSON file, reloaded whenever it changes
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Where F9 writes the session recording
        #[arg(long, default_value = "pixelheal-recording.json")]
        record: PathBuf,
        /// Color filter store, keyed by image content
        #[arg(long)]
        filters: Option<PathBuf>,
    },
    /// Render a recording to numbered PNG frames
    Replay {
        /// Recording JSON file
        recording: PathBuf,
        /// Output directory
        #[arg(long)]
        out: PathBuf,
        /// Write only every Nth frame
        #[arg(long, default_value_t = 1)]
        every: usize,
    },
    /// Summarise a recording
    Info {
        /// Recording JSON file
        recording: PathBuf,
    },
    /// Print the color histogram of an image's particles
    Histogram {
        image: PathBuf,
        #[arg(long)]
        settings: Option<PathBuf>,
        /// RGB distance within which colors are merged
        #[arg(long, default_value_t = 0.0)]
        tolerance: f32,
        /// Number of buckets to print
        #[arg(long, default_value_t = 16)]
        top: usize,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::View {
            image,
            settings,
            record,
            filters,
        } => run_view(LiveOptions {
            image_path: image,
            settings_path: settings,
            record_path: record,
            filters_path: filters,
        }),
        Commands::Replay { recording, out, every } => run_replay(&recording, &out, every),
        Commands::Info { recording } => run_info(&recording),
        Commands::Histogram {
            image,
            settings,
            tolerance,
            top,
        } => run_histogram(&image, settings.as_deref(), tolerance, top),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_settings(path: Option<&Path>) -> Result<ForceFieldSettings, Box<dyn std::error::Error>> {
    match path {
        Some(path) if path.exists() => Ok(ForceFieldSettings::load(path)?),
        Some(path) => {
            log::info!("{} does not exist yet, using default settings", path.display());
            Ok(ForceFieldSettings::default())
        }
        None => Ok(ForceFieldSettings::default()),
    }
}

fn run_view(options: LiveOptions) -> Result<(), Box<dyn std::error::Error>> {
    let image_bytes = fs::read(&options.image_path)?;
    let image = decode_image(&image_bytes)?;
    let settings = load_settings(options.settings_path.as_deref())?;

    let title = format!("pixelheal - {}", options.image_path.display());
    let viewport = egui::ViewportBuilder::default()
        .with_title(title.clone())
        .with_inner_size([
            (image.width() as f32 + 260.0).min(1600.0),
            (image.height() as f32 + 60.0).min(1000.0),
        ]);
    let native = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        &title,
        native,
        Box::new(move |cc| Ok(Box::new(LiveApp::new(options, image_bytes, image, settings, cc)))),
    )?;
    Ok(())
}

fn run_replay(recording_path: &Path, out: &Path, every: usize) -> Result<(), Box<dyn std::error::Error>> {
    let recording = AnimationRecording::load(recording_path)?;
    let total = recording.total_frames();
    let every = every.max(1);
    fs::create_dir_all(out)?;

    let worker = ReplayWorker::spawn()?;
    if !worker.render(recording) {
        return Err("replay worker exited before accepting the recording".into());
    }

    let mut written = 0;
    loop {
        match worker.recv() {
            Some(ReplayMessage::Frame { frame_number, image }) => {
                if frame_number % every == 0 {
                    image.save(out.join(format!("frame_{:05}.png", frame_number)))?;
                    written += 1;
                }
            }
            Some(ReplayMessage::Progress { frame, percentage, .. }) => {
                log::info!("frame {}/{} ({:.0}%)", frame + 1, total, percentage);
            }
            Some(ReplayMessage::Complete) => break,
            Some(ReplayMessage::Error { error }) => return Err(error.into()),
            None => return Err("replay worker exited unexpectedly".into()),
        }
    }
    worker.terminate();

    println!("wrote {} of {} frames to {}", written, total, out.display());
    Ok(())
}

fn run_info(recording_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let recording = AnimationRecording::load(recording_path)?;
    let image = decode_image(&recording.image_data)?;

    let mut pulses: BTreeMap<String, usize> = BTreeMap::new();
    let mut settings_changes = 0;
    let mut pointer_moves = 0;
    for input in &recording.inputs {
        if let Some(pulse) = &input.pulse {
            *pulses.entry(format!("{:?}", pulse.kind)).or_default() += 1;
        }
        if input.settings_change.is_some() {
            settings_changes += 1;
        }
        if input.pointer.is_some() {
            pointer_moves += 1;
        }
    }

    println!("duration     = {:.1} ms", recording.duration);
    println!("fps          = {}", recording.fps);
    println!("frames       = {}", recording.total_frames());
    println!("size         = {}x{}", recording.width, recording.height);
    println!("image        = {}x{} ({} bytes, {})", image.width(), image.height(), recording.image_data.len(), image_content_hash(&recording.image_data));
    println!("inputs       = {}", recording.inputs.len());
    println!("  settings   = {}", settings_changes);
    println!("  pointer    = {}", pointer_moves);
    for (kind, count) in pulses {
        println!("  pulse {:<14} {}", kind, count);
    }
    Ok(())
}

fn run_histogram(
    image_path: &Path,
    settings_path: Option<&Path>,
    tolerance: f32,
    top: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = decode_image(&fs::read(image_path)?)?;
    let settings = load_settings(settings_path)?;
    let mut engine = Engine::new(settings);
    let total = engine.generate_particles_from_image(&image);

    println!("{} particles", total);
    for bucket in engine.get_color_histogram(tolerance).iter().take(top) {
        let share = bucket.count as f32 * 100.0 / total.max(1) as f32;
        println!("{} {:>8} {:>6.2}%  ({} keys)", bucket.color, bucket.count, share, bucket.members.len());
    }
    Ok(())
}

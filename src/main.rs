use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use futures::executor::block_on;
use clap::Parser;
use futures::StreamExt;
use log::{error, info};
use simple_logger::SimpleLogger;

use midi_preview_player::backend::AudioBackend;
use midi_preview_player::clock::SystemClock;
use midi_preview_player::config::PlayerConfig;
use midi_preview_player::controller::{PlaybackController, PlaybackHandle};
use midi_preview_player::error::PlaybackError;
use midi_preview_player::midi_loader;
use midi_preview_player::model::Role;
use midi_preview_player::osc_backend::OscBackend;
use midi_preview_player::osc_read_daemon::CommandListener;
use midi_preview_player::playback_daemon::PlaybackDaemon;
use midi_preview_player::recording::RecordingBackend;

/// Plays a reference and a student MIDI file on demand, driven by OSC commands
#[derive(Parser, Debug)]
#[command(name = "midi-preview-player")]
struct Args {
    /// Reference MIDI file
    reference: PathBuf,

    /// Student MIDI file
    student: Option<PathBuf>,

    /// YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log voice calls instead of sending them to a synth
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PlayerConfig::load(path),
        None => Ok(PlayerConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    // Validated on load
    let level = config.level_filter().unwrap_or(midi_preview_player::config::LOG_LEVEL);
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = if args.dry_run {
        info!("Dry run: voice calls are logged instead of sent to a synth");
        run(RecordingBackend::new(SystemClock::new()).with_logging(true), &args, &config)
    } else {
        run(OscBackend::new(&config.synth_socket_addr, &config.synth_addr), &args, &config)
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run<B>(backend: B, args: &Args, config: &PlayerConfig) -> Result<(), PlaybackError>
where
    B: AudioBackend + Send + 'static,
    B::Pool: Send,
{
    let mut controller = PlaybackController::new(backend, config.voice);

    controller.load_document(Role::Reference, midi_loader::load_midi_file(&args.reference)?);
    if let Some(student) = &args.student {
        controller.load_document(Role::Student, midi_loader::load_midi_file(student)?);
    }

    let handle = PlaybackHandle::new(controller);

    // Progress log, standing in for a UI
    let mut progress = handle.subscribe()?;
    thread::spawn(move || {
        block_on(async {
            while let Some(sample) = progress.next().await {
                match sample.playing_role {
                    Some(role) => info!("[{}] {:.2} / {:.2}", role, sample.elapsed_time, sample.total_duration),
                    None => info!("Stopped"),
                }
            }
        });
    });

    let daemon = PlaybackDaemon::start(handle.clone(), Duration::from_micros(config.frame_time_us));
    let _listener = CommandListener::start(&config.command_addr, handle.clone())?;

    info!("Ready. Send /play, /seek, /stop or /voice to {}", config.command_addr);

    while daemon.is_running() {
        thread::sleep(Duration::from_millis(500));
    }

    Err(PlaybackError::Config("playback loop exited".to_string()))
}

pub mod backend;
pub mod clock;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod midi_loader;
pub mod midi_utils;
pub mod model;
pub mod osc_backend;
pub mod osc_communication;
pub mod osc_read_daemon;
pub mod playback_daemon;
pub mod progress;
pub mod recording;
pub mod scheduler;
pub mod timer_queue;

pub use backend::{AudioBackend, Timbre, VoicePool, VoiceSettings};
pub use clock::{Clock, ManualClock, SystemClock};
pub use commands::PlayerCommand;
pub use controller::{PlaybackController, PlaybackHandle};
pub use error::PlaybackError;
pub use model::{MidiDocument, Note, PlaybackState, ProgressSample, Role, Track};
pub use progress::FrameOutcome;

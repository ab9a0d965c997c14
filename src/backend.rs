use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/*

    Collaborator contract between the playback core and whatever makes sound.

    The backend supplies the clock all anchors are measured against and creates voice pools.
        The playback controller is the only owner of a pool: it creates a fresh one per session
        (so current timbre and volume apply) and disposes it again on stop.

*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timbre {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Timbre {
    pub fn parse(name: &str) -> Option<Timbre> {
        match name.trim().to_lowercase().as_str() {
            "sine" => Some(Timbre::Sine),
            "triangle" => Some(Timbre::Triangle),
            "square" => Some(Timbre::Square),
            "sawtooth" | "saw" => Some(Timbre::Sawtooth),
            _ => None,
        }
    }

    // Synth definition name on the synth server
    pub fn synth_name(&self) -> &'static str {
        match self {
            Timbre::Sine => "preview_sine",
            Timbre::Triangle => "preview_triangle",
            Timbre::Square => "preview_square",
            Timbre::Sawtooth => "preview_saw",
        }
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Timbre::Sine => "sine",
            Timbre::Triangle => "triangle",
            Timbre::Square => "square",
            Timbre::Sawtooth => "sawtooth",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSettings {
    pub timbre: Timbre,
    pub volume_db: f64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        VoiceSettings {
            timbre: Timbre::Triangle,
            volume_db: -8.0,
        }
    }
}

pub trait VoicePool {
    /// Sound `pitch` for `duration` seconds. `at_time` is a clock time; `None` means now.
    fn trigger_attack_release(&mut self, pitch: &str, duration: f64, at_time: Option<f64>, velocity: f64);

    fn release_all(&mut self);

    /// Releases everything and makes the pool inert. Further calls are ignored.
    fn dispose(&mut self);
}

pub trait AudioBackend {
    type Pool: VoicePool;

    /// Make sure clock and synth are running. Called before every anchor is taken.
    fn ensure_running(&mut self) -> Result<(), PlaybackError>;

    fn now(&self) -> f64;

    fn create_voice_pool(&mut self, settings: &VoiceSettings) -> Result<Self::Pool, PlaybackError>;
}

#[cfg(test)]
mod tests {
    use super::{Timbre, VoiceSettings};

    #[test]
    fn timbre_names() {
        assert_eq!(Timbre::parse("Saw"), Some(Timbre::Sawtooth));
        assert_eq!(Timbre::parse("sine"), Some(Timbre::Sine));
        assert_eq!(Timbre::parse("organ"), None);
        assert_eq!(Timbre::Square.to_string(), "square");
        assert_eq!(Timbre::Triangle.synth_name(), "preview_triangle");
    }

    #[test]
    fn default_settings() {
        let settings = VoiceSettings::default();
        assert_eq!(settings.timbre, Timbre::Triangle);
        assert_eq!(settings.volume_db, -8.0);
    }
}

use std::path::Path;

use log::LevelFilter;
use serde::Deserialize;

use crate::backend::VoiceSettings;
use crate::error::PlaybackError;

/*
    Central place for application defaults. Everything below can be overridden by a YAML
        config file (see PlayerConfig).
 */

pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;
pub const APPLICATION_IP: &str = "127.0.0.1";

pub const APPLICATION_IN_PORT: i32 = 14451; // Player commands sent to this port will be executed
pub const APPLICATION_OUT_PORT: i32 = 13331; // Synth server (jdw-sc style)
pub const APPLICATION_OUT_SOCKET_PORT: i32 = 14454; // Outgoing synth messages are sent from this port

// "US" = Microseconds. One frame at 60 fps.
pub const FRAME_TIME_US: u64 = 16667;

pub fn get_addr(port: i32) -> String {
    format!("{}:{}", APPLICATION_IP, port)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PlayerConfig {
    pub log_level: String,
    pub command_addr: String,
    pub synth_addr: String,
    pub synth_socket_addr: String,
    pub frame_time_us: u64,
    pub voice: VoiceSettings,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            log_level: LOG_LEVEL.to_string(),
            command_addr: get_addr(APPLICATION_IN_PORT),
            synth_addr: get_addr(APPLICATION_OUT_PORT),
            synth_socket_addr: get_addr(APPLICATION_OUT_SOCKET_PORT),
            frame_time_us: FRAME_TIME_US,
            voice: VoiceSettings::default(),
        }
    }
}

impl PlayerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<PlayerConfig, PlaybackError> {
        let config: PlayerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<PlayerConfig, PlaybackError> {
        let yaml = std::fs::read_to_string(path)?;
        PlayerConfig::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<(), PlaybackError> {
        if self.frame_time_us == 0 {
            return Err(PlaybackError::Config("frame_time_us must be greater than zero".to_string()));
        }
        if !self.voice.volume_db.is_finite() {
            return Err(PlaybackError::Config("voice.volumeDb must be a finite number".to_string()));
        }
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter, PlaybackError> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| PlaybackError::Config(format!("Unknown log level: {}", self.log_level)))
    }
}

use thiserror::Error;

/*
    Error type shared by the whole crate.

    Note that most of the playback core never fails: missing documents and stale triggers are
        silent no-ops. What remains is the I/O at the edges (synth socket, MIDI files, config).
*/
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The clock/synth backend could not be brought into a running state.
    #[error("Audio backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OSC error: {0}")]
    Osc(String),

    #[error("Failed to parse MIDI data: {0}")]
    Midi(#[from] midly::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read configuration: {0}")]
    ConfigFormat(#[from] serde_yaml::Error),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Raised when an incoming OSC message cannot be turned into a player command.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Playback state lock poisoned")]
    LockPoisoned,
}

#[cfg(test)]
mod tests {
    use super::PlaybackError;

    #[test]
    fn display_messages() {
        let err = PlaybackError::BackendUnavailable("socket closed".to_string());
        assert_eq!(err.to_string(), "Audio backend unavailable: socket closed");

        let err = PlaybackError::UnknownRole("conductor".to_string());
        assert_eq!(err.to_string(), "Unknown role: conductor");
    }
}

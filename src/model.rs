use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/*
    Which of the two loaded documents a playback command addresses.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reference,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Reference => write!(f, "reference"),
            Role::Student => write!(f, "student"),
        }
    }
}

impl FromStr for Role {
    type Err = PlaybackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reference" => Ok(Role::Reference),
            "student" => Ok(Role::Student),
            other => Err(PlaybackError::UnknownRole(other.to_string())),
        }
    }
}

/*
    A single parsed note. Times are in seconds from the start of the document.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub pitch_name: String,
    pub start_time: f64,
    pub duration: f64,
    pub velocity: f64,
}

impl Note {
    pub fn new(pitch_name: &str, start_time: f64, duration: f64, velocity: f64) -> Note {
        Note {
            pitch_name: pitch_name.to_string(),
            start_time,
            duration,
            velocity,
        }
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub name: Option<String>,
    pub notes: Vec<Note>,
}

impl Track {
    pub fn new(notes: Vec<Note>) -> Track {
        Track { name: None, notes }
    }
}

/*
    All tracks of one loaded MIDI source. Track grouping only mirrors the source file;
        playback treats the notes of all tracks as one flat set.
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MidiDocument {
    pub tracks: Vec<Track>,
}

impl MidiDocument {
    pub fn new(tracks: Vec<Track>) -> MidiDocument {
        MidiDocument { tracks }
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.tracks.iter().flat_map(|track| track.notes.iter())
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|track| track.notes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.note_count() == 0
    }

    // Max end time over all notes, 0.0 for an empty document
    pub fn logical_duration(&self) -> f64 {
        self.notes().map(|note| note.end_time()).fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing(Role),
}

impl PlaybackState {
    pub fn playing_role(&self) -> Option<Role> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Playing(role) => Some(*role),
        }
    }
}

/*
    What the UI binding receives on every frame.
 */
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSample {
    pub playing_role: Option<Role>,
    pub elapsed_time: f64,
    pub total_duration: f64,
}

#[cfg(test)]
mod tests {
    use super::{MidiDocument, Note, Role, Track};

    #[test]
    fn logical_duration_spans_tracks() {
        let doc = MidiDocument::new(vec![
            Track::new(vec![Note::new("C4", 0.0, 1.0, 0.5), Note::new("E4", 4.0, 2.5, 0.5)]),
            Track::new(vec![Note::new("G2", 1.0, 9.0, 1.0)]),
        ]);

        assert_eq!(doc.logical_duration(), 10.0);
        assert_eq!(doc.note_count(), 3);
        assert!(!doc.is_empty());
    }

    #[test]
    fn empty_document() {
        let doc = MidiDocument::new(vec![Track::new(vec![])]);
        assert!(doc.is_empty());
        assert_eq!(doc.logical_duration(), 0.0);
    }

    #[test]
    fn role_parsing() {
        assert_eq!("reference".parse::<Role>().unwrap(), Role::Reference);
        assert_eq!(" Student ".parse::<Role>().unwrap(), Role::Student);
        assert!("conductor".parse::<Role>().is_err());
        assert_eq!(Role::Student.to_string(), "student");
    }
}

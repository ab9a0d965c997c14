use std::collections::{HashMap, VecDeque};
use std::path::Path;

use log::{debug, info};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use crate::error::PlaybackError;
use crate::midi_utils;
use crate::model::{MidiDocument, Note, Track};

/*

    Standard MIDI File -> MidiDocument.

    Tick positions are converted to seconds with a tempo map collected from the Set Tempo events
        of all tracks (format 1 files keep them in the first track only). Note-ons are paired
        with note-offs per (channel, key) in FIFO order; a note-on with velocity zero counts as a
        note-off. Notes still open when their track ends are closed at the track's last tick.

*/

const DEFAULT_USEC_PER_QUARTER: u32 = 500_000;

enum TimeBase {
    Metrical {
        ticks_per_quarter: u16,
        // (tick, usec per quarter), sorted by tick
        tempo_changes: Vec<(u64, u32)>,
    },
    Timecode {
        seconds_per_tick: f64,
    },
}

impl TimeBase {
    fn seconds_at(&self, tick: u64) -> f64 {
        match self {
            TimeBase::Timecode { seconds_per_tick } => tick as f64 * seconds_per_tick,
            TimeBase::Metrical {
                ticks_per_quarter,
                tempo_changes,
            } => {
                let mut seconds = 0.0;
                let mut last_tick = 0;
                let mut tempo = DEFAULT_USEC_PER_QUARTER;

                for (change_tick, new_tempo) in tempo_changes {
                    if *change_tick > tick {
                        break;
                    }
                    seconds += midi_utils::ticks_to_seconds(change_tick - last_tick, *ticks_per_quarter, tempo);
                    last_tick = *change_tick;
                    tempo = *new_tempo;
                }

                seconds + midi_utils::ticks_to_seconds(tick - last_tick, *ticks_per_quarter, tempo)
            }
        }
    }
}

fn time_base(smf: &Smf) -> TimeBase {
    match smf.header.timing {
        Timing::Metrical(ticks) => {
            let mut tempo_changes = vec![];
            for track in &smf.tracks {
                let mut tick: u64 = 0;
                for event in track {
                    tick += event.delta.as_int() as u64;
                    if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                        tempo_changes.push((tick, tempo.as_int()));
                    }
                }
            }
            // Stable sort keeps the file order of changes on the same tick
            tempo_changes.sort_by_key(|change| change.0);

            TimeBase::Metrical {
                ticks_per_quarter: ticks.as_int().max(1),
                tempo_changes,
            }
        }
        Timing::Timecode(fps, subframes) => {
            let ticks_per_second = (fps.as_f32() as f64 * subframes as f64).max(1.0);
            TimeBase::Timecode {
                seconds_per_tick: 1.0 / ticks_per_second,
            }
        }
    }
}

pub fn parse_midi(bytes: &[u8]) -> Result<MidiDocument, PlaybackError> {
    let smf = Smf::parse(bytes)?;
    let time_base = time_base(&smf);

    let mut tracks = vec![];

    for (index, events) in smf.tracks.iter().enumerate() {
        let mut name: Option<String> = None;
        let mut notes: Vec<Note> = vec![];
        let mut open_notes: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();
        let mut tick: u64 = 0;

        let close_note = |key: u8, start_tick: u64, velocity: u8, end_tick: u64, notes: &mut Vec<Note>| {
            let start_time = time_base.seconds_at(start_tick);
            let duration = time_base.seconds_at(end_tick) - start_time;
            if duration > 0.0 {
                notes.push(Note {
                    pitch_name: midi_utils::key_to_pitch_name(key),
                    start_time,
                    duration,
                    velocity: velocity as f64 / 127.0,
                });
            }
        };

        for event in events {
            tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Midi { channel, message } => {
                    let (key, velocity, is_on) = match message {
                        MidiMessage::NoteOn { key, vel } => (key.as_int(), vel.as_int(), vel.as_int() > 0),
                        MidiMessage::NoteOff { key, vel } => (key.as_int(), vel.as_int(), false),
                        _ => continue,
                    };
                    let slot = (channel.as_int(), key);

                    if is_on {
                        open_notes.entry(slot).or_default().push_back((tick, velocity));
                    } else if let Some((start_tick, start_velocity)) =
                        open_notes.get_mut(&slot).and_then(|queue| queue.pop_front())
                    {
                        close_note(key, start_tick, start_velocity, tick, &mut notes);
                    }
                }
                TrackEventKind::Meta(MetaMessage::TrackName(raw)) => {
                    name = Some(String::from_utf8_lossy(raw).to_string());
                }
                _ => {}
            }
        }

        let mut hanging = 0;
        for ((_, key), queue) in open_notes {
            for (start_tick, velocity) in queue {
                close_note(key, start_tick, velocity, tick, &mut notes);
                hanging += 1;
            }
        }
        if hanging > 0 {
            debug!("Track {}: closed {} hanging notes at end of track", index, hanging);
        }

        if notes.is_empty() {
            continue;
        }

        notes.sort_by(|a, b| a.start_time.partial_cmp(&b.start_time).unwrap_or(std::cmp::Ordering::Equal));
        tracks.push(Track { name, notes });
    }

    Ok(MidiDocument::new(tracks))
}

pub fn load_midi_file(path: &Path) -> Result<MidiDocument, PlaybackError> {
    let bytes = std::fs::read(path)?;
    let document = parse_midi(&bytes)?;
    info!(
        "Parsed {}: {} tracks, {} notes",
        path.display(),
        document.tracks.len(),
        document.note_count()
    );
    Ok(document)
}

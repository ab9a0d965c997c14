/*
    Helper functions for MIDI-related calculations.
 */

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

// Tone.js / scientific pitch convention: MIDI 60 = C4
pub fn key_to_pitch_name(key: u8) -> String {
    let octave = (key / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(key % 12) as usize], octave)
}

pub fn pitch_name_to_key(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    let base: i32 = match letter {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest: String = chars.collect();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, &rest[..]),
    };

    let octave: i32 = octave_str.parse().ok()?;
    let key = (octave + 1) * 12 + base + accidental;
    if (0..=127).contains(&key) {
        Some(key as u8)
    } else {
        None
    }
}

pub fn key_to_frequency(key: u8) -> f64 {
    440.0 * 2f64.powf((key as f64 - 69.0) / 12.0)
}

pub fn pitch_name_to_frequency(name: &str) -> Option<f64> {
    pitch_name_to_key(name).map(key_to_frequency)
}

// Seconds covered by the given amount of ticks at a tempo of usec_per_quarter
pub fn ticks_to_seconds(ticks: u64, ticks_per_quarter: u16, usec_per_quarter: u32) -> f64 {
    (ticks as f64 * usec_per_quarter as f64) / (ticks_per_quarter as f64 * 1_000_000.0)
}

pub fn db_to_gain(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

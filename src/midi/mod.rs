//! Note data structures: key identities, pitches, note events and tracks.
//!
//! This module provides the types recorded by the sequencer and replayed by
//! the playback scheduler. Keys are identified by [`KeyId`] rather than by
//! their pitch, so two keys that happen to sound the same frequency never
//! alias each other.

mod note;
mod track;

pub use note::{NoteEvent, MIN_NOTE_DURATION};
pub use track::{Track, TrackStore};

/// Standard note names for display purposes.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// MIDI note number of the leftmost key at octave offset 0 (C4).
pub const BASE_NOTE: u8 = 60;

/// Identity of one key on the playable keyboard.
///
/// The layout follows a piano on a QWERTY home row: white keys on
/// `A S D F G H J K L ;`, black keys on `W E T Y U O P`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyId {
    A,
    W,
    S,
    E,
    D,
    F,
    T,
    G,
    Y,
    H,
    U,
    J,
    K,
    O,
    L,
    P,
    Semicolon,
}

impl KeyId {
    /// All keys from lowest to highest pitch.
    pub const ALL: [KeyId; 17] = [
        KeyId::A,
        KeyId::W,
        KeyId::S,
        KeyId::E,
        KeyId::D,
        KeyId::F,
        KeyId::T,
        KeyId::G,
        KeyId::Y,
        KeyId::H,
        KeyId::U,
        KeyId::J,
        KeyId::K,
        KeyId::O,
        KeyId::L,
        KeyId::P,
        KeyId::Semicolon,
    ];

    /// Maps a typed character to a key (case-insensitive).
    pub fn from_char(c: char) -> Option<Self> {
        let key = match c.to_ascii_lowercase() {
            'a' => KeyId::A,
            'w' => KeyId::W,
            's' => KeyId::S,
            'e' => KeyId::E,
            'd' => KeyId::D,
            'f' => KeyId::F,
            't' => KeyId::T,
            'g' => KeyId::G,
            'y' => KeyId::Y,
            'h' => KeyId::H,
            'u' => KeyId::U,
            'j' => KeyId::J,
            'k' => KeyId::K,
            'o' => KeyId::O,
            'l' => KeyId::L,
            'p' => KeyId::P,
            ';' => KeyId::Semicolon,
            _ => return None,
        };
        Some(key)
    }

    /// The character printed on the key.
    pub fn label(self) -> char {
        match self {
            KeyId::A => 'A',
            KeyId::W => 'W',
            KeyId::S => 'S',
            KeyId::E => 'E',
            KeyId::D => 'D',
            KeyId::F => 'F',
            KeyId::T => 'T',
            KeyId::G => 'G',
            KeyId::Y => 'Y',
            KeyId::H => 'H',
            KeyId::U => 'U',
            KeyId::J => 'J',
            KeyId::K => 'K',
            KeyId::O => 'O',
            KeyId::L => 'L',
            KeyId::P => 'P',
            KeyId::Semicolon => ';',
        }
    }

    /// Semitones above the leftmost key.
    pub fn semitone(self) -> u8 {
        self as u8
    }

    /// MIDI note number for this key with the given octave shift.
    pub fn note(self, octave_offset: i8) -> u8 {
        let note = BASE_NOTE as i16 + self.semitone() as i16 + octave_offset as i16 * 12;
        note.clamp(0, 127) as u8
    }

    /// Whether this key sits on a black piano key.
    pub fn is_black(self) -> bool {
        matches!(self.note(0) % 12, 1 | 3 | 6 | 8 | 10)
    }

    /// Equal-tempered frequency in Hz for this key with the given octave shift.
    pub fn frequency(self, octave_offset: i8) -> f64 {
        note_to_frequency(self.note(octave_offset))
    }
}

/// Converts a MIDI note number to its equal-tempered frequency (A4 = 440 Hz).
pub fn note_to_frequency(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

/// Converts a MIDI note number to a human-readable note name with octave.
///
/// # Examples
///
/// ```
/// use keytracks::midi::note_to_name;
///
/// assert_eq!(note_to_name(60), "C4");
/// ```
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1;
    let note_index = (note % 12) as usize;
    format!("{}{}", NOTE_NAMES[note_index], octave)
}

/// Finds the nearest MIDI note for a frequency, for display.
pub fn frequency_to_note(frequency: f64) -> Option<u8> {
    if frequency.is_nan() || frequency <= 0.0 {
        return None;
    }
    let note = 69.0 + 12.0 * (frequency / 440.0).log2();
    let note = note.round();
    (0.0..=127.0).contains(&note).then_some(note as u8)
}

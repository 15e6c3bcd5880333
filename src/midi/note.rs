//! Recorded note events.
//!
//! A note event is one finished press/release pair: the pitch that sounded,
//! when it started relative to the recording start, and how long it was held.

/// Shortest duration a recorded note can have, in seconds.
///
/// A key released at the same clock reading it was pressed still produces an
/// audible, positive-length note.
pub const MIN_NOTE_DURATION: f64 = 0.001;

/// A single recorded note.
///
/// Events are immutable once recorded; the fields are read through accessors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    frequency: f64,
    onset: f64,
    duration: f64,
}

impl NoteEvent {
    /// Creates a note event.
    ///
    /// # Arguments
    ///
    /// * `frequency` - Pitch in Hz
    /// * `onset` - Seconds from the recording start; negative values clamp to 0
    /// * `duration` - Seconds held; clamped to at least [`MIN_NOTE_DURATION`]
    ///
    /// # Examples
    ///
    /// ```
    /// use keytracks::midi::NoteEvent;
    ///
    /// let note = NoteEvent::new(440.0, 0.0, 0.5);
    /// assert_eq!(note.end(), 0.5);
    /// ```
    pub fn new(frequency: f64, onset: f64, duration: f64) -> Self {
        Self {
            frequency,
            onset: onset.max(0.0),
            duration: duration.max(MIN_NOTE_DURATION),
        }
    }

    /// Pitch in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Seconds from the start of the recording to the note start.
    pub fn onset(&self) -> f64 {
        self.onset
    }

    /// Seconds the note was held.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Seconds from the start of the recording to the note end.
    pub fn end(&self) -> f64 {
        self.onset + self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_creation() {
        let note = NoteEvent::new(440.0, 0.25, 0.5);
        assert_eq!(note.frequency(), 440.0);
        assert_eq!(note.onset(), 0.25);
        assert_eq!(note.duration(), 0.5);
        assert_eq!(note.end(), 0.75);
    }

    #[test]
    fn test_note_clamping() {
        let note = NoteEvent::new(440.0, -1.0, 0.0);
        assert_eq!(note.onset(), 0.0);
        assert_eq!(note.duration(), MIN_NOTE_DURATION);
        assert!(note.duration() > 0.0);
    }
}

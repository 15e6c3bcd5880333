//! Note recording sessions.
//!
//! A session is either idle or armed. While armed it turns key presses and
//! releases into [`NoteEvent`]s timed from the moment the session started.

use crate::error::{Result, SynthError};
use crate::midi::{KeyId, NoteEvent};
use std::collections::HashMap;

/// A key that is down while the session is armed.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingNote {
    /// Seconds after the session start.
    onset: f64,
    /// Captured at press time so octave changes mid-note don't alter it.
    frequency: f64,
}

/// Records press/release pairs into note events.
///
/// State machine: idle → armed (`start`) → idle (`stop`).
#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    armed: bool,
    start: f64,
    pending: HashMap<KeyId, PendingNote>,
    events: Vec<NoteEvent>,
}

impl RecordingSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the session with `now` as time zero.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyArmed` if a recording is in progress
    pub fn start(&mut self, now: f64) -> Result<()> {
        if self.armed {
            return Err(SynthError::AlreadyArmed);
        }
        self.armed = true;
        self.start = now;
        self.pending.clear();
        self.events.clear();
        tracing::debug!(start = now, "Note recording armed");
        Ok(())
    }

    /// Disarms the session and returns the finished notes.
    ///
    /// Keys still held are dropped; they never produced a release.
    ///
    /// # Errors
    ///
    /// Returns `NotArmed` if no recording is in progress
    pub fn stop(&mut self) -> Result<Vec<NoteEvent>> {
        if !self.armed {
            return Err(SynthError::NotArmed);
        }
        self.armed = false;
        if !self.pending.is_empty() {
            tracing::debug!(
                held = self.pending.len(),
                "Discarding notes still held at stop"
            );
            self.pending.clear();
        }
        Ok(std::mem::take(&mut self.events))
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Seconds since the session was armed (0 when idle).
    pub fn elapsed(&self, now: f64) -> f64 {
        if self.armed {
            (now - self.start).max(0.0)
        } else {
            0.0
        }
    }

    /// Marks `key` as sounding from `now`.
    ///
    /// # Returns
    ///
    /// true if an onset was recorded; false when idle or when the key
    /// already has one
    pub fn note_on(&mut self, key: KeyId, frequency: f64, now: f64) -> bool {
        if !self.armed || self.pending.contains_key(&key) {
            return false;
        }
        let onset = self.elapsed(now);
        self.pending.insert(key, PendingNote { onset, frequency });
        true
    }

    /// Finishes the note held on `key` at `now`.
    ///
    /// # Returns
    ///
    /// The recorded event, or `None` if the key had no onset in this session
    pub fn note_off(&mut self, key: KeyId, now: f64) -> Option<NoteEvent> {
        if !self.armed {
            return None;
        }
        let pending = self.pending.remove(&key)?;
        let duration = self.elapsed(now) - pending.onset;
        let event = NoteEvent::new(pending.frequency, pending.onset, duration);
        self.events.push(event);
        Some(event)
    }

    /// Notes finished so far in this session.
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Number of keys currently held with a recorded onset.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MIN_NOTE_DURATION;

    #[test]
    fn test_state_machine() {
        let mut session = RecordingSession::new();
        assert!(!session.is_armed());
        assert_eq!(session.stop(), Err(SynthError::NotArmed));

        session.start(1.0).unwrap();
        assert!(session.is_armed());
        assert_eq!(session.elapsed(1.5), 0.5);
        assert_eq!(session.start(2.0), Err(SynthError::AlreadyArmed));
        // The failed start did not move time zero
        assert_eq!(session.elapsed(3.0), 2.0);

        assert_eq!(session.stop(), Ok(vec![]));
        assert!(!session.is_armed());
        assert_eq!(session.stop(), Err(SynthError::NotArmed));
    }

    #[test]
    fn test_single_note() {
        let mut session = RecordingSession::new();
        session.start(0.0).unwrap();
        assert!(session.note_on(KeyId::H, 440.0, 0.0));
        let event = session.note_off(KeyId::H, 0.5).unwrap();
        assert_eq!(event, NoteEvent::new(440.0, 0.0, 0.5));
        assert_eq!(session.stop().unwrap(), vec![event]);
    }

    #[test]
    fn test_onsets_are_relative_to_start() {
        let mut session = RecordingSession::new();
        session.start(10.0).unwrap();
        session.note_on(KeyId::A, 261.63, 10.25);
        let event = session.note_off(KeyId::A, 11.0).unwrap();
        assert!((event.onset() - 0.25).abs() < 1e-9);
        assert!((event.duration() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_zero_length_note_gets_min_duration() {
        let mut session = RecordingSession::new();
        session.start(0.0).unwrap();
        session.note_on(KeyId::A, 261.63, 0.3);
        let event = session.note_off(KeyId::A, 0.3).unwrap();
        assert_eq!(event.duration(), MIN_NOTE_DURATION);
    }

    #[test]
    fn test_duplicate_onset_is_ignored() {
        let mut session = RecordingSession::new();
        session.start(0.0).unwrap();
        assert!(session.note_on(KeyId::A, 261.63, 0.1));
        assert!(!session.note_on(KeyId::A, 261.63, 0.2));
        assert_eq!(session.pending_count(), 1);
        let event = session.note_off(KeyId::A, 0.4).unwrap();
        assert!((event.onset() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_release_without_onset() {
        let mut session = RecordingSession::new();
        assert!(!session.note_on(KeyId::A, 261.63, 0.0)); // Idle
        session.start(1.0).unwrap();
        assert_eq!(session.note_off(KeyId::A, 1.5), None);
        assert_eq!(session.event_count(), 0);
    }

    #[test]
    fn test_held_notes_are_discarded_at_stop() {
        let mut session = RecordingSession::new();
        session.start(0.0).unwrap();
        session.note_on(KeyId::A, 261.63, 0.0);
        session.note_on(KeyId::S, 293.66, 0.1);
        session.note_off(KeyId::A, 0.5);
        let events = session.stop().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(session.pending_count(), 0);

        // A new session does not resurrect the held key
        session.start(1.0).unwrap();
        assert_eq!(session.note_off(KeyId::S, 1.2), None);
    }

    #[test]
    fn test_restart_clears_previous_events() {
        let mut session = RecordingSession::new();
        session.start(0.0).unwrap();
        session.note_on(KeyId::A, 261.63, 0.0);
        session.note_off(KeyId::A, 0.2);
        session.stop().unwrap();

        session.start(5.0).unwrap();
        assert_eq!(session.event_count(), 0);
        assert_eq!(session.stop().unwrap(), vec![]);
    }
}

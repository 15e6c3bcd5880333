//! Per-key press/release tracking.
//!
//! Terminals and operating systems repeat key-down events while a key is
//! held. The tracker ignores presses of keys that are already down, owns the
//! stop handle of each held tone, and forwards onsets and releases to the
//! recording session.

use super::recorder::RecordingSession;
use crate::audio::{InstrumentId, ToneHandle, ToneSource};
use crate::error::Result;
use crate::midi::KeyId;
use std::collections::HashMap;

/// Tracks which keys are down and the tones they hold.
///
/// Each key that is down maps to the stop handle of its tone. One-shot
/// instruments leave no handle.
#[derive(Debug)]
pub struct KeyTracker<H> {
    held: HashMap<KeyId, Option<H>>,
}

impl<H> Default for KeyTracker<H> {
    fn default() -> Self {
        Self {
            held: HashMap::new(),
        }
    }
}

impl<H: ToneHandle> KeyTracker<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a key going down.
    ///
    /// # Arguments
    ///
    /// * `key` - The key pressed
    /// * `instrument` - Instrument to sound
    /// * `frequency` - Pitch in Hz
    /// * `now` - Current clock time
    /// * `tones` - Where the tone is played
    /// * `session` - Receives the onset if armed
    ///
    /// # Returns
    ///
    /// true if the press was new; false if the key was already down
    ///
    /// # Errors
    ///
    /// Propagates tone source failures. The key is left up in that case.
    pub fn press<S>(
        &mut self,
        key: KeyId,
        instrument: &InstrumentId,
        frequency: f64,
        now: f64,
        tones: &mut S,
        session: &mut RecordingSession,
    ) -> Result<bool>
    where
        S: ToneSource<Handle = H>,
    {
        if self.held.contains_key(&key) {
            return Ok(false);
        }

        let tone = tones.play(instrument, frequency, now, None)?;
        self.held.insert(key, tone);
        session.note_on(key, frequency, now);
        Ok(true)
    }

    /// Handles a key going up.
    ///
    /// # Returns
    ///
    /// true if the key was down; false otherwise
    pub fn release(&mut self, key: KeyId, now: f64, session: &mut RecordingSession) -> bool {
        let Some(tone) = self.held.remove(&key) else {
            return false;
        };
        if let Some(tone) = tone {
            tone.stop(now);
        }
        session.note_off(key, now);
        true
    }

    /// Releases every key that is down.
    ///
    /// # Returns
    ///
    /// Number of keys released
    pub fn release_all(&mut self, now: f64, session: &mut RecordingSession) -> usize {
        let keys: Vec<KeyId> = self.held.keys().copied().collect();
        for key in &keys {
            self.release(*key, now, session);
        }
        keys.len()
    }

    pub fn is_pressed(&self, key: KeyId) -> bool {
        self.held.contains_key(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SynthError;
    use crate::sequencer::testing::{FakeHandle, FakeTones};

    fn setup() -> (KeyTracker<FakeHandle>, FakeTones, RecordingSession) {
        (KeyTracker::new(), FakeTones::new(), RecordingSession::new())
    }

    #[test]
    fn test_holdable_press_and_release() {
        let (mut keys, mut tones, mut session) = setup();
        let sine = InstrumentId::from("sine");

        assert!(keys
            .press(KeyId::H, &sine, 440.0, 1.0, &mut tones, &mut session)
            .unwrap());
        assert!(keys.is_pressed(KeyId::H));
        assert!(keys.held[&KeyId::H].is_some());
        assert_eq!(tones.calls.len(), 1);
        assert_eq!(tones.calls[0].duration, None);
        assert_eq!(tones.calls[0].start, 1.0);

        assert!(keys.release(KeyId::H, 1.5, &mut session));
        assert!(!keys.is_pressed(KeyId::H));
        assert_eq!(tones.stops(), vec![(0, 1.5)]);
    }

    #[test]
    fn test_repeat_press_is_ignored() {
        let (mut keys, mut tones, mut session) = setup();
        let sine = InstrumentId::from("sine");
        session.start(0.0).unwrap();

        keys.press(KeyId::A, &sine, 261.63, 0.0, &mut tones, &mut session)
            .unwrap();
        let again = keys
            .press(KeyId::A, &sine, 261.63, 0.2, &mut tones, &mut session)
            .unwrap();

        assert!(!again);
        assert_eq!(tones.calls.len(), 1);
        assert_eq!(session.pending_count(), 1);
        // The held tone is the first one
        keys.release(KeyId::A, 0.4, &mut session);
        assert_eq!(tones.stops(), vec![(0, 0.4)]);
        assert!((session.events()[0].duration() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_one_shot_keeps_no_handle() {
        let (mut keys, mut tones, mut session) = setup();
        let kick = InstrumentId::from("kick");

        keys.press(KeyId::A, &kick, 60.0, 0.0, &mut tones, &mut session)
            .unwrap();
        assert!(keys.is_pressed(KeyId::A));
        assert!(keys.held[&KeyId::A].is_none());

        // Repeat presses of a held drum key do not retrigger it
        keys.press(KeyId::A, &kick, 60.0, 0.1, &mut tones, &mut session)
            .unwrap();
        assert_eq!(tones.calls.len(), 1);

        assert!(keys.release(KeyId::A, 0.3, &mut session));
        assert!(tones.stops().is_empty());
    }

    #[test]
    fn test_release_of_unpressed_key() {
        let (mut keys, _tones, mut session) = setup();
        session.start(0.0).unwrap();
        assert!(!keys.release(KeyId::A, 0.5, &mut session));
        assert_eq!(session.event_count(), 0);
    }

    #[test]
    fn test_failed_press_leaves_key_up() {
        let (mut keys, mut tones, mut session) = setup();
        session.start(0.0).unwrap();
        let err = keys
            .press(
                KeyId::A,
                &InstrumentId::from("theremin"),
                261.63,
                0.0,
                &mut tones,
                &mut session,
            )
            .unwrap_err();
        assert_eq!(err, SynthError::UnknownInstrument("theremin".into()));
        assert!(!keys.is_pressed(KeyId::A));
        assert_eq!(session.pending_count(), 0);
    }

    #[test]
    fn test_records_while_armed() {
        let (mut keys, mut tones, mut session) = setup();
        let sine = InstrumentId::from("sine");
        session.start(2.0).unwrap();

        keys.press(KeyId::H, &sine, 440.0, 2.0, &mut tones, &mut session)
            .unwrap();
        keys.release(KeyId::H, 2.5, &mut session);

        assert_eq!(session.event_count(), 1);
        let event = session.events()[0];
        assert_eq!(event.frequency(), 440.0);
        assert_eq!(event.onset(), 0.0);
        assert_eq!(event.duration(), 0.5);
    }

    #[test]
    fn test_release_all() {
        let (mut keys, mut tones, mut session) = setup();
        let sine = InstrumentId::from("sine");
        keys.press(KeyId::S, &sine, 293.66, 0.0, &mut tones, &mut session)
            .unwrap();
        keys.press(KeyId::A, &sine, 261.63, 0.0, &mut tones, &mut session)
            .unwrap();
        assert!(keys.is_pressed(KeyId::A) && keys.is_pressed(KeyId::S));

        assert_eq!(keys.release_all(1.0, &mut session), 2);
        assert!(!keys.is_pressed(KeyId::A));
        assert!(!keys.is_pressed(KeyId::S));
        assert_eq!(tones.stops().len(), 2);
    }
}

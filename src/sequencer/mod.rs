//! Live keyboard, note recording and multi-track playback.
//!
//! [`Sequencer`] ties the pieces together:
//! - [`KeyTracker`] turns raw key events into tones and deduplicates repeats
//! - [`RecordingSession`] turns presses and releases into note events
//! - [`TrackStore`] keeps finished recordings
//! - [`play_track`] / [`play_all`] schedule recordings on the tone source
//!
//! All timing comes from one injected [`Clock`], which in the live program is
//! the audio mixer itself.

pub mod keys;
pub mod recorder;
pub mod scheduler;
#[cfg(test)]
mod testing;

pub use keys::KeyTracker;
pub use recorder::RecordingSession;
pub use scheduler::{play_all, play_track, PlaybackSummary};

use crate::audio::{InstrumentId, ToneSource};
use crate::clock::Clock;
use crate::error::Result;
use crate::midi::{KeyId, Track, TrackStore};

/// Default distance between "now" and the reference time of a replay.
pub const DEFAULT_LOOKAHEAD: f64 = 0.05;

/// The recording and playback core.
pub struct Sequencer<S: ToneSource, C: Clock> {
    tones: S,
    clock: C,
    keys: KeyTracker<S::Handle>,
    session: RecordingSession,
    tracks: TrackStore,
    instrument: InstrumentId,
    lookahead: f64,
}

impl<S: ToneSource, C: Clock> Sequencer<S, C> {
    /// Creates an idle sequencer with no tracks.
    ///
    /// # Arguments
    ///
    /// * `tones` - Where live and replayed notes are sounded
    /// * `clock` - Time base shared with `tones`
    /// * `instrument` - Initially selected instrument
    pub fn new(tones: S, clock: C, instrument: InstrumentId) -> Self {
        Self {
            tones,
            clock,
            keys: KeyTracker::new(),
            session: RecordingSession::new(),
            tracks: TrackStore::new(),
            instrument,
            lookahead: DEFAULT_LOOKAHEAD,
        }
    }

    /// Sets how far ahead of the clock `*_now` playback starts.
    pub fn with_lookahead(mut self, seconds: f64) -> Self {
        self.lookahead = seconds.max(0.0);
        self
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    // Live keyboard

    /// Presses `key`, sounding `frequency` on the selected instrument.
    ///
    /// # Returns
    ///
    /// false if the key was already down
    ///
    /// # Errors
    ///
    /// Returns `UnknownInstrument` if the selected instrument is not known to
    /// the tone source
    pub fn press(&mut self, key: KeyId, frequency: f64) -> Result<bool> {
        let now = self.clock.now();
        self.keys.press(
            key,
            &self.instrument,
            frequency,
            now,
            &mut self.tones,
            &mut self.session,
        )
    }

    /// Releases `key`. Returns false if it was not down.
    pub fn release(&mut self, key: KeyId) -> bool {
        let now = self.clock.now();
        self.keys.release(key, now, &mut self.session)
    }

    pub fn release_all(&mut self) -> usize {
        let now = self.clock.now();
        self.keys.release_all(now, &mut self.session)
    }

    pub fn keys(&self) -> &KeyTracker<S::Handle> {
        &self.keys
    }

    // Recording

    /// Arms a new recording starting now.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyArmed` if already recording
    pub fn start_recording(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.session.start(now)?;
        tracing::info!(start = now, "Recording started");
        Ok(())
    }

    /// Stops recording and stores the result as a new track.
    ///
    /// The track plays on the instrument selected at the moment of stopping.
    /// Keys still held are not part of it.
    ///
    /// # Returns
    ///
    /// Index of the new track
    ///
    /// # Errors
    ///
    /// Returns `NotArmed` if not recording
    pub fn stop_recording(&mut self) -> Result<usize> {
        let events = self.session.stop()?;
        let name = format!("Untitled{}", self.tracks.len());
        let count = events.len();
        let index = self
            .tracks
            .append(Track::new(name, events, self.instrument.clone()));
        tracing::info!(
            index,
            notes = count,
            instrument = %self.instrument,
            "Recording stopped"
        );
        Ok(index)
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_armed()
    }

    /// Seconds since recording started (0 when idle).
    pub fn recording_elapsed(&self) -> f64 {
        self.session.elapsed(self.clock.now())
    }

    // Instruments

    /// Selects the instrument for live keys and future recordings.
    ///
    /// Keys already held keep sounding on the old instrument.
    pub fn select_instrument(&mut self, instrument: InstrumentId) {
        tracing::debug!(instrument = %instrument, "Instrument selected");
        self.instrument = instrument;
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    // Tracks

    pub fn tracks(&self) -> &TrackStore {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Result<&Track> {
        self.tracks.get(index)
    }

    /// Flips the mute flag of a track and returns the new state.
    pub fn toggle_mute(&mut self, index: usize) -> Result<bool> {
        self.tracks.toggle_mute(index)
    }

    pub fn set_track_instrument(&mut self, index: usize, instrument: InstrumentId) -> Result<()> {
        self.tracks.set_instrument(index, instrument)
    }

    // Playback

    /// Schedules one track with onset 0 at `reference`.
    ///
    /// Plays regardless of the track's mute flag.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` for an unknown index
    pub fn play_track(&mut self, index: usize, reference: f64) -> Result<PlaybackSummary> {
        let track = self.tracks.get(index)?;
        Ok(play_track(track, &mut self.tones, reference))
    }

    /// Schedules every unmuted track with onset 0 at `reference`.
    pub fn play_all(&mut self, reference: f64) -> PlaybackSummary {
        play_all(&self.tracks, &mut self.tones, reference)
    }

    /// Reference time for a replay starting as soon as possible.
    pub fn reference_now(&self) -> f64 {
        self.clock.now() + self.lookahead
    }

    pub fn play_track_now(&mut self, index: usize) -> Result<PlaybackSummary> {
        let reference = self.reference_now();
        self.play_track(index, reference)
    }

    pub fn play_all_now(&mut self) -> PlaybackSummary {
        let reference = self.reference_now();
        self.play_all(reference)
    }

    // Accessors

    pub fn tones(&self) -> &S {
        &self.tones
    }

    pub fn tones_mut(&mut self) -> &mut S {
        &mut self.tones
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeTones;
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::SynthError;
    use crate::midi::NoteEvent;

    fn sequencer() -> Sequencer<FakeTones, ManualClock> {
        Sequencer::new(
            FakeTones::new(),
            ManualClock::new(0.0),
            InstrumentId::from("sine"),
        )
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_record_single_note_and_replay() {
        let mut seq = sequencer();
        seq.start_recording().unwrap();
        seq.press(KeyId::H, 440.0).unwrap();
        seq.clock().advance(0.5);
        seq.release(KeyId::H);
        let index = seq.stop_recording().unwrap();

        assert_eq!(index, 0);
        let track = seq.track(0).unwrap();
        assert_eq!(track.name, "Untitled0");
        assert_eq!(track.events(), &[NoteEvent::new(440.0, 0.0, 0.5)]);

        let summary = seq.play_all(10.0);
        assert_eq!(summary.scheduled, 1);
        let call = seq.tones().calls.last().unwrap();
        assert_eq!(call.instrument.as_str(), "sine");
        assert_eq!(call.frequency, 440.0);
        assert_eq!(call.start, 10.0);
        assert_eq!(call.duration, Some(0.5));
    }

    #[test]
    fn test_overlapping_notes() {
        let mut seq = sequencer();
        seq.start_recording().unwrap();
        seq.press(KeyId::H, 440.0).unwrap();
        seq.clock().advance(0.1);
        seq.press(KeyId::K, 523.25).unwrap();
        seq.clock().advance(0.5);
        seq.release(KeyId::H);
        seq.clock().advance(0.1);
        seq.release(KeyId::K);
        seq.stop_recording().unwrap();

        let events = seq.track(0).unwrap().events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].frequency(), 440.0);
        assert!(close(events[0].onset(), 0.0));
        assert!(close(events[0].duration(), 0.6));
        assert_eq!(events[1].frequency(), 523.25);
        assert!(close(events[1].onset(), 0.1));
        assert!(close(events[1].duration(), 0.6));
    }

    #[test]
    fn test_events_lie_within_recording() {
        let mut seq = sequencer();
        seq.clock().advance(3.0);
        seq.start_recording().unwrap();
        for (i, key) in [KeyId::A, KeyId::S, KeyId::D].into_iter().enumerate() {
            seq.clock().advance(0.2);
            seq.press(key, 200.0 + i as f64).unwrap();
            seq.clock().advance(0.1 * i as f64);
            seq.release(key);
        }
        let length = seq.recording_elapsed();
        seq.stop_recording().unwrap();

        for event in seq.track(0).unwrap().events() {
            assert!(event.duration() > 0.0);
            assert!(event.onset() >= 0.0);
            assert!(event.onset() <= length);
        }
    }

    #[test]
    fn test_held_key_excluded_from_track() {
        let mut seq = sequencer();
        seq.start_recording().unwrap();
        seq.press(KeyId::A, 261.63).unwrap();
        seq.press(KeyId::S, 293.66).unwrap();
        seq.clock().advance(0.3);
        seq.release(KeyId::A);
        seq.stop_recording().unwrap();
        seq.clock().advance(0.3);
        // Releasing after the stop does not change the stored track
        seq.release(KeyId::S);

        assert_eq!(seq.track(0).unwrap().event_count(), 1);
        assert_eq!(seq.track(0).unwrap().events()[0].frequency(), 261.63);
    }

    #[test]
    fn test_double_press_is_noop() {
        let mut seq = sequencer();
        seq.start_recording().unwrap();
        assert!(seq.press(KeyId::A, 261.63).unwrap());
        seq.clock().advance(0.1);
        assert!(!seq.press(KeyId::A, 261.63).unwrap());
        seq.clock().advance(0.1);
        seq.release(KeyId::A);
        seq.stop_recording().unwrap();

        assert_eq!(seq.tones().calls.len(), 1);
        let event = seq.track(0).unwrap().events()[0];
        assert!(close(event.onset(), 0.0));
        assert!(close(event.duration(), 0.2));
    }

    #[test]
    fn test_recording_state_errors() {
        let mut seq = sequencer();
        assert_eq!(seq.stop_recording(), Err(SynthError::NotArmed));
        seq.start_recording().unwrap();
        assert!(seq.is_recording());
        assert_eq!(seq.start_recording(), Err(SynthError::AlreadyArmed));
        seq.stop_recording().unwrap();
        assert_eq!(seq.stop_recording(), Err(SynthError::NotArmed));
        assert_eq!(seq.tracks().len(), 1);
    }

    #[test]
    fn test_instrument_snapshot_at_stop() {
        let mut seq = sequencer();
        seq.start_recording().unwrap();
        seq.press(KeyId::A, 261.63).unwrap();
        seq.release(KeyId::A);
        seq.select_instrument(InstrumentId::from("bass"));
        seq.stop_recording().unwrap();
        assert_eq!(seq.track(0).unwrap().instrument.as_str(), "bass");

        // Later selections don't follow into the track
        seq.select_instrument(InstrumentId::from("kick"));
        assert_eq!(seq.track(0).unwrap().instrument.as_str(), "bass");

        seq.set_track_instrument(0, InstrumentId::from("sine")).unwrap();
        seq.play_track(0, 1.0).unwrap();
        assert_eq!(seq.tones().calls.last().unwrap().instrument.as_str(), "sine");
    }

    #[test]
    fn test_muted_track_is_skipped_by_play_all() {
        let mut seq = sequencer();
        for key in [KeyId::A, KeyId::S] {
            seq.start_recording().unwrap();
            seq.press(key, key.frequency(0)).unwrap();
            seq.clock().advance(0.2);
            seq.release(key);
            seq.stop_recording().unwrap();
        }
        assert_eq!(seq.toggle_mute(0), Ok(true));
        let before = seq.tones().calls.len();

        let summary = seq.play_all(5.0);
        assert_eq!(summary.tracks, 1);
        let played: Vec<f64> = seq.tones().calls[before..]
            .iter()
            .map(|c| c.frequency)
            .collect();
        assert_eq!(played, vec![KeyId::S.frequency(0)]);

        // A muted track can still be played on its own
        assert_eq!(seq.play_track(0, 6.0).unwrap().scheduled, 1);
    }

    #[test]
    fn test_play_track_out_of_range() {
        let mut seq = sequencer();
        assert_eq!(
            seq.play_track(0, 0.0),
            Err(SynthError::IndexOutOfRange { index: 0, len: 0 })
        );
        assert!(seq.toggle_mute(2).is_err());
    }

    #[test]
    fn test_now_variants_use_lookahead() {
        let mut seq = sequencer().with_lookahead(0.25);
        seq.start_recording().unwrap();
        seq.press(KeyId::H, 440.0).unwrap();
        seq.clock().advance(0.5);
        seq.release(KeyId::H);
        seq.stop_recording().unwrap();

        seq.clock().advance(1.5);
        assert_eq!(seq.play_all_now().reference, 2.25);
        assert_eq!(seq.play_track_now(0).unwrap().reference, 2.25);

        let calls = &seq.tones().calls;
        assert_eq!(calls[calls.len() - 2].start, 2.25);
        assert_eq!(calls[calls.len() - 1].start, 2.25);
    }

    #[test]
    fn test_unknown_instrument_press() {
        let mut seq = sequencer();
        seq.select_instrument(InstrumentId::from("theremin"));
        assert_eq!(
            seq.press(KeyId::A, 261.63),
            Err(SynthError::UnknownInstrument("theremin".into()))
        );
        assert!(!seq.keys().is_pressed(KeyId::A));
    }

    #[test]
    fn test_release_all_finishes_notes() {
        let mut seq = sequencer();
        seq.start_recording().unwrap();
        seq.press(KeyId::A, 261.63).unwrap();
        seq.press(KeyId::D, 329.63).unwrap();
        seq.clock().advance(0.4);
        assert_eq!(seq.release_all(), 2);
        seq.stop_recording().unwrap();
        assert_eq!(seq.track(0).unwrap().event_count(), 2);
        assert_eq!(seq.tones().stops().len(), 2);
    }
}

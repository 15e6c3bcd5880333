//! Recorded tracks and the ordered track store.
//!
//! A track is one finished note recording together with the instrument it
//! plays on and whether it is muted. Tracks are addressed by their index in
//! the store, which equals their insertion order and never changes.

use super::note::NoteEvent;
use crate::audio::InstrumentId;
use crate::error::{Result, SynthError};

/// One recorded, replayable sequence of note events.
///
/// The events are fixed when the track is created. The instrument and mute
/// flag stay editable for the lifetime of the track.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Human-readable name for the track.
    pub name: String,

    /// Instrument used when the track is played back.
    pub instrument: InstrumentId,

    /// Whether this track is skipped by "play all".
    pub muted: bool,

    /// Recorded notes in the order their releases were observed.
    events: Vec<NoteEvent>,
}

impl Track {
    /// Creates an unmuted track.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name for the track
    /// * `events` - The recorded notes
    /// * `instrument` - Instrument snapshot taken when the recording stopped
    pub fn new(name: impl Into<String>, events: Vec<NoteEvent>, instrument: InstrumentId) -> Self {
        Self {
            name: name.into(),
            instrument,
            muted: false,
            events,
        }
    }

    /// Returns the recorded notes.
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    /// Returns the number of recorded notes.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Returns the length of the track in seconds (end of the last note).
    pub fn duration(&self) -> f64 {
        self.events
            .iter()
            .map(NoteEvent::end)
            .fold(0.0, f64::max)
    }
}

/// Ordered collection of recorded tracks.
#[derive(Debug, Clone, Default)]
pub struct TrackStore {
    tracks: Vec<Track>,
}

impl TrackStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a track to the end of the store.
    ///
    /// # Returns
    ///
    /// The index of the new track, equal to the number of tracks stored before it
    pub fn append(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    /// Flips the mute flag of a track.
    ///
    /// # Returns
    ///
    /// The new mute state
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if no track has this index
    pub fn toggle_mute(&mut self, index: usize) -> Result<bool> {
        let track = self.get_mut(index)?;
        track.muted = !track.muted;
        Ok(track.muted)
    }

    /// Sets the mute flag of a track.
    pub fn set_muted(&mut self, index: usize, muted: bool) -> Result<()> {
        self.get_mut(index)?.muted = muted;
        Ok(())
    }

    /// Changes the instrument a track plays on.
    ///
    /// Tones already scheduled from this track keep their old instrument.
    pub fn set_instrument(&mut self, index: usize, instrument: InstrumentId) -> Result<()> {
        self.get_mut(index)?.instrument = instrument;
        Ok(())
    }

    /// Returns a track by index.
    pub fn get(&self, index: usize) -> Result<&Track> {
        let len = self.tracks.len();
        self.tracks
            .get(index)
            .ok_or(SynthError::IndexOutOfRange { index, len })
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Track> {
        let len = self.tracks.len();
        self.tracks
            .get_mut(index)
            .ok_or(SynthError::IndexOutOfRange { index, len })
    }

    /// Iterates over `(index, track)` pairs in insertion order.
    ///
    /// The iterator borrows the store, so every call observes the current
    /// mute and instrument state.
    pub fn list(&self) -> impl Iterator<Item = (usize, &Track)> + Clone {
        self.tracks.iter().enumerate()
    }

    /// Iterates over the tracks that are not muted right now.
    pub fn unmuted(&self) -> impl Iterator<Item = (usize, &Track)> {
        self.list().filter(|(_, t)| !t.muted)
    }

    /// Returns the number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Returns true if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

//! Track playback.
//!
//! Replays recorded note events by handing every one of them to the tone
//! source up front, each at `reference + onset` for its recorded duration.
//! Nothing is cancelled once scheduled.

use crate::audio::ToneSource;
use crate::midi::{Track, TrackStore};

/// Outcome of scheduling one or more tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackSummary {
    /// Clock time that onset 0 was mapped to.
    pub reference: f64,
    /// Tracks that were played.
    pub tracks: usize,
    /// Events handed to the tone source.
    pub scheduled: usize,
    /// Events the tone source rejected.
    pub failed: usize,
}

impl PlaybackSummary {
    fn merge(&mut self, other: PlaybackSummary) {
        self.tracks += other.tracks;
        self.scheduled += other.scheduled;
        self.failed += other.failed;
    }
}

/// Schedules every event of `track` relative to `reference`.
///
/// A rejected event is logged and counted; the rest of the track still plays.
///
/// # Arguments
///
/// * `track` - The track to play
/// * `tones` - Where the notes are scheduled
/// * `reference` - Clock time that onset 0 maps to
pub fn play_track<S: ToneSource>(track: &Track, tones: &mut S, reference: f64) -> PlaybackSummary {
    let mut summary = PlaybackSummary {
        reference,
        tracks: 1,
        ..PlaybackSummary::default()
    };

    for event in track.events() {
        let start = reference + event.onset();
        match tones.play(
            &track.instrument,
            event.frequency(),
            start,
            Some(event.duration()),
        ) {
            Ok(_) => summary.scheduled += 1,
            Err(e) => {
                tracing::warn!(
                    track = %track.name,
                    instrument = %track.instrument,
                    frequency = event.frequency(),
                    start,
                    "Failed to schedule note: {}",
                    e
                );
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Schedules every unmuted track against one shared reference.
///
/// Using a single reference keeps tracks recorded separately in time with
/// each other.
pub fn play_all<S: ToneSource>(store: &TrackStore, tones: &mut S, reference: f64) -> PlaybackSummary {
    let mut summary = PlaybackSummary {
        reference,
        ..PlaybackSummary::default()
    };
    for (_, track) in store.unmuted() {
        summary.merge(play_track(track, tones, reference));
    }
    tracing::debug!(
        tracks = summary.tracks,
        scheduled = summary.scheduled,
        failed = summary.failed,
        reference,
        "Scheduled playback"
    );
    summary
}

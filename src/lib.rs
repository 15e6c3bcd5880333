//! keytracks - A terminal toy synth with a multi-track note recorder.
//!
//! This library provides the recording and playback core, the synthesized
//! instruments, and the terminal front end.

pub mod app;
pub mod audio;
pub mod clock;
pub mod config;
pub mod error;
pub mod midi;
pub mod sequencer;
pub mod ui;

// Re-export commonly used types
pub use audio::{AudioEngine, InstrumentBank, InstrumentId, ToneHandle, ToneSource, ToneMixer};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::SynthError;
pub use midi::{KeyId, NoteEvent, Track, TrackStore};
pub use sequencer::{play_all, play_track, PlaybackSummary, RecordingSession, Sequencer};

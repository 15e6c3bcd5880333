//! Tone generation and audio output.
//!
//! The sequencer never talks to the sound card directly. It asks a
//! [`ToneSource`] to play an instrument at a frequency, at a point on the
//! audio clock, for an optional duration. This module provides:
//! - The [`ToneSource`] / [`ToneHandle`] capability traits
//! - A registry of built-in instruments (kick, snare, bass, sine, triangle, square)
//! - A sample-clocked mixer that implements the capability
//! - Real-time output via rodio and WAV export via hound

pub mod engine;
pub mod export;
pub mod instrument;
pub mod mixer;
pub mod voice;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

pub use engine::AudioEngine;
pub use export::{export_tracks_to_wav, write_wav};
pub use instrument::{Instrument, InstrumentBank, ToneKind};
pub use mixer::{Mixer, ToneMixer, VoiceHandle, VoiceId};
pub use voice::{Timbre, Voice};

/// Name of a registered instrument, e.g. `"sine"` or `"kick"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(String);

impl InstrumentId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstrumentId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for InstrumentId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A sound that can be cut short.
pub trait ToneHandle {
    /// Stops the tone at clock time `at`, or immediately if `at` has passed.
    fn stop(&self, at: f64);
}

/// Something that can produce tones on the shared audio clock.
pub trait ToneSource {
    /// Handle returned for holdable tones.
    type Handle: ToneHandle;

    /// Starts a tone.
    ///
    /// # Arguments
    ///
    /// * `instrument` - Registered instrument to play
    /// * `frequency` - Pitch in Hz
    /// * `start` - Clock time in seconds; times in the past start immediately
    /// * `duration` - Seconds to sound, or `None` to hold until stopped.
    ///   One-shot instruments ignore it.
    ///
    /// # Returns
    ///
    /// A stop handle for holdable instruments, `None` for one-shots.
    ///
    /// # Errors
    ///
    /// Returns `UnknownInstrument` if `instrument` is not registered.
    fn play(
        &mut self,
        instrument: &InstrumentId,
        frequency: f64,
        start: f64,
        duration: Option<f64>,
    ) -> Result<Option<Self::Handle>>;
}

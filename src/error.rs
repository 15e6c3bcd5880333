//! Error types for the recording and playback core.
//!
//! Every variant is local and recoverable: the front end turns them into
//! status messages and carries on.

use crate::audio::InstrumentId;
use thiserror::Error;

/// Errors raised by the sequencer, track store and tone sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    /// A note recording was started while another one is armed.
    #[error("a note recording is already in progress")]
    AlreadyArmed,

    /// A note recording was stopped while none is armed.
    #[error("no note recording is in progress")]
    NotArmed,

    /// A track operation referenced a track that does not exist.
    #[error("track {index} does not exist ({len} tracks recorded)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A tone was requested for an instrument the tone source does not know.
    #[error("unknown instrument \"{0}\"")]
    UnknownInstrument(InstrumentId),

    /// The shared mixer could not be reached (its lock was poisoned).
    #[error("audio output is unavailable")]
    OutputUnavailable,
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, SynthError>;

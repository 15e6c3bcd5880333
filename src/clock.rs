//! Monotonic clocks measured in seconds.
//!
//! All timing in the core (recording onsets, note durations, playback
//! reference times) is expressed against a single [`Clock`]. The live audio
//! mixer is itself a clock, so recorded offsets and scheduled tones share
//! one time base.

use std::cell::Cell;
use std::time::Instant;

/// A monotonic time source in seconds.
pub trait Clock {
    /// Returns the current time in seconds. Never decreases.
    fn now(&self) -> f64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Wall clock anchored at construction time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to.
///
/// Used for offline rendering and for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    /// Creates a clock reading `start` seconds.
    pub fn new(start: f64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Jumps to `time`. Earlier times are ignored to stay monotonic.
    pub fn set(&self, time: f64) {
        if time > self.now.get() {
            self.now.set(time);
        }
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        self.set(self.now.get() + seconds.max(0.0));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

//! Test doubles for the sequencer.

use crate::audio::{InstrumentId, ToneHandle, ToneSource};
use crate::error::{Result, SynthError};
use std::cell::RefCell;
use std::rc::Rc;

/// One call to [`ToneSource::play`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlayCall {
    pub instrument: InstrumentId,
    pub frequency: f64,
    pub start: f64,
    pub duration: Option<f64>,
}

/// A tone source that records what it is asked to do.
///
/// Knows `kick` and `snare` as one-shots and `sine` and `bass` as holdable.
#[derive(Debug, Default)]
pub struct FakeTones {
    pub calls: Vec<PlayCall>,
    /// `(tone index, stop time)` for every handle stopped.
    pub stops: Rc<RefCell<Vec<(usize, f64)>>>,
    /// Frequencies whose tones fail, to exercise error paths.
    pub failing: Vec<f64>,
}

impl FakeTones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stops(&self) -> Vec<(usize, f64)> {
        self.stops.borrow().clone()
    }
}

#[derive(Debug)]
pub struct FakeHandle {
    index: usize,
    stops: Rc<RefCell<Vec<(usize, f64)>>>,
}

impl ToneHandle for FakeHandle {
    fn stop(&self, at: f64) {
        self.stops.borrow_mut().push((self.index, at));
    }
}

impl ToneSource for FakeTones {
    type Handle = FakeHandle;

    fn play(
        &mut self,
        instrument: &InstrumentId,
        frequency: f64,
        start: f64,
        duration: Option<f64>,
    ) -> Result<Option<FakeHandle>> {
        let holdable = match instrument.as_str() {
            "kick" | "snare" => false,
            "sine" | "bass" => true,
            _ => return Err(SynthError::UnknownInstrument(instrument.clone())),
        };
        if self.failing.contains(&frequency) {
            return Err(SynthError::OutputUnavailable);
        }

        let index = self.calls.len();
        self.calls.push(PlayCall {
            instrument: instrument.clone(),
            frequency,
            start,
            duration,
        });

        Ok(holdable.then(|| FakeHandle {
            index,
            stops: Rc::clone(&self.stops),
        }))
    }
}

//! Instrument registry.
//!
//! Instruments are looked up by name. The standard bank mirrors the toy
//! synth's selector: two percussive one-shots and four sustained waveforms.

use super::voice::Timbre;
use super::InstrumentId;
use crate::error::{Result, SynthError};

/// How an instrument responds to note length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneKind {
    /// Sounds until stopped or until its requested duration elapses.
    Holdable,
    /// Plays a fixed-length hit; durations and early stops are ignored.
    OneShot { length: f64 },
}

/// A named instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub id: InstrumentId,
    pub timbre: Timbre,
}

impl Instrument {
    pub fn new(id: impl Into<InstrumentId>, timbre: Timbre) -> Self {
        Self {
            id: id.into(),
            timbre,
        }
    }

    pub fn kind(&self) -> ToneKind {
        match self.timbre.one_shot_length() {
            Some(length) => ToneKind::OneShot { length },
            None => ToneKind::Holdable,
        }
    }
}

/// Ordered set of instruments, addressable by name.
#[derive(Debug, Clone, Default)]
pub struct InstrumentBank {
    instruments: Vec<Instrument>,
}

impl InstrumentBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the built-in bank: kick, snare, bass, sine, triangle, square.
    pub fn standard() -> Self {
        let mut bank = Self::new();
        bank.register(Instrument::new("kick", Timbre::Kick));
        bank.register(Instrument::new("snare", Timbre::Snare));
        bank.register(Instrument::new("bass", Timbre::Sawtooth));
        bank.register(Instrument::new("sine", Timbre::Sine));
        bank.register(Instrument::new("triangle", Timbre::Triangle));
        bank.register(Instrument::new("square", Timbre::Square));
        bank
    }

    /// Adds an instrument, replacing any instrument with the same name.
    pub fn register(&mut self, instrument: Instrument) {
        match self.instruments.iter_mut().find(|i| i.id == instrument.id) {
            Some(existing) => *existing = instrument,
            None => self.instruments.push(instrument),
        }
    }

    /// Looks up an instrument by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownInstrument` if nothing is registered under `id`.
    pub fn get(&self, id: &InstrumentId) -> Result<&Instrument> {
        self.instruments
            .iter()
            .find(|i| &i.id == id)
            .ok_or_else(|| SynthError::UnknownInstrument(id.clone()))
    }

    /// Steps `delta` places from `current` in registration order, wrapping.
    ///
    /// An unknown `current` starts from the first instrument.
    pub fn cycle(&self, current: &InstrumentId, delta: i32) -> Option<InstrumentId> {
        if self.instruments.is_empty() {
            return None;
        }
        let len = self.instruments.len() as i32;
        let pos = self
            .instruments
            .iter()
            .position(|i| &i.id == current)
            .map(|p| p as i32)
            .unwrap_or(0);
        let next = (pos + delta).rem_euclid(len) as usize;
        Some(self.instruments[next].id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_bank() {
        let bank = InstrumentBank::standard();
        let names: Vec<&str> = bank.instruments.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            names,
            vec!["kick", "snare", "bass", "sine", "triangle", "square"]
        );

        let kick = bank.get(&"kick".into()).unwrap();
        assert_eq!(kick.kind(), ToneKind::OneShot { length: 0.5 });
        assert_eq!(bank.get(&"bass".into()).unwrap().kind(), ToneKind::Holdable);
    }

    #[test]
    fn test_unknown_instrument() {
        let bank = InstrumentBank::standard();
        let err = bank.get(&"theremin".into()).unwrap_err();
        assert_eq!(err, SynthError::UnknownInstrument("theremin".into()));
    }

    #[test]
    fn test_register_replaces() {
        let mut bank = InstrumentBank::standard();
        bank.register(Instrument::new("bass", Timbre::Square));
        assert_eq!(bank.instruments.len(), 6);
        assert_eq!(bank.get(&"bass".into()).unwrap().timbre, Timbre::Square);
    }

    #[test]
    fn test_cycle_wraps() {
        let bank = InstrumentBank::standard();
        assert_eq!(bank.cycle(&"square".into(), 1), Some("kick".into()));
        assert_eq!(bank.cycle(&"kick".into(), -1), Some("square".into()));
        assert_eq!(bank.cycle(&"sine".into(), 2), Some("square".into()));
        assert_eq!(bank.cycle(&"nope".into(), 1), Some("snare".into()));
        assert_eq!(InstrumentBank::new().cycle(&"sine".into(), 1), None);
    }
}

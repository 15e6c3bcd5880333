//! Sample-clocked voice mixer.
//!
//! The mixer owns every scheduled voice and a running sample position. The
//! position is the audio clock: tones are placed at sample offsets computed
//! from clock seconds, and rendering advances the clock. The same mixer
//! drives the live output stream and offline WAV rendering.

use super::instrument::{InstrumentBank, ToneKind};
use super::voice::Voice;
use super::{InstrumentId, ToneHandle, ToneSource};
use crate::clock::Clock;
use crate::error::{Result, SynthError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Fade applied when a holdable voice is stopped, to avoid clicks.
const RELEASE_SECONDS: f64 = 0.005;

/// Identifier of a scheduled voice.
pub type VoiceId = u64;

/// A voice placed on the sample timeline.
struct ScheduledVoice {
    id: VoiceId,
    voice: Voice,
    /// First sample the voice sounds on.
    start: u64,
    /// Sample the release fade begins on, if known.
    stop: Option<u64>,
}

/// Mixes scheduled voices into a mono buffer.
pub struct Mixer {
    sample_rate: u32,
    master_gain: f32,
    /// Shared so the clock can be read without taking the mixer lock.
    position: Arc<AtomicU64>,
    next_id: VoiceId,
    voices: Vec<ScheduledVoice>,
    /// Rendered output collected while a capture is running.
    capture: Option<Vec<f32>>,
}

impl Mixer {
    /// Creates a silent mixer at sample position 0.
    pub fn new(sample_rate: u32, master_gain: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            master_gain,
            position: Arc::new(AtomicU64::new(0)),
            next_id: 1,
            voices: Vec::new(),
            capture: None,
        }
    }

    /// Number of samples rendered so far.
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }

    /// Converts clock seconds to a sample position, never earlier than now.
    pub fn sample_at(&self, seconds: f64) -> u64 {
        let sample = (seconds.max(0.0) * self.sample_rate as f64).round() as u64;
        sample.max(self.position())
    }

    /// Places a voice on the timeline.
    ///
    /// # Arguments
    ///
    /// * `voice` - The voice to sound
    /// * `start` - Clock time in seconds
    /// * `duration` - Seconds until the release fade, or `None` to run until
    ///   stopped (holdable) or finished (one-shot)
    pub fn schedule(&mut self, voice: Voice, start: f64, duration: Option<f64>) -> VoiceId {
        let id = self.next_id;
        self.next_id += 1;

        let start = self.sample_at(start);
        let stop = duration.map(|d| start + (d.max(0.0) * self.sample_rate as f64).round() as u64);
        self.voices.push(ScheduledVoice {
            id,
            voice,
            start,
            stop,
        });
        id
    }

    /// Begins the release of a voice at clock time `at` (or now, if earlier).
    ///
    /// An earlier stop already in place is kept. Unknown or finished voices
    /// are ignored.
    pub fn stop_voice(&mut self, id: VoiceId, at: f64) {
        let at = self.sample_at(at);
        if let Some(v) = self.voices.iter_mut().find(|v| v.id == id) {
            let at = at.max(v.start);
            v.stop = Some(v.stop.map_or(at, |s| s.min(at)));
        }
    }

    /// Number of voices still scheduled or sounding.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Renders the next `out.len()` samples and advances the clock.
    pub fn render(&mut self, out: &mut [f32]) {
        out.fill(0.0);

        let position = self.position();
        let sample_rate = self.sample_rate;
        let release_len = ((RELEASE_SECONDS * sample_rate as f64) as u64).max(1);

        self.voices.retain_mut(|v| {
            for (i, slot) in out.iter_mut().enumerate() {
                let pos = position + i as u64;
                if pos < v.start {
                    continue;
                }
                if v.voice.is_finished(sample_rate) {
                    return false;
                }
                let envelope = match v.stop {
                    Some(stop) if pos >= stop => {
                        let into_release = pos - stop;
                        if into_release >= release_len {
                            return false;
                        }
                        1.0 - into_release as f32 / release_len as f32
                    }
                    _ => 1.0,
                };
                *slot += v.voice.next_sample(sample_rate) * envelope;
            }
            true
        });

        for sample in out.iter_mut() {
            *sample *= self.master_gain;
        }

        if let Some(capture) = self.capture.as_mut() {
            capture.extend_from_slice(out);
        }

        self.position
            .store(position + out.len() as u64, Ordering::Release);
    }

    /// Starts collecting rendered output, discarding any previous capture.
    pub fn start_capture(&mut self) {
        self.capture = Some(Vec::new());
    }

    /// Stops collecting and returns what was captured.
    pub fn stop_capture(&mut self) -> Option<Vec<f32>> {
        self.capture.take()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }
}

/// Stop handle for a holdable voice.
#[derive(Clone)]
pub struct VoiceHandle {
    id: VoiceId,
    mixer: Arc<Mutex<Mixer>>,
}

impl ToneHandle for VoiceHandle {
    fn stop(&self, at: f64) {
        match self.mixer.lock() {
            Ok(mut mixer) => mixer.stop_voice(self.id, at),
            Err(_) => tracing::warn!(
                voice = self.id,
                at,
                "Failed to stop voice: mixer lock poisoned"
            ),
        }
    }
}

/// Shareable front to a [`Mixer`] that plays registered instruments.
///
/// Cloning is cheap; all clones feed the same mixer and read the same clock.
#[derive(Clone)]
pub struct ToneMixer {
    mixer: Arc<Mutex<Mixer>>,
    position: Arc<AtomicU64>,
    sample_rate: u32,
    bank: InstrumentBank,
}

impl ToneMixer {
    pub fn new(mixer: Mixer, bank: InstrumentBank) -> Self {
        let position = Arc::clone(&mixer.position);
        let sample_rate = mixer.sample_rate;
        Self {
            mixer: Arc::new(Mutex::new(mixer)),
            position,
            sample_rate,
            bank,
        }
    }

    /// The shared mixer, for wiring into an output stream.
    pub fn mixer(&self) -> &Arc<Mutex<Mixer>> {
        &self.mixer
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Renders directly into `out` (offline use).
    pub fn render(&self, out: &mut [f32]) -> Result<()> {
        let mut mixer = self.mixer.lock().map_err(|_| SynthError::OutputUnavailable)?;
        mixer.render(out);
        Ok(())
    }

    pub fn start_capture(&self) -> Result<()> {
        let mut mixer = self.mixer.lock().map_err(|_| SynthError::OutputUnavailable)?;
        mixer.start_capture();
        Ok(())
    }

    pub fn stop_capture(&self) -> Result<Option<Vec<f32>>> {
        let mut mixer = self.mixer.lock().map_err(|_| SynthError::OutputUnavailable)?;
        Ok(mixer.stop_capture())
    }

    pub fn is_capturing(&self) -> bool {
        self.mixer
            .lock()
            .map(|m| m.is_capturing())
            .unwrap_or(false)
    }
}

impl Clock for ToneMixer {
    fn now(&self) -> f64 {
        self.position.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }
}

impl ToneSource for ToneMixer {
    type Handle = VoiceHandle;

    fn play(
        &mut self,
        instrument: &InstrumentId,
        frequency: f64,
        start: f64,
        duration: Option<f64>,
    ) -> Result<Option<VoiceHandle>> {
        let instrument = self.bank.get(instrument)?;
        let kind = instrument.kind();
        let voice = Voice::new(instrument.timbre, frequency);

        let mut mixer = self.mixer.lock().map_err(|_| SynthError::OutputUnavailable)?;
        match kind {
            ToneKind::OneShot { .. } => {
                mixer.schedule(voice, start, None);
                Ok(None)
            }
            ToneKind::Holdable => {
                let id = mixer.schedule(voice, start, duration);
                Ok(Some(VoiceHandle {
                    id,
                    mixer: Arc::clone(&self.mixer),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::voice::Timbre;

    const SR: u32 = 1000;

    fn tones() -> ToneMixer {
        ToneMixer::new(Mixer::new(SR, 1.0), InstrumentBank::standard())
    }

    fn render(tones: &ToneMixer, samples: usize) -> Vec<f32> {
        let mut buf = vec![0.0; samples];
        tones.render(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_render_advances_clock() {
        let tones = tones();
        assert_eq!(tones.now(), 0.0);
        render(&tones, 500);
        assert!((tones.now() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_scheduled_tone_starts_on_time() {
        let mut tones = tones();
        tones
            .play(&"square".into(), 100.0, 0.25, Some(0.1))
            .unwrap();

        let out = render(&tones, 500);
        assert!(out[..250].iter().all(|&s| s == 0.0));
        assert!(out[250..350].iter().all(|&s| s.abs() == 1.0));
        // Release fade then silence
        assert!(out[360..].iter().all(|&s| s == 0.0));

        let mixer = tones.mixer().lock().unwrap();
        assert_eq!(mixer.voice_count(), 0);
    }

    #[test]
    fn test_past_start_plays_immediately() {
        let mut tones = tones();
        render(&tones, 100);
        tones.play(&"square".into(), 100.0, 0.0, Some(0.05)).unwrap();
        let out = render(&tones, 10);
        assert_eq!(out[0].abs(), 1.0);
    }

    #[test]
    fn test_holdable_returns_handle_that_stops() {
        let mut tones = tones();
        let handle = tones
            .play(&"square".into(), 100.0, 0.0, None)
            .unwrap()
            .expect("holdable tones return a handle");

        let out = render(&tones, 100);
        assert!(out.iter().all(|&s| s.abs() == 1.0));

        handle.stop(0.1);
        let out = render(&tones, 100);
        assert!(out[10..].iter().all(|&s| s == 0.0));
        assert_eq!(tones.mixer().lock().unwrap().voice_count(), 0);
    }

    #[test]
    fn test_one_shot_returns_no_handle() {
        let mut tones = tones();
        let handle = tones.play(&"kick".into(), 60.0, 0.0, Some(5.0)).unwrap();
        assert!(handle.is_none());

        // The kick ignores the requested duration and ends after its own length
        render(&tones, 600);
        assert_eq!(tones.mixer().lock().unwrap().voice_count(), 0);
    }

    #[test]
    fn test_unknown_instrument_is_rejected() {
        let mut tones = tones();
        let result = tones.play(&"theremin".into(), 440.0, 0.0, None);
        assert!(matches!(result, Err(SynthError::UnknownInstrument(_))));
        assert_eq!(tones.mixer().lock().unwrap().voice_count(), 0);
    }

    #[test]
    fn test_stop_keeps_earlier_stop() {
        let mut mixer = Mixer::new(SR, 1.0);
        let id = mixer.schedule(Voice::new(Timbre::Sine, 10.0), 0.0, Some(0.1));
        mixer.stop_voice(id, 0.5);
        mixer.stop_voice(999, 0.0);
        let mut buf = vec![0.0; 200];
        mixer.render(&mut buf);
        assert_eq!(mixer.voice_count(), 0);
    }

    #[test]
    fn test_stop_on_poisoned_mixer_does_not_panic() {
        let mut tones = tones();
        let handle = tones
            .play(&"square".into(), 100.0, 0.0, None)
            .unwrap()
            .expect("holdable tones return a handle");

        let mixer = Arc::clone(tones.mixer());
        let poisoner = std::thread::spawn(move || {
            let _guard = mixer.lock().unwrap();
            panic!("poison the mixer lock");
        });
        assert!(poisoner.join().is_err());
        assert!(tones.mixer().is_poisoned());

        handle.stop(0.1);
        let mut buf = [0.0f32; 10];
        assert!(tones.render(&mut buf).is_err());
    }

    #[test]
    fn test_capture() {
        let mut tones = tones();
        tones.start_capture().unwrap();
        assert!(tones.is_capturing());
        tones.play(&"square".into(), 100.0, 0.0, Some(0.05)).unwrap();
        render(&tones, 100);
        render(&tones, 100);
        let captured = tones.stop_capture().unwrap().unwrap();
        assert_eq!(captured.len(), 200);
        assert_eq!(captured[0].abs(), 1.0);
        assert!(!tones.is_capturing());
        assert_eq!(tones.stop_capture().unwrap(), None);
    }
}

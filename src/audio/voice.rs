//! Per-tone sample generation.
//!
//! Each [`Voice`] renders one sounding note. Holdable timbres run until the
//! mixer stops them; the percussive timbres shape themselves and finish after
//! a fixed length.

use std::f32::consts::PI;

/// Length of a kick drum hit in seconds.
pub const KICK_LENGTH: f64 = 0.5;

/// Length of a snare drum hit in seconds.
pub const SNARE_LENGTH: f64 = 0.2;

/// Sound shape of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timbre {
    /// Sine with an exponential pitch and gain drop.
    Kick,
    /// High-passed noise burst over a short triangle body.
    Snare,
    Sawtooth,
    Sine,
    Triangle,
    Square,
}

impl Timbre {
    /// Fixed length of percussive timbres, `None` for holdable ones.
    pub fn one_shot_length(self) -> Option<f64> {
        match self {
            Timbre::Kick => Some(KICK_LENGTH),
            Timbre::Snare => Some(SNARE_LENGTH),
            _ => None,
        }
    }
}

/// Evaluates a basic waveform at `phase` in `[0, 1)`.
fn waveform(timbre: Timbre, phase: f32) -> f32 {
    match timbre {
        Timbre::Sine | Timbre::Kick => (phase * 2.0 * PI).sin(),
        Timbre::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Timbre::Sawtooth => phase * 2.0 - 1.0,
        Timbre::Triangle | Timbre::Snare => 1.0 - 4.0 * (phase - 0.5).abs(),
    }
}

/// Exponential ramp from `from` to `to` over `length` seconds, held at `to` after.
fn exp_ramp(from: f32, to: f32, t: f32, length: f32) -> f32 {
    if t >= length {
        to
    } else {
        from * (to / from).powf(t / length)
    }
}

/// A single sounding note.
#[derive(Debug, Clone)]
pub struct Voice {
    timbre: Timbre,
    frequency: f32,
    phase: f32,
    /// Samples rendered so far.
    elapsed: u64,
    noise: fastrand::Rng,
    /// High-pass filter state for the snare noise (last input, last output).
    hp_state: (f32, f32),
}

impl Voice {
    pub fn new(timbre: Timbre, frequency: f64) -> Self {
        Self {
            timbre,
            frequency: frequency as f32,
            phase: 0.0,
            elapsed: 0,
            noise: fastrand::Rng::new(),
            hp_state: (0.0, 0.0),
        }
    }

    /// Whether a percussive voice has played out its full length.
    pub fn is_finished(&self, sample_rate: u32) -> bool {
        match self.timbre.one_shot_length() {
            Some(length) => self.elapsed as f64 >= length * sample_rate as f64,
            None => false,
        }
    }

    /// Renders the next sample and advances the voice.
    pub fn next_sample(&mut self, sample_rate: u32) -> f32 {
        if self.is_finished(sample_rate) {
            return 0.0;
        }

        let sr = sample_rate as f32;
        let t = self.elapsed as f32 / sr;

        let sample = match self.timbre {
            Timbre::Kick => {
                let length = KICK_LENGTH as f32;
                let freq = if self.frequency > 0.001 {
                    exp_ramp(self.frequency, 0.001, t, length)
                } else {
                    self.frequency
                };
                let gain = exp_ramp(2.0, 0.001, t, length);
                let s = waveform(Timbre::Sine, self.phase) * gain;
                self.advance_phase(freq, sr);
                s
            }
            Timbre::Snare => {
                let noise = self.noise.f32() * 2.0 - 1.0;
                let filtered = self.highpass(noise, sr);
                let noise_gain = exp_ramp(1.0, 0.01, t, SNARE_LENGTH as f32);
                let body_gain = exp_ramp(0.7, 0.01, t, 0.1);
                let body = waveform(Timbre::Triangle, self.phase) * body_gain;
                self.advance_phase(self.frequency, sr);
                filtered * noise_gain + body
            }
            timbre => {
                let s = waveform(timbre, self.phase);
                self.advance_phase(self.frequency, sr);
                s
            }
        };

        self.elapsed += 1;
        sample
    }

    fn advance_phase(&mut self, frequency: f32, sample_rate: f32) {
        self.phase += frequency / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
    }

    /// One-pole high-pass with its cutoff at the voice frequency.
    fn highpass(&mut self, input: f32, sample_rate: f32) -> f32 {
        let cutoff = self.frequency.max(1.0);
        let rc = 1.0 / (2.0 * PI * cutoff);
        let dt = 1.0 / sample_rate;
        let alpha = rc / (rc + dt);
        let (prev_in, prev_out) = self.hp_state;
        let out = alpha * (prev_out + input - prev_in);
        self.hp_state = (input, out);
        out
    }
}

//! Real-time audio output.
//!
//! Feeds the shared [`Mixer`] into the default output device through rodio.
//! The output stream pulls samples continuously, so the mixer's sample
//! position doubles as the audio clock for scheduling.

use super::instrument::InstrumentBank;
use super::mixer::{Mixer, ToneMixer};
use crate::config::Config;
use anyhow::{Context, Result};
use rodio::{OutputStream, OutputStreamHandle, Source};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Audio buffer size for low-latency playback.
/// Smaller = lower latency but higher CPU usage.
const BUFFER_SIZE: usize = 256;

/// Audio source that renders the mixer block by block.
/// Implements rodio's Source trait for playback.
struct MixerSource {
    mixer: Arc<Mutex<Mixer>>,
    buf: Vec<f32>,
    /// Current position in the buffer.
    buf_pos: usize,
    sample_rate: u32,
}

impl MixerSource {
    fn new(mixer: Arc<Mutex<Mixer>>, sample_rate: u32) -> Self {
        Self {
            mixer,
            buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
            sample_rate,
        }
    }
}

impl Iterator for MixerSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= BUFFER_SIZE {
            if let Ok(mut mixer) = self.mixer.lock() {
                mixer.render(&mut self.buf);
            } else {
                // Only fill with silence if we can't get the lock
                self.buf.fill(0.0);
            }
            self.buf_pos = 0;
        }

        let sample = self.buf[self.buf_pos];
        self.buf_pos += 1;
        Some(sample)
    }
}

impl Source for MixerSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// Live audio engine: an output stream bound to a [`ToneMixer`].
pub struct AudioEngine {
    tones: ToneMixer,
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    /// Audio output handle for playback.
    _stream_handle: OutputStreamHandle,
}

impl AudioEngine {
    /// Opens the default output device and starts rendering.
    ///
    /// # Arguments
    ///
    /// * `config` - Sample rate and master gain
    /// * `bank` - Instruments the engine can play
    ///
    /// # Errors
    ///
    /// Returns error if no output device can be opened
    pub fn new(config: &Config, bank: InstrumentBank) -> Result<Self> {
        let mixer = Mixer::new(config.sample_rate, config.master_gain);
        let tones = ToneMixer::new(mixer, bank);

        let (stream, stream_handle) =
            OutputStream::try_default().context("Failed to open audio output")?;

        let source = MixerSource::new(Arc::clone(tones.mixer()), config.sample_rate);
        stream_handle
            .play_raw(source)
            .context("Failed to start audio playback")?;

        tracing::info!(
            sample_rate = config.sample_rate,
            master_gain = config.master_gain,
            "Audio output started"
        );

        Ok(Self {
            tones,
            _stream: stream,
            _stream_handle: stream_handle,
        })
    }

    /// Returns a tone source feeding this engine. Also usable as its clock.
    pub fn tones(&self) -> ToneMixer {
        self.tones.clone()
    }

    /// Starts recording the live mix.
    pub fn start_capture(&self) -> Result<()> {
        self.tones
            .start_capture()
            .context("Failed to start capturing the mix")
    }

    /// Stops recording the live mix and returns the captured samples.
    pub fn stop_capture(&self) -> Result<Vec<f32>> {
        let samples = self
            .tones
            .stop_capture()
            .context("Failed to stop capturing the mix")?;
        Ok(samples.unwrap_or_default())
    }

    pub fn is_capturing(&self) -> bool {
        self.tones.is_capturing()
    }

    pub fn sample_rate(&self) -> u32 {
        self.tones.sample_rate()
    }
}

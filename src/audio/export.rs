//! WAV export.
//!
//! Writes captured live audio to disk, and bounces recorded tracks offline by
//! replaying them through a private mixer that renders as fast as possible.

use super::instrument::InstrumentBank;
use super::mixer::{Mixer, ToneMixer};
use crate::config::Config;
use crate::midi::TrackStore;
use crate::sequencer::{play_all, PlaybackSummary};
use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Buffer size for rendering chunks.
/// Larger buffers are more efficient but use more memory.
const RENDER_BUFFER_SIZE: usize = 4096;

/// Silence kept after the last note so releases and drum tails ring out.
const TAIL_SECONDS: f64 = 1.0;

fn wav_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Converts f32 (-1.0 to 1.0) to i16.
fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// Writes mono samples to a 16-bit WAV file.
///
/// # Arguments
///
/// * `samples` - Mono samples in -1.0..=1.0
/// * `sample_rate` - Sample rate of `samples`
/// * `output_path` - Path for the output WAV file
///
/// # Errors
///
/// Returns error if the file cannot be created or written
pub fn write_wav<P: AsRef<Path>>(samples: &[f32], sample_rate: u32, output_path: P) -> Result<()> {
    let mut writer =
        WavWriter::create(output_path.as_ref(), wav_spec(sample_rate)).with_context(|| {
            format!(
                "Failed to create output WAV file: {}",
                output_path.as_ref().display()
            )
        })?;

    for &sample in samples {
        writer.write_sample(to_i16(sample))?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Renders every unmuted track to a WAV file.
///
/// Tracks are played from a common zero point, exactly as "play all" would
/// schedule them, with each track's current instrument.
///
/// # Arguments
///
/// * `tracks` - The recorded tracks
/// * `bank` - Instruments available to the tracks
/// * `config` - Sample rate and master gain
/// * `output_path` - Path for the output WAV file
/// * `progress_callback` - Optional callback for progress updates (0.0 to 1.0)
///
/// # Returns
///
/// What was scheduled, including events that failed (e.g. unknown instrument)
///
/// # Errors
///
/// Returns error if the output file cannot be created or written
pub fn export_tracks_to_wav<P, F>(
    tracks: &TrackStore,
    bank: &InstrumentBank,
    config: &Config,
    output_path: P,
    mut progress_callback: Option<F>,
) -> Result<PlaybackSummary>
where
    P: AsRef<Path>,
    F: FnMut(f32),
{
    let mut tones = ToneMixer::new(
        Mixer::new(config.sample_rate, config.master_gain),
        bank.clone(),
    );
    let summary = play_all(tracks, &mut tones, 0.0);

    let duration_seconds = tracks
        .unmuted()
        .map(|(_, t)| t.duration())
        .fold(0.0, f64::max)
        + TAIL_SECONDS;
    let total_samples = (duration_seconds * config.sample_rate as f64) as usize;

    let mut writer = WavWriter::create(output_path.as_ref(), wav_spec(config.sample_rate))
        .with_context(|| {
            format!(
                "Failed to create output WAV file: {}",
                output_path.as_ref().display()
            )
        })?;

    let mut buf = vec![0.0f32; RENDER_BUFFER_SIZE];
    let mut current_sample = 0usize;

    while current_sample < total_samples {
        let samples_to_render = (total_samples - current_sample).min(RENDER_BUFFER_SIZE);
        tones
            .render(&mut buf[..samples_to_render])
            .context("Failed to render tracks")?;

        for &sample in &buf[..samples_to_render] {
            writer.write_sample(to_i16(sample))?;
        }

        current_sample += samples_to_render;

        if let Some(ref mut callback) = progress_callback {
            callback(current_sample as f32 / total_samples as f32);
        }
    }

    writer.finalize().context("Failed to finalize WAV file")?;

    tracing::info!(
        path = %output_path.as_ref().display(),
        tracks = summary.tracks,
        notes = summary.scheduled,
        "Exported tracks to WAV"
    );

    Ok(summary)
}

//! Application state and event handling.
//!
//! This module defines the main application state that coordinates
//! between the sequencer, the audio engine, and the TUI interface.

use crate::audio::{
    export_tracks_to_wav, write_wav, AudioEngine, InstrumentBank, InstrumentId, ToneKind,
    ToneMixer, ToneSource,
};
use crate::config::Config;
use crate::error::Result as SynthResult;
use crate::midi::{frequency_to_note, KeyId, Track};
use crate::sequencer::{PlaybackSummary, Sequencer};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Lowest and highest octave shift reachable from the keyboard.
pub const OCTAVE_RANGE: (i8, i8) = (-3, 3);

/// How long status messages stay visible.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// A note handed to the tone source with a known end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledNote {
    pub frequency: f64,
    pub start: f64,
    pub end: f64,
}

/// Tone source wrapper that remembers timed notes for visual feedback.
///
/// Glow is derived from scheduled start and end times on the audio clock, so
/// a slow redraw can delay it but never desynchronize it. One-shot notes glow
/// for the instrument's own length, not the held length.
#[derive(Debug)]
pub struct Highlighter<S> {
    inner: S,
    bank: InstrumentBank,
    scheduled: Vec<ScheduledNote>,
}

impl<S> Highlighter<S> {
    pub fn new(inner: S, bank: InstrumentBank) -> Self {
        Self {
            inner,
            bank,
            scheduled: Vec::new(),
        }
    }

    /// Whether a scheduled note with this frequency sounds at `now`.
    pub fn is_lit(&self, frequency: f64, now: f64) -> bool {
        let Some(note) = frequency_to_note(frequency) else {
            return false;
        };
        self.scheduled
            .iter()
            .any(|s| s.start <= now && now < s.end && frequency_to_note(s.frequency) == Some(note))
    }

    /// Forgets notes that ended before `now`.
    pub fn prune(&mut self, now: f64) {
        self.scheduled.retain(|s| s.end > now);
    }
}

impl<S: ToneSource> ToneSource for Highlighter<S> {
    type Handle = S::Handle;

    fn play(
        &mut self,
        instrument: &InstrumentId,
        frequency: f64,
        start: f64,
        duration: Option<f64>,
    ) -> SynthResult<Option<S::Handle>> {
        let handle = self.inner.play(instrument, frequency, start, duration)?;
        if let Some(mut duration) = duration {
            if let Ok(ToneKind::OneShot { length }) =
                self.bank.get(instrument).map(|i| i.kind())
            {
                duration = duration.min(length);
            }
            self.scheduled.push(ScheduledNote {
                frequency,
                start,
                end: start + duration,
            });
        }
        Ok(handle)
    }
}

/// Release deadlines for terminals that only report key presses.
///
/// Each press (including the terminal's own key repeat) pushes the deadline
/// out; a key whose deadline passes counts as released.
#[derive(Debug, Clone)]
pub struct AutoRelease {
    hold: Duration,
    deadlines: HashMap<KeyId, Instant>,
}

impl AutoRelease {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            deadlines: HashMap::new(),
        }
    }

    /// Starts or refreshes the hold of `key`.
    pub fn touch(&mut self, key: KeyId, now: Instant) {
        self.deadlines.insert(key, now + self.hold);
    }

    pub fn clear(&mut self, key: KeyId) {
        self.deadlines.remove(&key);
    }

    /// Removes and returns keys whose hold ran out by `now`.
    pub fn expired(&mut self, now: Instant) -> Vec<KeyId> {
        let mut keys: Vec<KeyId> = self
            .deadlines
            .iter()
            .filter(|(_, &deadline)| deadline <= now)
            .map(|(&key, _)| key)
            .collect();
        keys.sort();
        for key in &keys {
            self.deadlines.remove(key);
        }
        keys
    }
}

/// The live sequencer: glow-tracking tone source on the mixer's own clock.
pub type LiveSequencer = Sequencer<Highlighter<ToneMixer>, ToneMixer>;

/// Main application state.
pub struct App {
    /// Recording and playback core.
    pub sequencer: LiveSequencer,
    /// The audio engine for live output and mix capture.
    pub audio: AudioEngine,
    /// Instruments offered by the selectors.
    pub bank: InstrumentBank,
    /// Settings the app was started with.
    pub config: Config,
    /// Octave offset for keyboard input.
    pub octave_offset: i8,
    /// Index of the selected track in the track list.
    pub selected_track_index: usize,
    /// Status message to display.
    pub status_message: Option<(String, Instant)>,
    /// Whether the terminal reports key releases.
    release_events: bool,
    /// Fallback releases when it doesn't.
    auto_release: AutoRelease,
    /// Clock time until which each track has notes scheduled.
    playing_until: HashMap<usize, f64>,
    /// Number of mix captures written so far.
    captures: usize,
    /// Number of track bounces written so far.
    bounces: usize,
}

impl App {
    /// Creates a new application and opens the audio output.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated runtime configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configured instrument is unknown or the audio
    /// engine cannot be initialized
    pub fn new(config: Config) -> Result<Self> {
        let bank = InstrumentBank::standard();
        let instrument = InstrumentId::new(config.instrument.clone());
        bank.get(&instrument)
            .with_context(|| format!("Cannot start with instrument \"{}\"", instrument))?;

        let audio = AudioEngine::new(&config, bank.clone())?;
        let sequencer = Sequencer::new(
            Highlighter::new(audio.tones(), bank.clone()),
            audio.tones(),
            instrument,
        )
        .with_lookahead(config.lookahead_secs);
        let auto_release = AutoRelease::new(Duration::from_secs_f64(config.fallback_hold_secs));

        Ok(Self {
            sequencer,
            audio,
            bank,
            config,
            octave_offset: 0,
            selected_track_index: 0,
            status_message: None,
            release_events: false,
            auto_release,
            playing_until: HashMap::new(),
            captures: 0,
            bounces: 0,
        })
    }

    /// Tells the app whether key release events will arrive.
    pub fn set_release_events(&mut self, enabled: bool) {
        self.release_events = enabled;
        tracing::info!(enabled, "Key release reporting");
    }

    pub fn release_events(&self) -> bool {
        self.release_events
    }

    /// Sets a status message to display temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    /// Per-frame housekeeping: fallback releases and glow bookkeeping.
    pub fn update(&mut self) {
        self.clear_expired_status();

        if !self.release_events {
            for key in self.auto_release.expired(Instant::now()) {
                self.sequencer.release(key);
            }
        }

        let now = self.sequencer.now();
        self.sequencer.tones_mut().prune(now);
        self.playing_until.retain(|_, until| *until > now);
    }

    // ==================== Live keyboard ====================

    /// Handles a character typed on the note rows.
    ///
    /// # Arguments
    ///
    /// * `c` - The character key pressed
    ///
    /// # Returns
    ///
    /// true if the key is a note key
    pub fn handle_note_press(&mut self, c: char) -> bool {
        let Some(key) = KeyId::from_char(c) else {
            return false;
        };

        if !self.release_events {
            self.auto_release.touch(key, Instant::now());
        }

        let frequency = key.frequency(self.octave_offset);
        if let Err(e) = self.sequencer.press(key, frequency) {
            self.auto_release.clear(key);
            self.set_status(format!("Cannot play note: {}", e));
        }
        true
    }

    /// Handles a key release reported by the terminal.
    pub fn handle_note_release(&mut self, c: char) {
        if let Some(key) = KeyId::from_char(c) {
            self.auto_release.clear(key);
            self.sequencer.release(key);
        }
    }

    /// Whether `key` should glow: held down, or sounding from a replay.
    pub fn is_key_lit(&self, key: KeyId) -> bool {
        if self.sequencer.keys().is_pressed(key) {
            return true;
        }
        let now = self.sequencer.now();
        self.sequencer
            .tones()
            .is_lit(key.frequency(self.octave_offset), now)
    }

    pub fn change_octave(&mut self, delta: i8) {
        let (low, high) = OCTAVE_RANGE;
        let octave = (self.octave_offset + delta).clamp(low, high);
        if octave != self.octave_offset {
            self.octave_offset = octave;
            self.set_status(format!("Octave {:+}", octave));
        }
    }

    // ==================== Recording ====================

    /// Starts a recording, or stops the current one and stores it as a track.
    pub fn toggle_recording(&mut self) {
        if self.sequencer.is_recording() {
            match self.sequencer.stop_recording() {
                Ok(index) => {
                    self.selected_track_index = index;
                    if let Ok(track) = self.sequencer.track(index) {
                        let message = format!(
                            "Saved {} ({} notes, {})",
                            track.name,
                            track.event_count(),
                            track.instrument
                        );
                        self.set_status(message);
                    }
                }
                Err(e) => self.set_status(format!("Stop failed: {}", e)),
            }
        } else {
            match self.sequencer.start_recording() {
                Ok(()) => self.set_status("Recording..."),
                Err(e) => self.set_status(format!("Record failed: {}", e)),
            }
        }
    }

    // ==================== Playback ====================

    /// Plays every unmuted track from now.
    pub fn play_all(&mut self) {
        if self.sequencer.tracks().is_empty() {
            self.set_status("Nothing recorded yet");
            return;
        }
        let summary = self.sequencer.play_all_now();
        let playing: Vec<(usize, f64)> = self
            .sequencer
            .tracks()
            .unmuted()
            .map(|(i, t)| (i, summary.reference + t.duration()))
            .collect();
        self.playing_until.extend(playing);
        self.report_playback("Playing all", summary);
    }

    /// Plays the selected track from now, muted or not.
    pub fn play_selected(&mut self) {
        let index = self.selected_track_index;
        match self.sequencer.play_track_now(index) {
            Ok(summary) => {
                if let Ok(track) = self.sequencer.track(index) {
                    self.playing_until
                        .insert(index, summary.reference + track.duration());
                    let label = format!("Playing {}", track.name);
                    self.report_playback(&label, summary);
                }
            }
            Err(e) => self.set_status(format!("Play failed: {}", e)),
        }
    }

    fn report_playback(&mut self, label: &str, summary: PlaybackSummary) {
        let message = if summary.failed > 0 {
            format!(
                "{}: {} tracks, {} notes ({} failed)",
                label, summary.tracks, summary.scheduled, summary.failed
            )
        } else {
            format!(
                "{}: {} tracks, {} notes",
                label, summary.tracks, summary.scheduled
            )
        };
        self.set_status(message);
    }

    /// Whether `index` has replayed notes still to come.
    pub fn is_track_playing(&self, index: usize) -> bool {
        let now = self.sequencer.now();
        self.playing_until
            .get(&index)
            .is_some_and(|until| *until > now)
    }

    // ==================== Tracks ====================

    pub fn selected_track(&self) -> Option<&Track> {
        self.sequencer.track(self.selected_track_index).ok()
    }

    pub fn select_previous_track(&mut self) {
        self.selected_track_index = self.selected_track_index.saturating_sub(1);
    }

    pub fn select_next_track(&mut self) {
        let len = self.sequencer.tracks().len();
        if self.selected_track_index + 1 < len {
            self.selected_track_index += 1;
        }
    }

    pub fn toggle_mute_selected(&mut self) {
        let index = self.selected_track_index;
        match self.sequencer.toggle_mute(index) {
            Ok(muted) => {
                let state = if muted { "muted" } else { "unmuted" };
                self.set_status(format!("Untitled{} {}", index, state));
            }
            Err(e) => self.set_status(format!("Mute failed: {}", e)),
        }
    }

    /// Steps the selected track's instrument through the bank.
    pub fn cycle_track_instrument(&mut self, delta: i32) {
        let index = self.selected_track_index;
        let Some(current) = self.selected_track().map(|t| t.instrument.clone()) else {
            self.set_status("No track selected");
            return;
        };
        let Some(next) = self.bank.cycle(&current, delta) else {
            return;
        };
        match self.sequencer.set_track_instrument(index, next.clone()) {
            Ok(()) => self.set_status(format!("Untitled{}: {}", index, next)),
            Err(e) => self.set_status(format!("Instrument change failed: {}", e)),
        }
    }

    /// Steps the live instrument through the bank.
    pub fn cycle_instrument(&mut self, delta: i32) {
        let current = self.sequencer.instrument().clone();
        if let Some(next) = self.bank.cycle(&current, delta) {
            self.set_status(format!("Instrument: {}", next));
            self.sequencer.select_instrument(next);
        }
    }

    // ==================== Output files ====================

    /// Starts capturing the live mix, or stops and writes it to a WAV file.
    pub fn toggle_capture(&mut self) {
        if !self.audio.is_capturing() {
            match self.audio.start_capture() {
                Ok(()) => self.set_status("Capturing mix..."),
                Err(e) => self.set_status(format!("Capture failed: {}", e)),
            }
            return;
        }

        match self.finish_capture() {
            Ok(path) => self.set_status(format!("Saved mix: {}", path.display())),
            Err(e) => self.set_status(format!("Capture failed: {:#}", e)),
        }
    }

    fn finish_capture(&mut self) -> Result<PathBuf> {
        let samples = self.audio.stop_capture()?;
        let path = self
            .config
            .output_dir
            .join(format!("recording-{}.wav", self.captures));
        write_wav(&samples, self.audio.sample_rate(), &path)?;
        self.captures += 1;
        tracing::info!(path = %path.display(), samples = samples.len(), "Mix capture saved");
        Ok(path)
    }

    /// Renders all unmuted tracks offline to a WAV file.
    pub fn bounce(&mut self) {
        if self.sequencer.tracks().is_empty() {
            self.set_status("Nothing recorded yet");
            return;
        }
        let path = self
            .config
            .output_dir
            .join(format!("bounce-{}.wav", self.bounces));
        let result = export_tracks_to_wav(
            self.sequencer.tracks(),
            &self.bank,
            &self.config,
            &path,
            None::<fn(f32)>,
        );
        match result {
            Ok(summary) => {
                self.bounces += 1;
                self.set_status(format!(
                    "Bounced {} tracks to {}",
                    summary.tracks,
                    path.display()
                ));
            }
            Err(e) => self.set_status(format!("Bounce failed: {:#}", e)),
        }
    }

    /// Releases held keys and saves an unfinished capture before exit.
    pub fn shutdown(&mut self) {
        self.sequencer.release_all();
        if self.audio.is_capturing() {
            if let Err(e) = self.finish_capture() {
                tracing::warn!("Failed to save capture on exit: {:#}", e);
            }
        }
    }
}

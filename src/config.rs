//! Runtime configuration.
//!
//! Every field has a default, so a config file only needs the keys it wants
//! to change:
//!
//! ```json
//! { "instrument": "bass", "lookahead_secs": 0.1 }
//! ```

use crate::sequencer::DEFAULT_LOOKAHEAD;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for the audio engine, sequencer and terminal front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output sample rate in Hz.
    pub sample_rate: u32,

    /// Gain applied to the whole mix (0.0 to 1.0).
    pub master_gain: f32,

    /// How far ahead of "now" playback is scheduled, in seconds.
    pub lookahead_secs: f64,

    /// Instrument selected at startup.
    pub instrument: String,

    /// How long a key counts as held when the terminal cannot report key
    /// releases. Refreshed by the terminal's key repeat.
    pub fallback_hold_secs: f64,

    /// Directory that captured mixes and bounces are written to.
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            master_gain: 0.15,
            lookahead_secs: DEFAULT_LOOKAHEAD,
            instrument: "sine".to_string(),
            fallback_hold_secs: 0.3,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Parses a config from JSON.
    ///
    /// # Errors
    ///
    /// Returns error if parsing fails
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the config to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Loads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed, or holds invalid values
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = Self::from_json(&json)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.sample_rate > 0, "sample_rate must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.master_gain),
            "master_gain must be between 0.0 and 1.0, got {}",
            self.master_gain
        );
        ensure!(
            self.lookahead_secs >= 0.0,
            "lookahead_secs must not be negative, got {}",
            self.lookahead_secs
        );
        ensure!(
            self.fallback_hold_secs > 0.0,
            "fallback_hold_secs must be positive, got {}",
            self.fallback_hold_secs
        );
        ensure!(!self.instrument.is_empty(), "instrument must not be empty");
        Ok(())
    }
}

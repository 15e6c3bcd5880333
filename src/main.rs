//! keytracks - A terminal toy synth with a multi-track note recorder.
//!
//! Play the home row like a piano, record what you play into tracks, and
//! replay any combination of them over each other.
//!
//! # Features
//!
//! - Live playing on sine, triangle, square, bass, kick and snare voices
//! - Unlimited recorded tracks with per-track mute and instrument
//! - Sample-accurate replay of all tracks against one shared audio clock
//! - Live mix capture and offline track bounce to WAV
//!
//! # Usage
//!
//! ```bash
//! cargo run                          # Start with defaults
//! cargo run -- --instrument bass     # Start on the bass voice
//! cargo run -- --config synth.json   # Load settings from a JSON file
//! ```

use keytracks::app::App;
use keytracks::config::Config;
use keytracks::ui;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line options for the application.
struct CliOptions {
    /// JSON config file to load.
    config: Option<PathBuf>,
    /// Instrument to start with, overriding the config.
    instrument: Option<String>,
    /// Directory for WAV output, overriding the config.
    output_dir: Option<PathBuf>,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--config <path>` or `-c <path>`: Load settings from a JSON file
    /// - `--instrument <name>` or `-i <name>`: Start on this instrument
    /// - `--output-dir <dir>` or `-o <dir>`: Where WAV files are written
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = Self {
            config: None,
            instrument: None,
            output_dir: None,
        };
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    options.config = Some(PathBuf::from(Self::value(&args, &mut i)?));
                }
                "--instrument" | "-i" => {
                    options.instrument = Some(Self::value(&args, &mut i)?.to_string());
                }
                "--output-dir" | "-o" => {
                    options.output_dir = Some(PathBuf::from(Self::value(&args, &mut i)?));
                }
                "--help" | "-h" => {
                    eprintln!("keytracks - Terminal toy synth and multi-track note recorder");
                    eprintln!();
                    eprintln!(
                        "Usage: {} [OPTIONS]",
                        args.first().map(String::as_str).unwrap_or("keytracks")
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -c, --config PATH       Load settings from a JSON file");
                    eprintln!("  -i, --instrument NAME   Start on an instrument (sine, triangle, square, bass, kick, snare)");
                    eprintln!("  -o, --output-dir DIR    Directory for captured and bounced WAV files");
                    eprintln!("  -h, --help              Print this help message");
                    eprintln!();
                    eprintln!("Set RUST_LOG=debug to log to stderr.");
                    std::process::exit(0);
                }
                other => {
                    anyhow::bail!("Unknown option: {} (use --help for usage)", other);
                }
            }
            i += 1;
        }

        Ok(options)
    }

    /// Returns the value following the option at `i`, advancing past it.
    fn value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
        let option = &args[*i];
        *i += 1;
        args.get(*i)
            .map(String::as_str)
            .with_context(|| format!("{} requires a value", option))
    }

    /// Builds the effective configuration: file first, then CLI overrides.
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)?,
            None => Config::default(),
        };
        if let Some(instrument) = self.instrument {
            config.instrument = instrument;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Main entry point.
fn main() -> Result<()> {
    // Parse CLI options first (before any terminal setup)
    let config = CliOptions::parse()?.into_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut app = App::new(config).context("Failed to initialize application")?;

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;
    let release_events = enable_release_events(&mut terminal);
    app.set_release_events(release_events);

    let result = run_app(&mut terminal, &mut app);
    app.shutdown();

    if release_events {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags).ok();
    }
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    result
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    enter_screen(&mut stdout)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Switches to the alternate screen and turns on focus reporting.
///
/// Focus reporting lets held keys be released when the window loses focus.
fn enter_screen<W: Write>(out: &mut W) -> Result<()> {
    execute!(out, EnterAlternateScreen, EnableFocusChange)
        .context("Failed to enter alternate screen")
}

/// Undoes [`enter_screen`].
fn leave_screen<W: Write>(out: &mut W) -> Result<()> {
    execute!(out, DisableFocusChange, LeaveAlternateScreen)
        .context("Failed to leave alternate screen")
}

/// Asks the terminal to report key releases.
///
/// Returns false when the terminal can't, in which case held keys are
/// released after `fallback_hold_secs` without a repeat.
fn enable_release_events(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> bool {
    if !supports_keyboard_enhancement().unwrap_or(false) {
        return false;
    }
    execute!(
        terminal.backend_mut(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    )
    .is_ok()
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    leave_screen(terminal.backend_mut())?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Runs the draw/input loop until the user quits.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.update();

        terminal.draw(|frame| ui::render(frame, app))?;

        // Short timeout keeps the glow and auto-release responsive
        if !event::poll(Duration::from_millis(16))? {
            continue;
        }

        match event::read()? {
            Event::Key(key) => match key.kind {
                KeyEventKind::Press => {
                    if handle_key(app, key.code) {
                        break;
                    }
                }
                KeyEventKind::Release => {
                    if let KeyCode::Char(c) = key.code {
                        app.handle_note_release(c);
                    }
                }
                // The key is already down
                KeyEventKind::Repeat => {}
            },
            Event::FocusLost => {
                app.sequencer.release_all();
            }
            _ => {}
        }
    }

    Ok(())
}

/// Handles a key press.
///
/// # Returns
///
/// true if the app should quit
fn handle_key(app: &mut App, code: KeyCode) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char(' ') => app.toggle_recording(),
        KeyCode::Enter => app.play_all(),
        KeyCode::Char('.') => app.play_selected(),
        KeyCode::Char('m') => app.toggle_mute_selected(),
        KeyCode::Up => app.select_previous_track(),
        KeyCode::Down => app.select_next_track(),
        KeyCode::Left => app.cycle_track_instrument(-1),
        KeyCode::Right => app.cycle_track_instrument(1),
        KeyCode::Char('[') => app.cycle_instrument(-1),
        KeyCode::Char(']') => app.cycle_instrument(1),
        KeyCode::Char('-') => app.change_octave(-1),
        KeyCode::Char('=') | KeyCode::Char('+') => app.change_octave(1),
        KeyCode::Char('0') => app.change_octave(-app.octave_offset),
        KeyCode::Char('v') => app.toggle_capture(),
        KeyCode::Char('b') => app.bounce(),
        KeyCode::Char(c) => {
            app.handle_note_press(c);
        }
        _ => {}
    }
    false
}

//! Terminal user interface components.
//!
//! This module provides the visual components for the recorder: the
//! transport bar, the track list, and the keyboard display.

mod keyboard;
mod tracks;
mod transport;

use crate::app::App;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::Frame;

pub use keyboard::render_keyboard;
pub use tracks::render_track_list;
pub use transport::render_transport;

/// Height of the keyboard panel: two key rows, two help rows, borders.
const KEYBOARD_HEIGHT: u16 = 6;

/// Splits the screen into transport, track list and keyboard.
fn calculate_layout(size: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),               // Transport
            Constraint::Min(4),                  // Tracks
            Constraint::Length(KEYBOARD_HEIGHT), // Keyboard
        ])
        .split(size);
    [chunks[0], chunks[1], chunks[2]]
}

/// Renders the complete UI.
///
/// The layout is divided into:
/// - Top: Recording state, instrument, octave and status
/// - Middle: Recorded tracks with mute and instrument
/// - Bottom: Keyboard with glowing keys and key bindings
pub fn render(frame: &mut Frame, app: &App) {
    let [transport, tracks, keyboard] = calculate_layout(frame.area());

    render_transport(frame, transport, app);
    render_track_list(frame, tracks, app);
    render_keyboard(frame, keyboard, app);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_fills_screen() {
        let [transport, tracks, keyboard] = calculate_layout(Rect::new(0, 0, 80, 24));
        assert_eq!(transport.height, 3);
        assert_eq!(keyboard.height, KEYBOARD_HEIGHT);
        assert_eq!(tracks.height, 24 - 3 - KEYBOARD_HEIGHT);
        assert_eq!(keyboard.y + keyboard.height, 24);
    }
}

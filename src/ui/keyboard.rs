//! Piano keyboard display.
//!
//! Shows the computer keyboard laid out as piano keys. Keys glow while held
//! and while a replayed note of the same pitch is sounding.

use crate::app::App;
use crate::midi::{note_to_name, KeyId};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// White keys, left to right.
const WHITE_KEYS: [KeyId; 10] = [
    KeyId::A,
    KeyId::S,
    KeyId::D,
    KeyId::F,
    KeyId::G,
    KeyId::H,
    KeyId::J,
    KeyId::K,
    KeyId::L,
    KeyId::Semicolon,
];

/// Black keys in the gaps between neighbouring white keys.
const BLACK_KEYS: [Option<KeyId>; 9] = [
    Some(KeyId::W),
    Some(KeyId::E),
    None,
    Some(KeyId::T),
    Some(KeyId::Y),
    Some(KeyId::U),
    None,
    Some(KeyId::O),
    Some(KeyId::P),
];

fn key_style(key: KeyId, lit: bool) -> Style {
    if lit {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else if key.is_black() {
        Style::default()
            .fg(Color::White)
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Black)
            .bg(Color::White)
            .add_modifier(Modifier::BOLD)
    }
}

/// Builds the black-key row, offset so each key sits between its neighbours.
fn build_black_row(app: &App) -> Vec<Span<'static>> {
    let mut spans = vec![Span::raw("  ")];
    for slot in BLACK_KEYS {
        match slot {
            Some(key) => spans.push(Span::styled(
                format!(" {} ", key.label()),
                key_style(key, app.is_key_lit(key)),
            )),
            None => spans.push(Span::raw("   ")),
        }
    }
    spans
}

fn build_white_row(app: &App) -> Vec<Span<'static>> {
    WHITE_KEYS
        .iter()
        .map(|&key| {
            Span::styled(
                format!(" {} ", key.label()),
                key_style(key, app.is_key_lit(key)),
            )
        })
        .collect()
}

/// Renders the piano keyboard at the bottom of the screen.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
pub fn render_keyboard(frame: &mut Frame, area: Rect, app: &App) {
    let low = note_to_name(KeyId::A.note(app.octave_offset));
    let high = note_to_name(KeyId::Semicolon.note(app.octave_offset));
    let release_mode = if app.release_events() {
        ""
    } else {
        " (auto-release)"
    };

    let block = Block::default()
        .title(format!(" Keyboard {}-{}{} ", low, high, release_mode))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = [
        Line::from(build_black_row(app)),
        Line::from(build_white_row(app)),
        build_help_line(),
        build_file_help_line(),
    ];

    for (i, row) in rows.into_iter().enumerate() {
        let y = i as u16;
        if y >= inner.height {
            break;
        }
        frame.render_widget(
            Paragraph::new(row),
            Rect::new(inner.x, inner.y + y, inner.width, 1),
        );
    }
}

fn hint(key: &'static str, desc: &'static str) -> [Span<'static>; 3] {
    let key_style = Style::default().fg(Color::Yellow);
    let desc_style = Style::default().fg(Color::DarkGray);
    [
        Span::styled("[", desc_style),
        Span::styled(key, key_style),
        Span::styled(desc, desc_style),
    ]
}

fn build_help_line() -> Line<'static> {
    let spans: Vec<Span> = [
        hint("Space", "]Rec "),
        hint("Enter", "]Play all "),
        hint("[/]", "]Inst "),
        hint("-/=", "]Octave "),
        hint("q", "]Quit"),
    ]
    .into_iter()
    .flatten()
    .collect();
    Line::from(spans)
}

fn build_file_help_line() -> Line<'static> {
    let spans: Vec<Span> = [hint("v", "]Capture mix "), hint("b", "]Bounce tracks")]
        .into_iter()
        .flatten()
        .collect();
    Line::from(spans)
}

//! Track list rendering.
//!
//! Displays every recorded track with its mute state, instrument, note count
//! and length, plus an activity marker while a replay of it is sounding.

use crate::app::App;
use crate::midi::Track;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

/// Height reserved for the control hints at the bottom.
const CONTROLS_HEIGHT: u16 = 1;

/// Width of the instrument column.
const INSTRUMENT_WIDTH: usize = 10;

/// Builds the single display line for a track.
fn track_line(track: &Track, selected: bool, playing: bool) -> Line<'static> {
    let mute_indicator = if track.muted {
        Span::styled(
            "M",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(".", Style::default().fg(Color::DarkGray))
    };

    let activity_indicator = if playing {
        Span::styled(
            "*",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::raw(" ")
    };

    let name_style = match (selected, playing) {
        (true, true) => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        (true, false) => Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
        (false, true) => Style::default().fg(Color::Green),
        (false, false) if track.muted => Style::default().fg(Color::DarkGray),
        (false, false) => Style::default().fg(Color::Gray),
    };

    Line::from(vec![
        mute_indicator,
        activity_indicator,
        Span::raw(" "),
        Span::styled(format!("{:<12}", track.name), name_style),
        Span::styled(
            format!(
                "{:<width$}",
                track.instrument.as_str(),
                width = INSTRUMENT_WIDTH
            ),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("{:>4} notes {:>6.1}s", track.event_count(), track.duration()),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

/// Renders the track list panel.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
pub fn render_track_list(frame: &mut Frame, area: Rect, app: &App) {
    let tracks = app.sequencer.tracks();
    let block = Block::default()
        .title(format!(" Tracks ({}) ", tracks.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),                  // Track list
            Constraint::Length(CONTROLS_HEIGHT), // Control hints
        ])
        .split(inner);

    if tracks.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "No tracks yet. Press Space to record.",
                Style::default().fg(Color::DarkGray),
            )),
            chunks[0],
        );
    } else {
        let items: Vec<ListItem> = tracks
            .list()
            .map(|(i, track)| {
                ListItem::new(track_line(
                    track,
                    i == app.selected_track_index,
                    app.is_track_playing(i),
                ))
            })
            .collect();

        let list = List::new(items)
            .highlight_style(
                Style::default()
                    .bg(Color::Rgb(40, 40, 40))
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let mut state = ListState::default();
        state.select(Some(app.selected_track_index));

        frame.render_stateful_widget(list, chunks[0], &mut state);
    }

    let key_style = Style::default().fg(Color::Yellow);
    let desc_style = Style::default().fg(Color::DarkGray);

    let controls = Line::from(vec![
        Span::styled("[", desc_style),
        Span::styled("Up/Down", key_style),
        Span::styled("]Select ", desc_style),
        Span::styled("[", desc_style),
        Span::styled(".", key_style),
        Span::styled("]Play ", desc_style),
        Span::styled("[", desc_style),
        Span::styled("m", key_style),
        Span::styled("]Mute ", desc_style),
        Span::styled("[", desc_style),
        Span::styled("Left/Right", key_style),
        Span::styled("]Inst", desc_style),
    ]);
    frame.render_widget(Paragraph::new(controls), chunks[1]);
}

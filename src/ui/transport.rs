//! Transport bar rendering.
//!
//! Displays the recording state, live instrument, octave, mix capture and the
//! latest status message.

use crate::app::App;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Formats seconds as `m:ss.t`.
fn format_elapsed(seconds: f64) -> String {
    let tenths = (seconds.max(0.0) * 10.0) as u64;
    format!("{}:{:02}.{}", tenths / 600, (tenths / 10) % 60, tenths % 10)
}

/// Renders the transport bar at the top of the screen.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
pub fn render_transport(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" keytracks ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(18), // Record state
            Constraint::Length(20), // Instrument
            Constraint::Length(12), // Octave
            Constraint::Length(8),  // Capture
            Constraint::Min(20),    // Status
        ])
        .split(inner);

    let record_status = if app.sequencer.is_recording() {
        Span::styled(
            format!(" [*] REC {}", format_elapsed(app.sequencer.recording_elapsed())),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(" [.] IDLE ", Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(Paragraph::new(Line::from(record_status)), chunks[0]);

    let instrument = Paragraph::new(Line::from(vec![
        Span::styled("Inst: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.sequencer.instrument().to_string(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ]));
    frame.render_widget(instrument, chunks[1]);

    let octave = Paragraph::new(Line::from(vec![
        Span::styled("Oct: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:+}", app.octave_offset),
            Style::default().fg(Color::White),
        ),
    ]));
    frame.render_widget(octave, chunks[2]);

    if app.audio.is_capturing() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "[WAV]",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            )),
            chunks[3],
        );
    }

    if let Some((msg, _)) = &app.status_message {
        let status = Paragraph::new(Line::from(Span::styled(
            msg.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        )));
        frame.render_widget(status, chunks[4]);
    }
}

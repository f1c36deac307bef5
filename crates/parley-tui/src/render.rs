//! Frame rendering.

use parley_core::providers::Role;
use parley_core::session::SessionSnapshot;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::state::AppState;
use crate::text::{display_width, wrap_width};

const USER_PREFIX: &str = "you";
const ASSISTANT_PREFIX: &str = "assistant";

pub fn render(state: &mut AppState, snapshot: &SessionSnapshot, frame: &mut Frame) {
    let [header_area, transcript_area, input_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(state, frame, header_area);
    render_transcript(state, snapshot, frame, transcript_area);
    render_input(state, snapshot, frame, input_area);
    render_status(snapshot, frame, status_area);
}

fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            state.provider_label.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" · "),
        Span::styled(state.model.clone(), Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn role_span(role: Role) -> Span<'static> {
    match role {
        Role::User => Span::styled(
            USER_PREFIX,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Role::Assistant => Span::styled(
            ASSISTANT_PREFIX,
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
    }
}

/// Builds the pre-wrapped transcript lines for the given viewport width.
fn transcript_lines(snapshot: &SessionSnapshot, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for message in &snapshot.transcript {
        lines.push(Line::from(role_span(message.role)));
        for wrapped in wrap_width(&message.content, width) {
            lines.push(Line::raw(wrapped));
        }
        lines.push(Line::raw(""));
    }

    if snapshot.streaming {
        lines.push(Line::from(role_span(Role::Assistant)));
        if snapshot.partial_reply.is_empty() {
            lines.push(Line::styled("…", Style::default().fg(Color::DarkGray)));
        } else {
            let mut wrapped = wrap_width(&snapshot.partial_reply, width);
            let last = wrapped.pop().unwrap_or_default();
            for line in wrapped {
                lines.push(Line::raw(line));
            }
            lines.push(Line::from(vec![
                Span::raw(last),
                Span::styled("▌", Style::default().fg(Color::DarkGray)),
            ]));
        }
    }

    lines
}

fn render_transcript(
    state: &mut AppState,
    snapshot: &SessionSnapshot,
    frame: &mut Frame,
    area: Rect,
) {
    let width = area.width as usize;
    let height = area.height as usize;
    state.viewport_height = height;

    let lines = transcript_lines(snapshot, width);
    let total = lines.len();

    // Clamp the manual scroll so the view cannot run past the first line.
    let max_from_bottom = total.saturating_sub(height);
    if state.scroll_from_bottom > max_from_bottom {
        state.scroll_from_bottom = max_from_bottom;
    }
    let top = max_from_bottom - state.scroll_from_bottom;

    let paragraph = Paragraph::new(lines).scroll((top as u16, 0));
    frame.render_widget(paragraph, area);
}

fn render_input(state: &AppState, snapshot: &SessionSnapshot, frame: &mut Frame, area: Rect) {
    let title = if snapshot.streaming {
        " streaming · Esc cancels "
    } else {
        " message "
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);

    let paragraph = Paragraph::new(state.input.buffer.clone()).block(block);
    frame.render_widget(paragraph, area);

    if !snapshot.streaming {
        let cursor_x = inner.x + display_width(&state.input.buffer[..state.input.cursor]) as u16;
        frame.set_cursor_position(Position::new(cursor_x.min(inner.right()), inner.y));
    }
}

fn render_status(snapshot: &SessionSnapshot, frame: &mut Frame, area: Rect) {
    let line = if let Some(error) = &snapshot.last_error {
        Line::styled(format!("error: {error}"), Style::default().fg(Color::Red))
    } else if snapshot.streaming {
        Line::styled(
            "streaming response…",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Line::styled(
            "Enter sends · ↑/↓ scroll · Ctrl+C quits",
            Style::default().fg(Color::DarkGray),
        )
    };
    frame.render_widget(Paragraph::new(line), area);
}

//! Key handling for the chat loop.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use parley_core::session::Session;

use crate::state::AppState;

/// Applies one key event to the UI state and session.
pub fn handle_key(state: &mut AppState, session: &mut Session, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            // Ctrl+C cancels an in-flight turn; quits when idle.
            KeyCode::Char('c') => {
                if session.is_streaming() {
                    session.cancel();
                } else {
                    state.should_quit = true;
                }
                return;
            }
            // Ctrl+D always quits; a running turn is abandoned (the user
            // message is already persisted).
            KeyCode::Char('d') => {
                session.cancel();
                state.should_quit = true;
                return;
            }
            KeyCode::Char('u') => {
                state.input.clear();
                return;
            }
            _ => {}
        }
    }

    match key.code {
        KeyCode::Enter => {
            // Rejected submissions (mid-stream, empty) keep the buffer so
            // nothing typed is lost.
            let text = state.input.buffer.clone();
            if session.submit_user_input(&text) {
                state.input.take();
                state.scroll_to_bottom();
            }
        }
        KeyCode::Esc => session.cancel(),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.input.insert(ch);
        }
        KeyCode::Backspace => state.input.backspace(),
        KeyCode::Delete => state.input.delete(),
        KeyCode::Left => state.input.move_left(),
        KeyCode::Right => state.input.move_right(),
        KeyCode::Home => state.input.move_home(),
        KeyCode::End => state.input.move_end(),
        KeyCode::Up => state.scroll_up(1),
        KeyCode::Down => state.scroll_down(1),
        KeyCode::PageUp => state.scroll_up(state.page()),
        KeyCode::PageDown => state.scroll_down(state.page()),
        _ => {}
    }
}

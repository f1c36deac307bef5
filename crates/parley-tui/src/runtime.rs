//! TUI runtime: owns the terminal and runs the event loop.
//!
//! Each loop iteration drains pending turn events from the session,
//! polls the terminal for input, and redraws when anything changed.
//! Session state only mutates here, on the owning task; the streaming
//! task communicates through its channels.

use std::io::Stdout;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use parley_core::interrupt;
use parley_core::session::Session;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use crate::state::AppState;
use crate::{render, terminal, update};

/// Poll deadline while a response is streaming (~60fps).
const STREAM_POLL: Duration = Duration::from_millis(16);
/// Poll deadline when idle; longer to save CPU.
const IDLE_POLL: Duration = Duration::from_millis(100);

pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: AppState,
}

impl TuiRuntime {
    /// Sets up the terminal and creates the runtime.
    pub fn new(state: AppState) -> Result<Self> {
        // Panic and interrupt hooks must be in place before entering the
        // alternate screen.
        terminal::install_panic_hook();
        interrupt::set_restore_hook(|| {
            let _ = terminal::restore_terminal();
        });
        interrupt::reset();

        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;
        Ok(Self { terminal, state })
    }

    /// Runs the event loop until the user quits.
    pub fn run(&mut self, session: &mut Session) -> Result<()> {
        let result = self.event_loop(session);
        let _ = terminal::restore_terminal();
        result
    }

    fn event_loop(&mut self, session: &mut Session) -> Result<()> {
        let mut dirty = true;

        while !self.state.should_quit {
            // A signal-level interrupt cancels the running turn; when idle
            // it quits with the conventional interrupt exit code. Mirrors
            // the Ctrl+C key binding for terminals where the key arrives
            // as SIGINT.
            if interrupt::is_interrupted() {
                interrupt::reset();
                if session.is_streaming() {
                    session.cancel();
                } else {
                    return Err(interrupt::InterruptedError.into());
                }
            }

            // Incremental delivery: apply each event as it arrives so the
            // next draw shows every increment in order.
            while let Some(turn_event) = session.try_next_event() {
                session.apply_event(turn_event);
                dirty = true;
            }

            let poll_deadline = if session.is_streaming() {
                STREAM_POLL
            } else {
                IDLE_POLL
            };

            if event::poll(poll_deadline).context("poll terminal events")? {
                match event::read().context("read terminal event")? {
                    Event::Key(key) => {
                        update::handle_key(&mut self.state, session, key);
                        dirty = true;
                    }
                    Event::Resize(_, _) => dirty = true,
                    _ => {}
                }
            }

            if dirty {
                let state = &mut self.state;
                let snapshot = session.snapshot();
                self.terminal.draw(|frame| {
                    render::render(state, &snapshot, frame);
                })?;
                dirty = false;
            }
        }

        // Leaving with a turn in flight: raise the cancellation signal and
        // go. The partial reply is acceptable loss; the user message was
        // persisted before dispatch.
        session.cancel();
        Ok(())
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        let _ = terminal::restore_terminal();
    }
}

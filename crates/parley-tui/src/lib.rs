//! Full-screen chat TUI for parley.

pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod text;
pub mod update;

use std::io::{IsTerminal, stderr};

use anyhow::Result;
use parley_core::session::Session;
pub use runtime::TuiRuntime;

use crate::state::AppState;

/// Runs the interactive chat loop until the user quits.
///
/// `provider_label` and `model` are display-only; the session already
/// holds the constructed adapter.
pub fn run_interactive_chat(
    session: &mut Session,
    provider_label: &str,
    model: &str,
) -> Result<()> {
    if !stderr().is_terminal() {
        anyhow::bail!("Chat mode requires a terminal.");
    }

    let state = AppState::new(provider_label, model);
    let mut runtime = TuiRuntime::new(state)?;
    runtime.run(session)
}

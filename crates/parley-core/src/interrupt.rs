//! Process-level interrupt handling.
//!
//! The Ctrl+C handler only sets a flag; rendering any message stays with
//! the UI layer. A second Ctrl+C force-exits after running the terminal
//! restore hook, since `process::exit` bypasses `Drop`.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static RESTORE_HOOK: OnceLock<Box<dyn Fn() + Send + Sync>> = OnceLock::new();

/// Returned by the UI loop when a signal-level interrupt asked the
/// process to stop; the binary maps it to exit code 130.
#[derive(Debug)]
pub struct InterruptedError;

impl std::fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interrupted")
    }
}

impl std::error::Error for InterruptedError {}

/// Initializes the Ctrl+C handler.
///
/// # Panics
/// Panics if registering the Ctrl+C handler fails.
pub fn init() {
    ctrlc::set_handler(move || {
        trigger_ctrl_c();
    })
    .expect("Error setting Ctrl+C handler");
}

/// Triggers an interrupt, force-exiting on the second one.
pub fn trigger_ctrl_c() {
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        if let Some(hook) = RESTORE_HOOK.get() {
            hook();
        }
        std::process::exit(130);
    }
}

/// Checks if an interrupt has been requested.
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Resets the interrupt flag.
pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

/// Registers a restore hook called on the second Ctrl+C before exit.
///
/// Typically used by the TUI to restore terminal state.
pub fn set_restore_hook<F>(hook: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let _ = RESTORE_HOOK.set(Box::new(hook));
}

//! Terminal commands behind the `windcode` subcommands.
//!
//! - `workspace`: default shell, file tree, file viewer, background file poll
//! - `assistant`: tool-calling assistant REPL with approvals
//! - `chat`: echo chatbot REPL
//! - `settings`: model listing and config summary

pub mod assistant;
pub mod chat;
pub mod settings;
pub mod workspace;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::{
    Cmd, ConditionalEventHandler, DefaultEditor, Event, EventContext, EventHandler, KeyCode,
    KeyEvent, Modifiers, RepeatCount,
};

/// Ctrl+L: raise a flag and interrupt the current `readline` call.
struct OpenAssistantHandler {
    requested: Arc<AtomicBool>,
}

impl ConditionalEventHandler for OpenAssistantHandler {
    fn handle(&self, _evt: &Event, _n: RepeatCount, _positive: bool, _ctx: &EventContext) -> Option<Cmd> {
        self.requested.store(true, Ordering::SeqCst);
        Some(Cmd::Interrupt)
    }
}

/// Line editor with WindCode key bindings.
///
/// `Enter` submits, `Shift+Enter` and `Alt+Enter` insert a newline. The
/// returned flag is set when `Ctrl+L` interrupted the read.
pub(crate) fn build_editor() -> Result<(DefaultEditor, Arc<AtomicBool>), ReadlineError> {
    let mut rl = DefaultEditor::new()?;
    rl.bind_sequence(KeyEvent(KeyCode::Enter, Modifiers::SHIFT), Cmd::Newline);
    rl.bind_sequence(KeyEvent(KeyCode::Enter, Modifiers::ALT), Cmd::Newline);

    let requested = Arc::new(AtomicBool::new(false));
    rl.bind_sequence(
        KeyEvent::ctrl('L'),
        EventHandler::Conditional(Box::new(OpenAssistantHandler {
            requested: requested.clone(),
        })),
    );
    Ok((rl, requested))
}

/// Check and clear the Ctrl+L flag.
pub(crate) fn take_flag(flag: &AtomicBool) -> bool {
    flag.swap(false, Ordering::SeqCst)
}

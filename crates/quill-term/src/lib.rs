//! Thin crossterm adapter: raw-mode lifetime, frame painting, the blocking
//! input thread, and the prompt loop over the event queue.
//!
//! Nothing in here computes layout or positions — it paints what
//! `quill-render` produced and forwards what crossterm decoded.

use anyhow::Result;
use crossterm::terminal::{
    self, DisableLineWrap, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{cursor, event, execute};
use std::io;

mod input;
mod painter;
mod prompt;

pub use input::spawn_input;
pub use painter::{paint_frame, paint_prompt};
pub use prompt::EventPrompter;

/// Raw mode + alternate screen for the lifetime of this guard.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(
            io::stdout(),
            EnterAlternateScreen,
            DisableLineWrap,
            event::EnableBracketedPaste
        )?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(
            io::stdout(),
            event::DisableBracketedPaste,
            EnableLineWrap,
            LeaveAlternateScreen,
            cursor::Show
        );
        let _ = terminal::disable_raw_mode();
    }
}

/// Current terminal dimensions (columns, rows).
pub fn terminal_size() -> Result<(u16, u16)> {
    Ok(terminal::size()?)
}

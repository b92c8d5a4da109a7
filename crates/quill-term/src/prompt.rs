//! Prompt loop over the event queue.
//!
//! Prompts block on the *same* receiver the editing loop drains — a nested
//! blocking read, safe because the core is not reentrant: no second edit
//! can be in flight while a prompt loop owns control. Escape is the only
//! cancellation signal; there are no timeouts.

use quill_events::{Event, EventReceiver, KeyCode, Modifiers};
use quill_search::Prompter;

use crate::painter::paint_prompt;
use crate::terminal_size;

pub struct EventPrompter<'a> {
    rx: &'a EventReceiver,
}

impl<'a> EventPrompter<'a> {
    pub fn new(rx: &'a EventReceiver) -> Self {
        Self { rx }
    }

    fn repaint(&self, label: &str, input: &str) {
        if let Ok(size) = terminal_size() {
            let _ = paint_prompt(label, input, size);
        }
    }
}

impl Prompter for EventPrompter<'_> {
    fn prompt(&mut self, label: &str, default: &str) -> Option<String> {
        let mut input = default.to_string();
        loop {
            self.repaint(label, &input);
            match self.rx.recv() {
                Err(_) => return None,
                Ok(Event::Key(key)) => match key.code {
                    KeyCode::Esc => return None,
                    KeyCode::Enter => return Some(input),
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    KeyCode::Char(c) if !key.mods.contains(Modifiers::CTRL) => input.push(c),
                    _ => {}
                },
                Ok(Event::Paste(text)) => input.push_str(&text),
                Ok(Event::Resize(..)) => {}
                Ok(Event::Shutdown) => return None,
            }
        }
    }

    fn confirm(&mut self, label: &str) -> Option<bool> {
        loop {
            self.repaint(label, "");
            match self.rx.recv() {
                Err(_) => return None,
                Ok(Event::Key(key)) => match key.code {
                    KeyCode::Esc => return None,
                    KeyCode::Char('y') | KeyCode::Char('Y') => return Some(true),
                    KeyCode::Char('n') | KeyCode::Char('N') => return Some(false),
                    _ => {}
                },
                Ok(Event::Shutdown) => return None,
                Ok(_) => {}
            }
        }
    }
}

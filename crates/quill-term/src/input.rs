//! Blocking input thread: decodes crossterm events into normalized
//! [`quill_events::Event`]s and pushes them into the bounded queue.
//!
//! The thread exits when the consumer hangs up (a failed send) or the
//! terminal read errors. `blocking` send semantics park this thread under
//! backpressure instead of dropping keystrokes.

use std::sync::atomic::Ordering;
use std::thread;

use crossterm::event::{
    Event as CtEvent, KeyCode as CtKeyCode, KeyEvent as CtKeyEvent, KeyEventKind,
    KeyModifiers as CtModifiers, read,
};
use tracing::{trace, warn};

use quill_events::{CHANNEL_SEND_FAILURES, Event, EventSender, KeyCode, KeyEvent, Modifiers};

pub fn spawn_input(tx: EventSender) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        trace!(target: "input", "input_thread_started");
        loop {
            let raw = match read() {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(target: "input", ?err, "terminal_read_error");
                    break;
                }
            };
            let Some(event) = translate(raw) else {
                continue;
            };
            if tx.send(event).is_err() {
                CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                break;
            }
        }
        trace!(target: "input", "input_thread_stopped");
    })
}

fn translate(raw: CtEvent) -> Option<Event> {
    match raw {
        CtEvent::Key(key) if key.kind != KeyEventKind::Release => map_key(key).map(Event::Key),
        CtEvent::Resize(w, h) => Some(Event::Resize(w, h)),
        CtEvent::Paste(text) => Some(Event::Paste(text)),
        _ => None,
    }
}

fn map_key(key: CtKeyEvent) -> Option<KeyEvent> {
    let code = match key.code {
        CtKeyCode::Char(c) => KeyCode::Char(c),
        CtKeyCode::Enter => KeyCode::Enter,
        CtKeyCode::Esc => KeyCode::Esc,
        CtKeyCode::Backspace => KeyCode::Backspace,
        CtKeyCode::Tab | CtKeyCode::BackTab => KeyCode::Tab,
        CtKeyCode::Delete => KeyCode::Delete,
        CtKeyCode::Up => KeyCode::Up,
        CtKeyCode::Down => KeyCode::Down,
        CtKeyCode::Left => KeyCode::Left,
        CtKeyCode::Right => KeyCode::Right,
        CtKeyCode::Home => KeyCode::Home,
        CtKeyCode::End => KeyCode::End,
        CtKeyCode::PageUp => KeyCode::PageUp,
        CtKeyCode::PageDown => KeyCode::PageDown,
        _ => return None,
    };
    let mut mods = Modifiers::empty();
    if key.modifiers.contains(CtModifiers::CONTROL) {
        mods |= Modifiers::CTRL;
    }
    if key.modifiers.contains(CtModifiers::ALT) {
        mods |= Modifiers::ALT;
    }
    if key.modifiers.contains(CtModifiers::SHIFT) {
        mods |= Modifiers::SHIFT;
    }
    Some(KeyEvent { code, mods })
}

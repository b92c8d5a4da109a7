//! Event types and the bounded queue between the input producer and the
//! editing loop.
//!
//! This queue is the only resource crossing a concurrency boundary: one
//! sender (the blocking input thread) and one receiver (the editing loop),
//! FIFO in arrival order. The bounded capacity gives natural backpressure —
//! the producer parks rather than dropping events, since losing motion or
//! edit keystrokes is worse than a briefly stalled reader. Interactive
//! prompt loops block on the *same* receiver; the core is not reentrant, so
//! no second consumer ever exists.

use std::fmt;
use std::sync::atomic::AtomicU64;

use bitflags::bitflags;
use crossbeam_channel::{Receiver, Sender, bounded};

pub const EVENT_CHANNEL_CAP: usize = 1024;

/// Sends that failed because the consumer hung up. Inspected in tests and
/// periodic logs; the input thread exits once this starts incrementing.
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Top-level event consumed by the editing loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    /// Bracketed paste, delivered whole.
    Paste(String),
    /// Terminal resize (columns, rows).
    Resize(u16, u16),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: Modifiers,
}

impl KeyEvent {
    pub fn plain(code: KeyCode) -> Self {
        Self {
            code,
            mods: Modifiers::empty(),
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            mods: Modifiers::CTRL,
        }
    }
}

/// Normalized logical keys; the core never sees raw terminal bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const CTRL  = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const SHIFT = 0b0000_0100;
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?}", self.code, self.mods)
    }
}

pub type EventSender = Sender<Event>;
pub type EventReceiver = Receiver<Event>;

/// The single-producer single-consumer event queue.
pub fn channel() -> (EventSender, EventReceiver) {
    bounded(EVENT_CHANNEL_CAP)
}

//! Rope-based text store and the position model shared by every other crate.
//!
//! All coordinate conversions live here: (line, rune-column) positions,
//! absolute rune offsets, and visual columns (see [`width`]). Keeping the
//! three coordinate spaces in one crate means callers never hand-roll
//! rune/byte/visual arithmetic at call sites.

use ropey::Rope;
use serde::{Deserialize, Serialize};

pub mod width;
pub mod word;

/// A position inside a buffer expressed as (line index, rune column).
///
/// `column` counts runes (chars), not bytes; it may equal the line's rune
/// length, addressing the slot just past the last rune (where the line's
/// terminator sits, or the document end on the final line).
///
/// Ordering is line-major, then column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn origin() -> Self {
        Self { line: 0, column: 0 }
    }
}

/// Position just past `text` inserted at `start`.
///
/// Pure arithmetic over the inserted text; shared by journal coalescing and
/// cursor placement after an insert.
pub fn end_of(start: Position, text: &str) -> Position {
    let mut line = start.line;
    let mut column = start.column;
    for ch in text.chars() {
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    Position::new(line, column)
}

/// The document of record: an ordered sequence of terminator-free lines
/// backed by a `ropey::Rope`.
///
/// Invariants after any mutation:
/// * `line_count() >= 1` (an empty document is one empty line);
/// * no line surfaced by [`Buffer::line`] contains a terminator;
/// * `to_offset` / `from_offset` are exact inverses for in-range positions.
///
/// Out-of-range positions are a caller contract violation, not a runtime
/// error: mutation primitives `debug_assert!` and clamp rather than fail.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    modified: bool,
}

impl Buffer {
    pub fn from_str(content: &str) -> Self {
        Self {
            rope: Rope::from_str(content),
            modified: false,
        }
    }

    pub fn new() -> Self {
        Self::from_str("")
    }

    /// Total number of lines. Always >= 1; a trailing terminator yields a
    /// final empty line, matching the line-array view of the text.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line content without its terminator. Out-of-range indices return an
    /// empty string; rendering routinely probes one line past the window.
    pub fn line(&self, idx: usize) -> String {
        if idx >= self.rope.len_lines() {
            return String::new();
        }
        let mut s = self.rope.line(idx).to_string();
        if s.ends_with('\n') {
            s.pop();
        }
        s
    }

    /// Rune length of a line, excluding its terminator.
    pub fn line_len(&self, idx: usize) -> usize {
        let lines = self.rope.len_lines();
        if idx >= lines {
            return 0;
        }
        let start = self.rope.line_to_char(idx);
        if idx + 1 < lines {
            self.rope.line_to_char(idx + 1) - start - 1
        } else {
            self.rope.len_chars() - start
        }
    }

    /// First addressable position.
    pub fn start(&self) -> Position {
        Position::origin()
    }

    /// Last addressable position: the slot past the final rune.
    pub fn end(&self) -> Position {
        let last = self.line_count() - 1;
        Position::new(last, self.line_len(last))
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// True when `pos` addresses an existing slot (column may sit one past
    /// the last rune of its line).
    pub fn contains(&self, pos: Position) -> bool {
        pos.line < self.line_count() && pos.column <= self.line_len(pos.line)
    }

    /// Clamp a position into range, preferring the same line when it exists.
    pub fn clamp(&self, pos: Position) -> Position {
        let line = pos.line.min(self.line_count() - 1);
        Position::new(line, pos.column.min(self.line_len(line)))
    }

    /// Absolute rune offset of `pos` from the document start.
    ///
    /// Exact inverse of [`Buffer::from_offset`] for in-range positions;
    /// out-of-range input clamps.
    pub fn to_offset(&self, pos: Position) -> usize {
        let pos = self.clamp(pos);
        self.rope.line_to_char(pos.line) + pos.column
    }

    /// Position of the absolute rune offset `off` (clamped to the document).
    pub fn from_offset(&self, off: usize) -> Position {
        let off = off.min(self.rope.len_chars());
        let line = self.rope.char_to_line(off);
        Position::new(line, off - self.rope.line_to_char(line))
    }

    /// Insert `text` at `pos`. Embedded terminators split lines; the tail of
    /// the line at `pos` ends up after the last inserted segment. Marks the
    /// document modified.
    pub fn insert(&mut self, pos: Position, text: &str) {
        if text.is_empty() {
            return;
        }
        debug_assert!(self.contains(pos), "insert position out of range: {pos:?}");
        let idx = self.to_offset(pos);
        self.rope.insert(idx, text);
        self.modified = true;
    }

    /// Remove the half-open range `[start, end)` and return the removed
    /// text. Line boundaries inside the range join. Marks modified.
    pub fn remove(&mut self, start: Position, end: Position) -> String {
        debug_assert!(start <= end, "remove range inverted: {start:?}..{end:?}");
        debug_assert!(self.contains(start) && self.contains(end));
        let a = self.to_offset(start.min(end));
        let b = self.to_offset(start.max(end));
        if a >= b {
            return String::new();
        }
        let removed = self.rope.slice(a..b).to_string();
        self.rope.remove(a..b);
        self.modified = true;
        removed
    }

    /// Remove `[start, end)` then insert `text` at `start`, as one logical
    /// step for journaling purposes. Returns the removed text.
    pub fn replace(&mut self, start: Position, end: Position, text: &str) -> String {
        let removed = self.remove(start, end);
        self.insert(self.clamp(start), text);
        removed
    }

    /// Text of the half-open range `[start, end)`.
    pub fn slice(&self, start: Position, end: Position) -> String {
        let a = self.to_offset(start.min(end));
        let b = self.to_offset(start.max(end));
        self.rope.slice(a..b).to_string()
    }

    /// The flattened document; search operates on this view.
    pub fn contents(&self) -> String {
        self.rope.to_string()
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

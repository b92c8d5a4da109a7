//! Edit journal: every buffer mutation passes through here so it can be
//! reversed and replayed.
//!
//! The journal keeps two stacks of steps. A step is one undo unit and
//! usually holds a single entry; coalescing extends the previous entry in
//! place so a typing burst undoes as a phrase, while a replace (and any
//! batch, see [`EditJournal::begin_batch`]) groups several entries into one
//! step. The inverse symmetry invariant: undoing an Insert entry removes
//! exactly the span it produced, and undoing a Remove re-inserts exactly
//! the text it took — both sides round-trip byte for byte.
//!
//! Journal operations are pure in-memory bookkeeping and never surface
//! user-facing errors; an empty-stack undo/redo is a no-op, not a fault.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::trace;

use quill_text::{Buffer, Position, end_of};

mod diff;

/// Entries closer together than this (and spatially contiguous) merge into
/// one undo step. Overridable via [`EditJournal::with_window`].
pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(500);

/// Oldest steps are dropped beyond this depth.
pub const JOURNAL_HISTORY_MAX: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditKind {
    Insert,
    Remove,
}

/// One reversible edit: `text` inserted at (or removed from) `position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub kind: EditKind,
    pub position: Position,
    pub text: String,
    pub timestamp: SystemTime,
}

impl JournalEntry {
    /// Position just past the affected span.
    pub fn end_position(&self) -> Position {
        end_of(self.position, &self.text)
    }
}

/// One undo unit: entries applied in order, undone in reverse order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UndoStep {
    pub entries: Vec<JournalEntry>,
}

pub struct EditJournal {
    undo: Vec<UndoStep>,
    redo: Vec<UndoStep>,
    coalesce_window: Duration,
    batch_depth: usize,
    batch_started: bool,
}

impl Default for EditJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl EditJournal {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_COALESCE_WINDOW)
    }

    pub fn with_window(coalesce_window: Duration) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            coalesce_window,
            batch_depth: 0,
            batch_started: false,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Insert `text` at `pos` through the journal.
    pub fn insert(&mut self, buf: &mut Buffer, pos: Position, text: &str) {
        self.insert_at(buf, pos, text, SystemTime::now());
    }

    /// As [`EditJournal::insert`] with an explicit timestamp, for
    /// deterministic coalescing in tests and snapshot replay.
    pub fn insert_at(&mut self, buf: &mut Buffer, pos: Position, text: &str, at: SystemTime) {
        if text.is_empty() {
            return;
        }
        let pos = buf.clamp(pos);
        buf.insert(pos, text);
        self.record(EditKind::Insert, pos, text.to_string(), at);
    }

    /// Remove `[start, end)` through the journal, returning the removed text.
    pub fn remove(&mut self, buf: &mut Buffer, start: Position, end: Position) -> String {
        self.remove_at(buf, start, end, SystemTime::now())
    }

    pub fn remove_at(
        &mut self,
        buf: &mut Buffer,
        start: Position,
        end: Position,
        at: SystemTime,
    ) -> String {
        let from = buf.clamp(start.min(end));
        let removed = buf.remove(from, buf.clamp(start.max(end)));
        if !removed.is_empty() {
            self.record(EditKind::Remove, from, removed.clone(), at);
        }
        removed
    }

    /// Remove then insert as one undo step. Returns the removed text.
    pub fn replace(
        &mut self,
        buf: &mut Buffer,
        start: Position,
        end: Position,
        text: &str,
    ) -> String {
        self.replace_at(buf, start, end, text, SystemTime::now())
    }

    pub fn replace_at(
        &mut self,
        buf: &mut Buffer,
        start: Position,
        end: Position,
        text: &str,
        at: SystemTime,
    ) -> String {
        self.begin_batch();
        let removed = self.remove_at(buf, start, end, at);
        self.insert_at(buf, start.min(end), text, at);
        self.end_batch();
        removed
    }

    /// Open a batch: until the matching [`EditJournal::end_batch`], every
    /// recorded entry joins a single undo step. Nestable; used by bulk
    /// replace and [`EditJournal::apply_diff`].
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    pub fn end_batch(&mut self) {
        debug_assert!(self.batch_depth > 0, "end_batch without begin_batch");
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 {
            self.batch_started = false;
        }
    }

    fn record(&mut self, kind: EditKind, position: Position, text: String, at: SystemTime) {
        self.redo.clear();
        if self.batch_depth > 0 {
            if self.batch_started {
                let step = self.undo.last_mut().expect("open batch step");
                step.entries.push(JournalEntry {
                    kind,
                    position,
                    text,
                    timestamp: at,
                });
            } else {
                self.push_step(JournalEntry {
                    kind,
                    position,
                    text,
                    timestamp: at,
                });
                self.batch_started = true;
            }
            return;
        }
        if let Some(step) = self.undo.last_mut()
            && let Some(last) = step.entries.last_mut()
            && Self::try_merge(last, kind, position, &text, at, self.coalesce_window)
        {
            trace!(target: "journal.record", depth = self.undo.len(), "entry_coalesced");
            return;
        }
        self.push_step(JournalEntry {
            kind,
            position,
            text,
            timestamp: at,
        });
    }

    fn push_step(&mut self, entry: JournalEntry) {
        self.undo.push(UndoStep {
            entries: vec![entry],
        });
        trace!(target: "journal.record", depth = self.undo.len(), "step_pushed");
        if self.undo.len() > JOURNAL_HISTORY_MAX {
            self.undo.remove(0);
            trace!(target: "journal.record", "history_trimmed");
        }
    }

    /// Merge a new edit into the previous entry when it continues the same
    /// run: same kind, within the coalescing window, and spatially adjacent
    /// (insert appended at the previous end; remove either ending at the
    /// previous start — a backspace run — or at the same position — a
    /// delete run). A cursor move or non-adjacent edit breaks the run.
    fn try_merge(
        last: &mut JournalEntry,
        kind: EditKind,
        position: Position,
        text: &str,
        at: SystemTime,
        window: Duration,
    ) -> bool {
        if last.kind != kind {
            return false;
        }
        let within = at
            .duration_since(last.timestamp)
            .map(|d| d < window)
            .unwrap_or(true);
        if !within {
            return false;
        }
        match kind {
            EditKind::Insert if position == last.end_position() => {
                last.text.push_str(text);
                last.timestamp = at;
                true
            }
            EditKind::Remove if end_of(position, text) == last.position => {
                let mut merged = text.to_string();
                merged.push_str(&last.text);
                last.text = merged;
                last.position = position;
                last.timestamp = at;
                true
            }
            EditKind::Remove if position == last.position => {
                last.text.push_str(text);
                last.timestamp = at;
                true
            }
            _ => false,
        }
    }

    /// Pop the most recent step and apply its inverse. Returns the position
    /// of the step's start for cursor placement, or None when the stack is
    /// empty.
    pub fn undo(&mut self, buf: &mut Buffer) -> Option<Position> {
        let step = self.undo.pop()?;
        for entry in step.entries.iter().rev() {
            match entry.kind {
                EditKind::Insert => {
                    buf.remove(entry.position, entry.end_position());
                }
                EditKind::Remove => {
                    buf.insert(entry.position, &entry.text);
                }
            }
        }
        let pos = step.entries.first().map(|e| e.position).unwrap_or_default();
        trace!(
            target: "journal.undo",
            undo_depth = self.undo.len(),
            redo_depth = self.redo.len() + 1,
            "undo_pop"
        );
        self.redo.push(step);
        Some(pos)
    }

    /// Pop the most recent redo step and replay it. Returns the cursor
    /// landing position (end of a reapplied insert, start of a remove).
    pub fn redo(&mut self, buf: &mut Buffer) -> Option<Position> {
        let step = self.redo.pop()?;
        for entry in &step.entries {
            match entry.kind {
                EditKind::Insert => buf.insert(entry.position, &entry.text),
                EditKind::Remove => {
                    buf.remove(entry.position, entry.end_position());
                }
            }
        }
        let pos = step
            .entries
            .last()
            .map(|e| match e.kind {
                EditKind::Insert => e.end_position(),
                EditKind::Remove => e.position,
            })
            .unwrap_or_default();
        trace!(
            target: "journal.redo",
            undo_depth = self.undo.len() + 1,
            redo_depth = self.redo.len(),
            "redo_pop"
        );
        self.undo.push(step);
        Some(pos)
    }

    /// Turn the buffer's content into `new_text` via a line-level edit
    /// script, recorded as a single undo step — an externally triggered
    /// reload stays undoable instead of resetting history.
    pub fn apply_diff(&mut self, buf: &mut Buffer, new_text: &str) {
        self.apply_diff_at(buf, new_text, SystemTime::now());
    }

    pub fn apply_diff_at(&mut self, buf: &mut Buffer, new_text: &str, at: SystemTime) {
        let old_text = buf.contents();
        if old_text == new_text {
            return;
        }
        let edits = diff::char_edits(&old_text, new_text);
        trace!(target: "journal.diff", edit_count = edits.len(), "apply_diff");
        self.begin_batch();
        let mut adjust: isize = 0;
        for edit in &edits {
            let start = (edit.old_start as isize + adjust) as usize;
            let from = buf.from_offset(start);
            if edit.old_end > edit.old_start {
                let to = buf.from_offset(start + (edit.old_end - edit.old_start));
                self.remove_at(buf, from, to, at);
            }
            if !edit.replacement.is_empty() {
                self.insert_at(buf, from, &edit.replacement, at);
            }
            adjust += edit.replacement.chars().count() as isize
                - (edit.old_end - edit.old_start) as isize;
        }
        self.end_batch();
    }

    /// The undo/redo stacks, for snapshot serialization.
    pub fn history(&self) -> (&[UndoStep], &[UndoStep]) {
        (&self.undo, &self.redo)
    }

    /// Replace the stacks wholesale, for snapshot restoration.
    pub fn restore(&mut self, undo: Vec<UndoStep>, redo: Vec<UndoStep>) {
        self.undo = undo;
        self.redo = redo;
        self.batch_depth = 0;
        self.batch_started = false;
    }
}

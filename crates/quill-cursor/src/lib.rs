//! Cursor and selection model.
//!
//! A cursor is a location plus an (anchor, active) pair into the buffer.
//! The selection is live iff anchor != active; the pair is unordered and
//! every range query normalizes through [`Cursor::selection`]. While a
//! selection is live the invariant `location == active` holds.
//!
//! `desired_visual_col` persists across vertical motion: moving through
//! lines with different tab layouts lands on the rune whose cell run covers
//! the remembered visual column instead of snapping to a rune index.
//! Horizontal motions re-remember it; vertical motions only consume it.
//!
//! Collapse convention for plain motions over a live selection (kept
//! deliberately asymmetric, matching the reference behavior): left jumps to
//! the near edge and stops; right jumps to the far edge and stops; up
//! collapses to the near edge *then* moves up a line; down collapses to the
//! far edge then moves down.
//!
//! Edge-of-buffer policy: motions clamp at `{0,0}` and document end, never
//! wrap.

use serde::{Deserialize, Serialize};

use quill_text::{Buffer, Position, width, word};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Cursor {
    pub location: Position,
    anchor: Position,
    active: Position,
    pub desired_visual_col: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(pos: Position) -> Self {
        Self {
            location: pos,
            anchor: pos,
            active: pos,
            desired_visual_col: 0,
        }
    }

    pub fn has_selection(&self) -> bool {
        self.anchor != self.active
    }

    /// Normalized half-open selection range, when live.
    pub fn selection(&self) -> Option<(Position, Position)> {
        self.has_selection()
            .then(|| (self.anchor.min(self.active), self.anchor.max(self.active)))
    }

    /// Install a selection; the cursor lands on `end`.
    pub fn set_selection(&mut self, start: Position, end: Position) {
        self.anchor = start;
        self.active = end;
        self.location = end;
    }

    pub fn clear_selection(&mut self) {
        self.anchor = self.location;
        self.active = self.location;
    }

    /// Jump to `pos` (clamped), dropping any selection and re-remembering
    /// the visual column.
    pub fn move_to(&mut self, buf: &Buffer, pos: Position, tab_size: usize) {
        self.location = buf.clamp(pos);
        self.clear_selection();
        self.remember_column(buf, tab_size);
    }

    /// Re-validate against a buffer that may have shrunk underneath us.
    pub fn clamp(&mut self, buf: &Buffer) {
        self.location = buf.clamp(self.location);
        self.anchor = buf.clamp(self.anchor);
        self.active = buf.clamp(self.active);
        if !self.has_selection() {
            self.clear_selection();
        }
    }

    fn remember_column(&mut self, buf: &Buffer, tab_size: usize) {
        let line = buf.line(self.location.line);
        self.desired_visual_col = width::visual_col(&line, self.location.column, tab_size);
    }

    // ---- plain motions -------------------------------------------------

    pub fn up(&mut self, buf: &Buffer, tab_size: usize) {
        if let Some((start, _)) = self.selection() {
            self.location = start;
        }
        self.raw_up(buf, tab_size);
        self.clear_selection();
    }

    pub fn down(&mut self, buf: &Buffer, tab_size: usize) {
        if let Some((_, end)) = self.selection() {
            self.location = end;
        }
        self.raw_down(buf, tab_size);
        self.clear_selection();
    }

    pub fn left(&mut self, buf: &Buffer, tab_size: usize) {
        if let Some((start, _)) = self.selection() {
            self.location = start;
            self.clear_selection();
            self.remember_column(buf, tab_size);
            return;
        }
        self.raw_left(buf, tab_size);
        self.clear_selection();
    }

    pub fn right(&mut self, buf: &Buffer, tab_size: usize) {
        if let Some((_, end)) = self.selection() {
            self.location = end;
            self.clear_selection();
            self.remember_column(buf, tab_size);
            return;
        }
        self.raw_right(buf, tab_size);
        self.clear_selection();
    }

    pub fn word_left(&mut self, buf: &Buffer, tab_size: usize) {
        self.raw_word_left(buf, tab_size);
        self.clear_selection();
    }

    pub fn word_right(&mut self, buf: &Buffer, tab_size: usize) {
        self.raw_word_right(buf, tab_size);
        self.clear_selection();
    }

    pub fn line_start(&mut self, buf: &Buffer, tab_size: usize) {
        self.raw_line_start(buf, tab_size);
        self.clear_selection();
    }

    pub fn line_end(&mut self, buf: &Buffer, tab_size: usize) {
        self.raw_line_end(buf, tab_size);
        self.clear_selection();
    }

    pub fn document_start(&mut self, buf: &Buffer, tab_size: usize) {
        self.raw_document_start(buf, tab_size);
        self.clear_selection();
    }

    pub fn document_end(&mut self, buf: &Buffer, tab_size: usize) {
        self.raw_document_end(buf, tab_size);
        self.clear_selection();
    }

    pub fn page_up(&mut self, buf: &Buffer, tab_size: usize, page: usize) {
        self.raw_page(buf, tab_size, -(page.max(1) as isize));
        self.clear_selection();
    }

    pub fn page_down(&mut self, buf: &Buffer, tab_size: usize, page: usize) {
        self.raw_page(buf, tab_size, page.max(1) as isize);
        self.clear_selection();
    }

    // ---- selecting motions ---------------------------------------------

    pub fn select_up(&mut self, buf: &Buffer, tab_size: usize) {
        self.selecting(|c| c.raw_up(buf, tab_size));
    }

    pub fn select_down(&mut self, buf: &Buffer, tab_size: usize) {
        self.selecting(|c| c.raw_down(buf, tab_size));
    }

    pub fn select_left(&mut self, buf: &Buffer, tab_size: usize) {
        self.selecting(|c| c.raw_left(buf, tab_size));
    }

    pub fn select_right(&mut self, buf: &Buffer, tab_size: usize) {
        self.selecting(|c| c.raw_right(buf, tab_size));
    }

    pub fn select_word_left(&mut self, buf: &Buffer, tab_size: usize) {
        self.selecting(|c| c.raw_word_left(buf, tab_size));
    }

    pub fn select_word_right(&mut self, buf: &Buffer, tab_size: usize) {
        self.selecting(|c| c.raw_word_right(buf, tab_size));
    }

    pub fn select_line_start(&mut self, buf: &Buffer, tab_size: usize) {
        self.selecting(|c| c.raw_line_start(buf, tab_size));
    }

    pub fn select_line_end(&mut self, buf: &Buffer, tab_size: usize) {
        self.selecting(|c| c.raw_line_end(buf, tab_size));
    }

    pub fn select_document_start(&mut self, buf: &Buffer, tab_size: usize) {
        self.selecting(|c| c.raw_document_start(buf, tab_size));
    }

    pub fn select_document_end(&mut self, buf: &Buffer, tab_size: usize) {
        self.selecting(|c| c.raw_document_end(buf, tab_size));
    }

    /// Capture the anchor only when no selection is live, so repeated
    /// selecting motions extend rather than restart.
    fn selecting<F: FnOnce(&mut Self)>(&mut self, motion: F) {
        if !self.has_selection() {
            self.anchor = self.location;
        }
        motion(self);
        self.active = self.location;
    }

    // ---- raw motions: move the location only ---------------------------

    fn raw_up(&mut self, buf: &Buffer, tab_size: usize) {
        if self.location.line == 0 {
            return;
        }
        self.land_on(buf, tab_size, self.location.line - 1);
    }

    fn raw_down(&mut self, buf: &Buffer, tab_size: usize) {
        if self.location.line + 1 >= buf.line_count() {
            return;
        }
        self.land_on(buf, tab_size, self.location.line + 1);
    }

    /// Vertical landing: pick the column covering the desired visual column.
    fn land_on(&mut self, buf: &Buffer, tab_size: usize, line: usize) {
        let text = buf.line(line);
        let column = width::column_for_visual(&text, self.desired_visual_col, tab_size);
        self.location = Position::new(line, column);
    }

    fn raw_left(&mut self, buf: &Buffer, tab_size: usize) {
        if self.location.column > 0 {
            self.location.column -= 1;
        } else if self.location.line > 0 {
            let line = self.location.line - 1;
            self.location = Position::new(line, buf.line_len(line));
        }
        self.remember_column(buf, tab_size);
    }

    fn raw_right(&mut self, buf: &Buffer, tab_size: usize) {
        if self.location.column < buf.line_len(self.location.line) {
            self.location.column += 1;
        } else if self.location.line + 1 < buf.line_count() {
            self.location = Position::new(self.location.line + 1, 0);
        }
        self.remember_column(buf, tab_size);
    }

    fn raw_word_left(&mut self, buf: &Buffer, tab_size: usize) {
        if self.location.column == 0 {
            if self.location.line > 0 {
                let line = self.location.line - 1;
                self.location = Position::new(line, buf.line_len(line));
            }
        } else {
            let text = buf.line(self.location.line);
            self.location.column = word::prev_word_start(&text, self.location.column).unwrap_or(0);
        }
        self.remember_column(buf, tab_size);
    }

    fn raw_word_right(&mut self, buf: &Buffer, tab_size: usize) {
        let len = buf.line_len(self.location.line);
        if self.location.column >= len {
            if self.location.line + 1 < buf.line_count() {
                self.location = Position::new(self.location.line + 1, 0);
            }
        } else {
            let text = buf.line(self.location.line);
            self.location.column =
                word::next_word_start(&text, self.location.column).unwrap_or(len);
        }
        self.remember_column(buf, tab_size);
    }

    fn raw_line_start(&mut self, buf: &Buffer, tab_size: usize) {
        self.location.column = 0;
        self.remember_column(buf, tab_size);
    }

    fn raw_line_end(&mut self, buf: &Buffer, tab_size: usize) {
        self.location.column = buf.line_len(self.location.line);
        self.remember_column(buf, tab_size);
    }

    fn raw_document_start(&mut self, buf: &Buffer, tab_size: usize) {
        self.location = Position::origin();
        self.remember_column(buf, tab_size);
    }

    fn raw_document_end(&mut self, buf: &Buffer, tab_size: usize) {
        self.location = buf.end();
        self.remember_column(buf, tab_size);
    }

    fn raw_page(&mut self, buf: &Buffer, tab_size: usize, delta: isize) {
        let line = if delta < 0 {
            self.location.line.saturating_sub(delta.unsigned_abs())
        } else {
            (self.location.line + delta as usize).min(buf.line_count() - 1)
        };
        self.land_on(buf, tab_size, line);
    }
}

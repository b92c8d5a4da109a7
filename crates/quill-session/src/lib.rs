//! The editing session: single owner of the text store, journal, cursor,
//! and search state for one document.
//!
//! Every editing operation here routes buffer mutation through the journal
//! so it stays reversible, then repositions and re-clamps the cursor. The
//! session also owns the document's identity on disk (path + last known
//! modification time) and the reload-on-external-change flow, which goes
//! through `apply_diff` so a reload is itself one undo step.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

use quill_cursor::Cursor;
use quill_journal::EditJournal;
use quill_search::{Prompter, SearchState};
use quill_text::{Buffer, Position, end_of};

mod snapshot;
mod storage;

pub use snapshot::{SessionSnapshot, load_snapshot, save_snapshot, snapshot_path};
pub use storage::{FsStorage, Storage};

/// Collapse CRLF/CR to LF so `\n` is the only terminator in store.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

pub struct Session {
    pub buffer: Buffer,
    pub journal: EditJournal,
    pub cursor: Cursor,
    pub search: SearchState,
    pub path: Option<PathBuf>,
    pub mod_time: Option<SystemTime>,
    pub tab_size: usize,
}

impl Session {
    pub fn from_text(text: &str) -> Self {
        Self {
            buffer: Buffer::from_str(&normalize_line_endings(text)),
            journal: EditJournal::new(),
            cursor: Cursor::new(),
            search: SearchState::default(),
            path: None,
            mod_time: None,
            tab_size: 4,
        }
    }

    pub fn open(storage: &dyn Storage, path: &Path) -> Result<Self> {
        let text = storage.load(path)?;
        let mut session = Self::from_text(&text);
        session.path = Some(path.to_path_buf());
        session.mod_time = storage.mod_time(path);
        info!(
            target: "session.io",
            path = %path.display(),
            lines = session.buffer.line_count(),
            "document_opened"
        );
        Ok(session)
    }

    /// Coalescing window for the journal, from configuration.
    pub fn set_coalesce_window(&mut self, window: Duration) {
        let (undo, redo) = self.journal.history();
        let (undo, redo) = (undo.to_vec(), redo.to_vec());
        self.journal = EditJournal::with_window(window);
        self.journal.restore(undo, redo);
    }

    pub fn display_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    }

    pub fn is_modified(&self) -> bool {
        self.buffer.is_modified()
    }

    pub fn contents(&self) -> String {
        self.buffer.contents()
    }

    /// Place the cursor at a 1-based LINE,COL startup position, clamped.
    pub fn jump_to_start_position(&mut self, line: usize, column: usize) {
        let pos = Position::new(line.saturating_sub(1), column);
        self.cursor.move_to(&self.buffer, pos, self.tab_size);
    }

    // ---- persistence ----------------------------------------------------

    pub fn save(&mut self, storage: &dyn Storage) -> Result<()> {
        let Some(path) = self.path.clone() else {
            bail!("document has no path; use save_as");
        };
        self.save_as(storage, &path)
    }

    /// Write the document out. On failure the in-memory document (and its
    /// modified flag) is untouched.
    pub fn save_as(&mut self, storage: &dyn Storage, path: &Path) -> Result<()> {
        storage.save(path, &self.buffer.contents())?;
        self.path = Some(path.to_path_buf());
        self.buffer.set_modified(false);
        self.mod_time = storage.mod_time(path);
        info!(target: "session.io", path = %path.display(), "document_saved");
        Ok(())
    }

    /// Compare the on-disk modification time against the last one we saw.
    /// On mismatch, ask whether to reload: "yes" replays the disk content
    /// through the journal (undoable); "no" silently adopts the new
    /// timestamp, accepting a future overwrite. Returns whether a reload
    /// happened.
    pub fn check_external_modification(
        &mut self,
        storage: &dyn Storage,
        prompter: &mut dyn Prompter,
    ) -> Result<bool> {
        let Some(path) = self.path.clone() else {
            return Ok(false);
        };
        let Some(disk_time) = storage.mod_time(&path) else {
            return Ok(false);
        };
        if Some(disk_time) == self.mod_time {
            return Ok(false);
        }
        debug!(target: "session.io", path = %path.display(), "external_modification_detected");
        let reload = prompter
            .confirm("file changed since it was last read; reload? (y, n)")
            .unwrap_or(false);
        self.mod_time = Some(disk_time);
        if !reload {
            return Ok(false);
        }
        let text = normalize_line_endings(&storage.load(&path)?);
        self.reload_from(&text);
        Ok(true)
    }

    /// Adopt `text` as the document content via a journaled diff.
    pub fn reload_from(&mut self, text: &str) {
        self.journal.apply_diff(&mut self.buffer, text);
        self.buffer.set_modified(false);
        self.cursor.clamp(&self.buffer);
    }

    // ---- editing --------------------------------------------------------

    /// Insert at the cursor, replacing any live selection.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let start = match self.cursor.selection() {
            Some((start, end)) => {
                self.journal.begin_batch();
                self.journal.remove(&mut self.buffer, start, end);
                self.journal.insert(&mut self.buffer, start, text);
                self.journal.end_batch();
                start
            }
            None => {
                let pos = self.buffer.clamp(self.cursor.location);
                self.journal.insert(&mut self.buffer, pos, text);
                pos
            }
        };
        self.cursor
            .move_to(&self.buffer, end_of(start, text), self.tab_size);
    }

    pub fn insert_newline(&mut self) {
        self.insert_text("\n");
    }

    /// Delete the rune before the cursor, joining lines at column 0.
    pub fn backspace(&mut self) {
        if self.cursor.has_selection() {
            self.delete_selection();
            return;
        }
        let loc = self.buffer.clamp(self.cursor.location);
        if loc == Position::origin() {
            return;
        }
        let prev = if loc.column > 0 {
            Position::new(loc.line, loc.column - 1)
        } else {
            Position::new(loc.line - 1, self.buffer.line_len(loc.line - 1))
        };
        self.journal.remove(&mut self.buffer, prev, loc);
        self.cursor.move_to(&self.buffer, prev, self.tab_size);
    }

    /// Delete the rune under the cursor, joining at line ends.
    pub fn delete_forward(&mut self) {
        if self.cursor.has_selection() {
            self.delete_selection();
            return;
        }
        let loc = self.buffer.clamp(self.cursor.location);
        if loc == self.buffer.end() {
            return;
        }
        let next = if loc.column < self.buffer.line_len(loc.line) {
            Position::new(loc.line, loc.column + 1)
        } else {
            Position::new(loc.line + 1, 0)
        };
        self.journal.remove(&mut self.buffer, loc, next);
        self.cursor.move_to(&self.buffer, loc, self.tab_size);
    }

    /// Remove the live selection; callers check `has_selection` first.
    pub fn delete_selection(&mut self) {
        debug_assert!(
            self.cursor.has_selection(),
            "delete_selection requires a live selection"
        );
        let Some((start, end)) = self.cursor.selection() else {
            return;
        };
        self.journal.remove(&mut self.buffer, start, end);
        self.cursor.move_to(&self.buffer, start, self.tab_size);
    }

    /// Kill to end of line; at a line end, join with the next line.
    pub fn delete_to_line_end(&mut self) {
        let loc = self.buffer.clamp(self.cursor.location);
        let line_end = Position::new(loc.line, self.buffer.line_len(loc.line));
        let target = if loc == line_end {
            if loc.line + 1 >= self.buffer.line_count() {
                return;
            }
            Position::new(loc.line + 1, 0)
        } else {
            line_end
        };
        self.journal.remove(&mut self.buffer, loc, target);
        self.cursor.move_to(&self.buffer, loc, self.tab_size);
    }

    pub fn undo(&mut self) -> bool {
        match self.journal.undo(&mut self.buffer) {
            Some(pos) => {
                self.cursor.move_to(&self.buffer, pos, self.tab_size);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.journal.redo(&mut self.buffer) {
            Some(pos) => {
                self.cursor.move_to(&self.buffer, pos, self.tab_size);
                true
            }
            None => false,
        }
    }

    pub fn selected_text(&self) -> Option<String> {
        self.cursor
            .selection()
            .map(|(start, end)| self.buffer.slice(start, end))
    }

    /// Seed for an interactive search: the selected text, if any.
    pub fn search_seed(&self) -> String {
        self.selected_text().unwrap_or_default()
    }
}

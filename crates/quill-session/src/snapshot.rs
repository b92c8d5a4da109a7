//! Serialized session snapshots: undo history, cursor, and the document's
//! last known modification time, keyed by document path.
//!
//! The snapshot restores editing context across runs of the editor. Journal
//! entries round-trip exactly (kind, position, text, timestamp); a snapshot
//! is only adopted when the on-disk modification time still matches, since
//! replaying history against a different file would corrupt it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use quill_cursor::Cursor;
use quill_journal::UndoStep;

use crate::Session;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub undo: Vec<UndoStep>,
    pub redo: Vec<UndoStep>,
    pub cursor: Cursor,
    pub mod_time: Option<SystemTime>,
}

impl Session {
    pub fn snapshot(&self) -> SessionSnapshot {
        let (undo, redo) = self.journal.history();
        SessionSnapshot {
            undo: undo.to_vec(),
            redo: redo.to_vec(),
            cursor: self.cursor,
            mod_time: self.mod_time,
        }
    }

    /// Adopt a snapshot when it still describes the document on disk.
    /// Returns whether it was applied.
    pub fn restore_snapshot(&mut self, snapshot: SessionSnapshot) -> bool {
        if snapshot.mod_time != self.mod_time {
            debug!(target: "session.snapshot", "stale_snapshot_ignored");
            return false;
        }
        self.journal.restore(snapshot.undo, snapshot.redo);
        self.cursor = snapshot.cursor;
        self.cursor.clamp(&self.buffer);
        true
    }
}

/// Snapshot file for a document, inside the state directory.
pub fn snapshot_path(state_dir: &Path, doc_path: &Path) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    doc_path.hash(&mut hasher);
    state_dir.join(format!("{:016x}.json", hasher.finish()))
}

pub fn save_snapshot(state_dir: &Path, session: &Session) -> Result<()> {
    let Some(doc_path) = session.path.as_deref() else {
        return Ok(());
    };
    fs::create_dir_all(state_dir)
        .with_context(|| format!("creating {}", state_dir.display()))?;
    let file = snapshot_path(state_dir, doc_path);
    let json = serde_json::to_string(&session.snapshot())?;
    fs::write(&file, json).with_context(|| format!("writing {}", file.display()))?;
    debug!(target: "session.snapshot", file = %file.display(), "snapshot_saved");
    Ok(())
}

pub fn load_snapshot(state_dir: &Path, doc_path: &Path) -> Result<Option<SessionSnapshot>> {
    let file = snapshot_path(state_dir, doc_path);
    if !file.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
    Ok(Some(serde_json::from_str(&json)?))
}

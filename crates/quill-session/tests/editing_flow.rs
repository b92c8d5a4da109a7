//! Cross-crate flows: a session edited, searched, replaced, saved, and
//! reloaded end to end.

use std::fs;

use quill_search::{Direction, Prompter, begin_search, find_next, replace, search};
use quill_session::{FsStorage, Session, Storage, load_snapshot, save_snapshot};
use quill_text::Position;

/// Prompter with canned answers.
struct Canned {
    prompts: Vec<Option<String>>,
    confirms: Vec<Option<bool>>,
}

impl Canned {
    fn answering(prompts: Vec<Option<&str>>, confirms: Vec<Option<bool>>) -> Self {
        Self {
            prompts: prompts
                .into_iter()
                .map(|p| p.map(str::to_string))
                .collect(),
            confirms,
        }
    }
}

impl Prompter for Canned {
    fn prompt(&mut self, _label: &str, _default: &str) -> Option<String> {
        if self.prompts.is_empty() {
            None
        } else {
            self.prompts.remove(0)
        }
    }

    fn confirm(&mut self, _label: &str) -> Option<bool> {
        if self.confirms.is_empty() {
            None
        } else {
            self.confirms.remove(0)
        }
    }
}

#[test]
fn edit_search_replace_undo_flow() {
    let mut s = Session::from_text("");
    s.insert_text("fn main() {\n    println!(\"hi\");\n}\n");
    assert!(s.is_modified());

    // Search wraps from the cursor.
    begin_search(&mut s.search, &s.buffer, &s.cursor);
    assert!(search(
        &s.buffer,
        &mut s.cursor,
        &mut s.search,
        "println",
        Direction::Forward
    ));
    let (start, end) = s.cursor.selection().unwrap();
    assert_eq!(start, Position::new(1, 4));
    assert_eq!(end, Position::new(1, 11));

    // Replace every "hi" with "hello, world" in bulk.
    let mut prompter = Canned::answering(vec![Some("a")], vec![]);
    let count = replace(
        &mut s.buffer,
        &mut s.journal,
        &mut s.cursor,
        &mut s.search,
        "hi",
        "hello, world",
        &mut prompter,
    )
    .unwrap();
    assert_eq!(count, 1);
    assert!(s.contents().contains("hello, world"));

    // The whole history unwinds, then replays.
    while s.undo() {}
    assert_eq!(s.contents(), "");
    while s.redo() {}
    assert!(s.contents().contains("hello, world"));
}

#[test]
fn save_load_and_external_modification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");
    let storage = FsStorage;

    let mut s = Session::from_text("first version\n");
    s.save_as(&storage, &path).unwrap();
    assert!(!s.is_modified());

    // Nothing changed on disk: no prompt consumed, no reload.
    let mut prompter = Canned::answering(vec![], vec![Some(true)]);
    assert!(!s
        .check_external_modification(&storage, &mut prompter)
        .unwrap());

    // Another writer touches the file; declining the reload keeps our text
    // but adopts the on-disk timestamp. (Sleep keeps the mtimes distinct
    // even on coarse filesystem clocks.)
    std::thread::sleep(std::time::Duration::from_millis(20));
    fs::write(&path, "second version\n").unwrap();
    let new_time = storage.mod_time(&path);
    let mut decline = Canned::answering(vec![], vec![Some(false)]);
    assert!(!s.check_external_modification(&storage, &mut decline).unwrap());
    assert_eq!(s.contents(), "first version\n");
    assert_eq!(s.mod_time, new_time);

    // A further change, accepted this time: reload is undoable.
    std::thread::sleep(std::time::Duration::from_millis(20));
    fs::write(&path, "third version\n").unwrap();
    let mut accept = Canned::answering(vec![], vec![Some(true)]);
    assert!(s.check_external_modification(&storage, &mut accept).unwrap());
    assert_eq!(s.contents(), "third version\n");
    assert!(s.undo());
    assert_eq!(s.contents(), "first version\n");
}

#[test]
fn failed_save_leaves_document_intact() {
    let storage = FsStorage;
    let mut s = Session::from_text("unsaved work");
    s.insert_text("!");
    let missing_dir = std::path::Path::new("/nonexistent-quill-dir/doc.txt");
    assert!(s.save_as(&storage, missing_dir).is_err());
    assert_eq!(s.contents(), "!unsaved work");
    assert!(s.is_modified(), "modified flag survives a failed save");
    assert!(s.path.is_none(), "failed save does not adopt the path");
}

#[test]
fn snapshot_survives_disk_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let doc_path = dir.path().join("notes.txt");
    let state_dir = dir.path().join("state");
    let storage = FsStorage;

    let mut s = Session::from_text("");
    s.insert_text("draft one");
    s.save_as(&storage, &doc_path).unwrap();
    save_snapshot(&state_dir, &s).unwrap();

    // New process: open the file, restore history, undo the old edit.
    let mut revived = Session::open(&storage, &doc_path).unwrap();
    let snap = load_snapshot(&state_dir, &doc_path).unwrap().unwrap();
    assert!(revived.restore_snapshot(snap));
    assert!(revived.undo());
    assert_eq!(revived.contents(), "");
}

#[test]
fn find_next_walks_and_wraps_across_session() {
    let mut s = Session::from_text("foo bar foo");
    s.cursor.move_to(&s.buffer, Position::new(0, 3), s.tab_size);
    begin_search(&mut s.search, &s.buffer, &s.cursor);
    assert!(search(
        &s.buffer,
        &mut s.cursor,
        &mut s.search,
        "foo",
        Direction::Forward
    ));
    assert_eq!(
        s.cursor.selection().unwrap().0,
        Position::new(0, 8),
        "second occurrence first"
    );
    assert!(find_next(&s.buffer, &mut s.cursor, &mut s.search));
    assert_eq!(
        s.cursor.selection().unwrap().0,
        Position::new(0, 0),
        "wraps to the first"
    );
}

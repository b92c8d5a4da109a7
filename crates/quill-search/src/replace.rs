//! Interactive and bulk replace.
//!
//! The interactive loop walks matches forward one at a time, asking the
//! prompt layer for y/n/a/esc. Answering "all" switches to bulk mode: every
//! match is collected up front on the pre-edit text, then applied left to
//! right while a running adjustment tracks how far earlier replacements
//! have shifted later offsets. Collecting first avoids re-matching inside
//! just-inserted replacement text; the adjustment keeps each original
//! offset honest as the document changes under it.

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use quill_cursor::Cursor;
use quill_journal::EditJournal;
use quill_text::{Buffer, end_of};

use crate::search::{char_offset_of_byte, search};
use crate::{Direction, Prompter, SearchMode, SearchState};

/// Unlike interactive search, an explicit replace surfaces a bad pattern.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Run search-and-replace. Returns the number of replacements applied.
///
/// The replacement is inserted literally (no capture expansion). Each
/// confirmed replacement is one journal step; a bulk pass is a single step.
/// Canceling restores the cursor to the pending match's start and keeps
/// everything already applied.
pub fn replace(
    buf: &mut Buffer,
    journal: &mut EditJournal,
    cursor: &mut Cursor,
    state: &mut SearchState,
    pattern: &str,
    replacement: &str,
    prompter: &mut dyn Prompter,
) -> Result<usize, ReplaceError> {
    // Compiled up front so a malformed pattern aborts before any edit. The
    // (?m) flag gives ^/$ line-oriented meaning for both the interactive
    // walk and the bulk scan, so "all" replaces exactly what the walk
    // offered.
    let pattern = format!("(?m){pattern}");
    let bulk_re = Regex::new(&pattern)?;
    state.mode = SearchMode::Confirming;
    state.anchor = match cursor.selection() {
        Some((start, _)) => buf.to_offset(start),
        None => buf.to_offset(cursor.location),
    };

    let mut found = 0usize;
    let mut all = false;
    loop {
        if !search(buf, cursor, state, &pattern, Direction::Forward) {
            break;
        }
        let (sel_start, sel_end) = cursor.selection().expect("search sets a selection");
        let label = format!(
            "replace match at {}:{}? (y, n, a, esc)",
            sel_start.line + 1,
            sel_start.column + 1
        );
        match prompter.prompt(&label, "") {
            None => {
                cursor.location = sel_start;
                cursor.clear_selection();
                state.mode = SearchMode::Idle;
                debug!(target: "search.replace", found, "replace_canceled");
                return Ok(found);
            }
            Some(answer) => match answer.trim().chars().next() {
                Some('y') | Some('Y') => {
                    journal.replace(buf, sel_start, sel_end, replacement);
                    let end = end_of(sel_start, replacement);
                    cursor.location = end;
                    cursor.clear_selection();
                    state.anchor = buf.to_offset(end);
                    found += 1;
                }
                Some('a') | Some('A') => {
                    all = true;
                }
                _ => {
                    // Skip: continue from just after this match.
                    state.anchor = buf.to_offset(sel_end);
                }
            },
        }
        if all {
            break;
        }
    }

    if all {
        found += bulk_replace(buf, journal, cursor, &bulk_re, replacement);
    }
    state.mode = SearchMode::Idle;
    debug!(target: "search.replace", found, "replace_complete");
    Ok(found)
}

/// Replace every remaining match in one pass.
///
/// Matches are collected on the pre-edit text so their offsets are the
/// non-overlapping ones the pattern actually produced; each application
/// shifts later offsets by `len(replacement) - len(match)`, accumulated in
/// `adjust`.
fn bulk_replace(
    buf: &mut Buffer,
    journal: &mut EditJournal,
    cursor: &mut Cursor,
    re: &Regex,
    replacement: &str,
) -> usize {
    let text = buf.contents();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut converter = ByteToChar::new(&text);
    for m in re.find_iter(&text) {
        if m.start() >= m.end() {
            continue;
        }
        let cs = converter.char_at(m.start());
        let ce = converter.char_at(m.end());
        spans.push((cs, ce));
    }
    if spans.is_empty() {
        return 0;
    }
    trace!(target: "search.replace", matches = spans.len(), "bulk_pass");

    let rep_len = replacement.chars().count() as isize;
    journal.begin_batch();
    let mut adjust: isize = 0;
    for (cs, ce) in &spans {
        let start = (*cs as isize + adjust) as usize;
        let from = buf.from_offset(start);
        let to = buf.from_offset(start + (ce - cs));
        journal.replace(buf, from, to, replacement);
        adjust += rep_len - (ce - cs) as isize;
    }
    journal.end_batch();
    cursor.location = buf.end();
    cursor.clear_selection();
    spans.len()
}

/// Incremental byte→rune offset conversion for ascending byte positions.
struct ByteToChar<'a> {
    text: &'a str,
    byte: usize,
    chars: usize,
}

impl<'a> ByteToChar<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            byte: 0,
            chars: 0,
        }
    }

    fn char_at(&mut self, byte: usize) -> usize {
        debug_assert!(byte >= self.byte, "conversion positions must ascend");
        self.chars += char_offset_of_byte(&self.text[self.byte..], byte - self.byte);
        self.byte = byte;
        self.chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_text::Position;

    /// Prompter answering from a fixed script; `None` entries cancel.
    struct Script {
        answers: Vec<Option<&'static str>>,
        next: usize,
    }

    impl Script {
        fn new(answers: Vec<Option<&'static str>>) -> Self {
            Self { answers, next: 0 }
        }
    }

    impl Prompter for Script {
        fn prompt(&mut self, _label: &str, _default: &str) -> Option<String> {
            let answer = self.answers.get(self.next).cloned().unwrap_or(None);
            self.next += 1;
            answer.map(str::to_string)
        }

        fn confirm(&mut self, _label: &str) -> Option<bool> {
            None
        }
    }

    fn setup(text: &str) -> (Buffer, EditJournal, Cursor, SearchState) {
        (
            Buffer::from_str(text),
            EditJournal::new(),
            Cursor::new(),
            SearchState::default(),
        )
    }

    #[test]
    fn bulk_replace_tracks_offset_drift() {
        let (mut buf, mut journal, mut cursor, mut state) = setup("aXaXa");
        let mut prompter = Script::new(vec![Some("a")]);
        let count = replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "X",
            "YY",
            &mut prompter,
        )
        .unwrap();
        assert_eq!(buf.contents(), "aYYaYYa");
        assert_eq!(count, 2);
        assert_eq!(state.mode, SearchMode::Idle);
    }

    #[test]
    fn bulk_replace_is_one_undo_step() {
        let (mut buf, mut journal, mut cursor, mut state) = setup("aXaXa");
        let mut prompter = Script::new(vec![Some("a")]);
        replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "X",
            "YY",
            &mut prompter,
        )
        .unwrap();
        assert_eq!(journal.undo_depth(), 1);
        journal.undo(&mut buf);
        assert_eq!(buf.contents(), "aXaXa");
    }

    #[test]
    fn shrinking_replacement_drifts_left() {
        let (mut buf, mut journal, mut cursor, mut state) = setup("one match, two match");
        let mut prompter = Script::new(vec![Some("a")]);
        let count = replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "match",
            "m",
            &mut prompter,
        )
        .unwrap();
        assert_eq!(buf.contents(), "one m, two m");
        assert_eq!(count, 2);
    }

    #[test]
    fn interactive_yes_walks_each_match() {
        let (mut buf, mut journal, mut cursor, mut state) = setup("x.x.x");
        let mut prompter = Script::new(vec![Some("y"), Some("y"), Some("y")]);
        let count = replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "x",
            "z",
            &mut prompter,
        )
        .unwrap();
        assert_eq!(buf.contents(), "z.z.z");
        assert_eq!(count, 3);
    }

    #[test]
    fn replacement_containing_the_pattern_does_not_rematch() {
        // "x" -> "xx" must not recurse into freshly inserted text.
        let (mut buf, mut journal, mut cursor, mut state) = setup("x y x");
        let mut prompter = Script::new(vec![Some("y"), Some("y")]);
        let count = replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "x",
            "xx",
            &mut prompter,
        )
        .unwrap();
        assert_eq!(buf.contents(), "xx y xx");
        assert_eq!(count, 2);
    }

    #[test]
    fn skip_advances_past_the_match() {
        let (mut buf, mut journal, mut cursor, mut state) = setup("a a a");
        let mut prompter = Script::new(vec![Some("n"), Some("y"), Some("n")]);
        let count = replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "a",
            "b",
            &mut prompter,
        )
        .unwrap();
        assert_eq!(buf.contents(), "a b a");
        assert_eq!(count, 1);
    }

    #[test]
    fn cancel_restores_cursor_and_keeps_applied_edits() {
        let (mut buf, mut journal, mut cursor, mut state) = setup("a a");
        let mut prompter = Script::new(vec![Some("y"), None]);
        let count = replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "a",
            "b",
            &mut prompter,
        )
        .unwrap();
        assert_eq!(buf.contents(), "b a");
        assert_eq!(count, 1);
        assert!(!cursor.has_selection());
        assert_eq!(
            cursor.location,
            Position::new(0, 2),
            "cursor at the pending match's start"
        );
    }

    #[test]
    fn malformed_pattern_surfaces_before_any_edit() {
        let (mut buf, mut journal, mut cursor, mut state) = setup("abc");
        let mut prompter = Script::new(vec![]);
        let err = replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "(",
            "x",
            &mut prompter,
        );
        assert!(err.is_err());
        assert_eq!(buf.contents(), "abc", "document unchanged");
        assert_eq!(journal.undo_depth(), 0);
    }

    #[test]
    fn no_matches_reports_zero() {
        let (mut buf, mut journal, mut cursor, mut state) = setup("abc");
        let mut prompter = Script::new(vec![]);
        let count = replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "zzz",
            "x",
            &mut prompter,
        )
        .unwrap();
        assert_eq!(count, 0);
        assert_eq!(state.mode, SearchMode::Idle);
    }

    #[test]
    fn multiline_anchors_apply_in_bulk() {
        let (mut buf, mut journal, mut cursor, mut state) = setup("ab\nbc\nb");
        let mut prompter = Script::new(vec![Some("a")]);
        let count = replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "^b",
            "B",
            &mut prompter,
        )
        .unwrap();
        assert_eq!(buf.contents(), "ab\nBc\nB");
        assert_eq!(count, 2);
    }

    #[test]
    fn wide_rune_documents_replace_by_rune_offsets() {
        let (mut buf, mut journal, mut cursor, mut state) = setup("界X界X界");
        let mut prompter = Script::new(vec![Some("a")]);
        let count = replace(
            &mut buf,
            &mut journal,
            &mut cursor,
            &mut state,
            "X",
            "yy",
            &mut prompter,
        )
        .unwrap();
        assert_eq!(buf.contents(), "界yy界yy界");
        assert_eq!(count, 2);
    }
}

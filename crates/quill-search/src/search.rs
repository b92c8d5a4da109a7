//! Live search over the flattened document.

use regex::Regex;
use tracing::trace;

use quill_cursor::Cursor;
use quill_text::Buffer;

use crate::{Direction, SearchMode, SearchState};

/// Enter Interactive mode, anchoring just after the current selection (or
/// at the cursor). The caller owns the query editing; each query change
/// re-runs [`search`] from the same anchor.
pub fn begin_search(state: &mut SearchState, buf: &Buffer, cursor: &Cursor) {
    state.anchor = match cursor.selection() {
        Some((_, end)) => buf.to_offset(end),
        None => buf.to_offset(cursor.location),
    };
    state.mode = SearchMode::Interactive;
}

/// Commit the query to history and return to Idle. `last_pattern` stays so
/// [`find_next`] can repeat the search.
pub fn end_search(state: &mut SearchState, query: &str) {
    if !query.is_empty() {
        state.history.push(query.to_string());
    }
    state.mode = SearchMode::Idle;
}

/// Cancel the session: clears the active pattern and the selection.
pub fn exit_search(state: &mut SearchState, cursor: &mut Cursor) {
    state.last_pattern.clear();
    state.mode = SearchMode::Idle;
    cursor.clear_selection();
}

/// Search for `pattern` from the anchor. Scans the remainder of the
/// document in `direction`; when nothing matches there, wraps and scans the
/// whole document; when still nothing, clears the selection and leaves the
/// cursor in place.
///
/// A pattern that fails to compile is a silent no-op — mid-type queries are
/// routinely half-written regexes. Zero-length matches are skipped so an
/// empty-matching pattern can never pin the cursor in place. On success the
/// match span becomes the selection and `last_pattern` is updated.
pub fn search(
    buf: &Buffer,
    cursor: &mut Cursor,
    state: &mut SearchState,
    pattern: &str,
    direction: Direction,
) -> bool {
    if pattern.is_empty() {
        return false;
    }
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(err) => {
            trace!(target: "search", %err, "pattern_rejected");
            return false;
        }
    };
    let text = buf.contents();
    let anchor_byte = byte_of_char_offset(&text, state.anchor);
    let found = match direction {
        Direction::Forward => first_match(&re, &text[anchor_byte..])
            .map(|(s, e)| (anchor_byte + s, anchor_byte + e))
            .or_else(|| first_match(&re, &text)),
        Direction::Backward => {
            last_match(&re, &text[..anchor_byte]).or_else(|| last_match(&re, &text))
        }
    };
    match found {
        None => {
            cursor.clear_selection();
            false
        }
        Some((bs, be)) => {
            let cs = char_offset_of_byte(&text, bs);
            let ce = cs + text[bs..be].chars().count();
            cursor.set_selection(buf.from_offset(cs), buf.from_offset(ce));
            state.last_pattern = pattern.to_string();
            true
        }
    }
}

/// Repeat the last pattern forward from the selection edge (or cursor).
/// No-op when no prior search exists.
pub fn find_next(buf: &Buffer, cursor: &mut Cursor, state: &mut SearchState) -> bool {
    if state.last_pattern.is_empty() {
        return false;
    }
    state.anchor = match cursor.selection() {
        Some((_, end)) => buf.to_offset(end),
        None => buf.to_offset(cursor.location),
    };
    let pattern = state.last_pattern.clone();
    search(buf, cursor, state, &pattern, Direction::Forward)
}

/// Repeat the last pattern backward from the selection edge (or cursor).
pub fn find_previous(buf: &Buffer, cursor: &mut Cursor, state: &mut SearchState) -> bool {
    if state.last_pattern.is_empty() {
        return false;
    }
    state.anchor = match cursor.selection() {
        Some((start, _)) => buf.to_offset(start),
        None => buf.to_offset(cursor.location),
    };
    let pattern = state.last_pattern.clone();
    search(buf, cursor, state, &pattern, Direction::Backward)
}

fn first_match(re: &Regex, hay: &str) -> Option<(usize, usize)> {
    re.find_iter(hay)
        .find(|m| m.start() < m.end())
        .map(|m| (m.start(), m.end()))
}

fn last_match(re: &Regex, hay: &str) -> Option<(usize, usize)> {
    let mut last = None;
    for m in re.find_iter(hay) {
        if m.start() < m.end() {
            last = Some((m.start(), m.end()));
        }
    }
    last
}

pub(crate) fn byte_of_char_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

pub(crate) fn char_offset_of_byte(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

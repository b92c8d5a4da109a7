//! Word boundaries within a single line, for word-wise cursor motion.
//!
//! Segmentation follows UAX #29 via `unicode-segmentation`; whitespace
//! segments are not word starts. Columns are rune indices, so byte indices
//! from the segmenter are translated at the edges.

use unicode_segmentation::UnicodeSegmentation;

fn byte_of_column(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column)
        .map(|(b, _)| b)
        .unwrap_or(line.len())
}

fn column_of_byte(line: &str, byte: usize) -> usize {
    line[..byte].chars().count()
}

/// Rune column of the first word start strictly after `column`, if any.
pub fn next_word_start(line: &str, column: usize) -> Option<usize> {
    let from = byte_of_column(line, column);
    for (b, seg) in line.split_word_bound_indices() {
        if b > from && !seg.chars().all(char::is_whitespace) {
            return Some(column_of_byte(line, b));
        }
    }
    None
}

/// Rune column of the last word start strictly before `column`, if any.
pub fn prev_word_start(line: &str, column: usize) -> Option<usize> {
    let from = byte_of_column(line, column);
    let mut last = None;
    for (b, seg) in line.split_word_bound_indices() {
        if b >= from {
            break;
        }
        if !seg.chars().all(char::is_whitespace) {
            last = Some(b);
        }
    }
    last.map(|b| column_of_byte(line, b))
}

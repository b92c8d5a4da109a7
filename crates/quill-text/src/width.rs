//! Visual-column arithmetic: the single authority for how a line of runes
//! maps onto terminal cells.
//!
//! The forward walk ([`visual_col`]) and the inverse walk
//! ([`visual_to_column`]) accumulate width identically, so for any rune
//! column `c`, `visual_to_column(line, visual_col(line, c)) == Some((c, 0))`.
//! Rendering, cursor motion, and hit-testing all go through these functions;
//! no caller computes widths on its own.
//!
//! Width rules:
//! * a tab occupies `tab_size - (w % tab_size)` cells, where `w` is the
//!   visual column at which the tab starts;
//! * any other rune occupies its `unicode-width` display width — 1 for
//!   ordinary glyphs, 2 for wide glyphs;
//! * zero-width runes (combining marks) are given one cell so every rune
//!   owns at least one cell in the grid.

use unicode_width::UnicodeWidthChar;

/// Display width of a single non-tab rune. Never 0.
pub fn rune_width(ch: char) -> usize {
    match UnicodeWidthChar::width(ch) {
        Some(0) | None => 1,
        Some(w) => w,
    }
}

/// Cells from visual column `visual` to the next tab stop.
pub fn tab_stop(visual: usize, tab_size: usize) -> usize {
    let t = tab_size.max(1);
    t - (visual % t)
}

/// Width of the cell run a rune occupies when it starts at visual column
/// `visual`.
pub fn run_width(ch: char, visual: usize, tab_size: usize) -> usize {
    if ch == '\t' {
        tab_stop(visual, tab_size)
    } else {
        rune_width(ch)
    }
}

/// Visual column at which rune column `column` starts.
///
/// `column` past the end of the line yields the line's total width.
pub fn visual_col(line: &str, column: usize, tab_size: usize) -> usize {
    let mut w = 0;
    for ch in line.chars().take(column) {
        w += run_width(ch, w, tab_size);
    }
    w
}

/// Total visual width of a line.
pub fn line_width(line: &str, tab_size: usize) -> usize {
    visual_col(line, usize::MAX, tab_size)
}

/// Inverse mapping: the rune column whose cell run contains `visual`, plus
/// the offset of `visual` from that run's first cell.
///
/// Returns `None` when `visual` lies at or past the end of the rendered
/// line — the caller decides whether that means "end of line" (cursor
/// motion) or "nothing here" (layout).
pub fn visual_to_column(line: &str, visual: usize, tab_size: usize) -> Option<(usize, usize)> {
    let mut w = 0;
    for (col, ch) in line.chars().enumerate() {
        let rw = run_width(ch, w, tab_size);
        if visual < w + rw {
            return Some((col, visual - w));
        }
        w += rw;
    }
    None
}

/// Rune column for a target visual column, landing at the line end when the
/// target lies past it. Used by vertical cursor motion to honor the desired
/// visual column.
pub fn column_for_visual(line: &str, visual: usize, tab_size: usize) -> usize {
    match visual_to_column(line, visual, tab_size) {
        Some((col, _)) => col,
        None => line.chars().count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii() {
        assert_eq!(visual_col("abc", 0, 4), 0);
        assert_eq!(visual_col("abc", 2, 4), 2);
        assert_eq!(line_width("abc", 4), 3);
    }

    #[test]
    fn tab_expands_to_next_stop() {
        // "a\tb" at tab_size 4: a=0, tab covers 1..=3, b=4.
        assert_eq!(visual_col("a\tb", 1, 4), 1);
        assert_eq!(visual_col("a\tb", 2, 4), 4);
        assert_eq!(line_width("a\tb", 4), 5);
        // Tab at a stop boundary still advances a full stop.
        assert_eq!(line_width("\t", 4), 4);
        assert_eq!(line_width("abcd\t", 4), 8);
    }

    #[test]
    fn wide_glyphs_take_two_cells() {
        assert_eq!(rune_width('界'), 2);
        assert_eq!(line_width("a界b", 4), 4);
        assert_eq!(visual_col("a界b", 2, 4), 3);
    }

    #[test]
    fn combining_marks_get_one_cell() {
        assert_eq!(rune_width('\u{0301}'), 1);
    }

    #[test]
    fn inverse_inside_runs() {
        let line = "a\t界b";
        // Cells: a@0, tab@1..=3, 界@4..=5, b@6.
        assert_eq!(visual_to_column(line, 0, 4), Some((0, 0)));
        assert_eq!(visual_to_column(line, 1, 4), Some((1, 0)));
        assert_eq!(visual_to_column(line, 3, 4), Some((1, 2)));
        assert_eq!(visual_to_column(line, 5, 4), Some((2, 1)));
        assert_eq!(visual_to_column(line, 6, 4), Some((3, 0)));
        assert_eq!(visual_to_column(line, 7, 4), None);
    }

    #[test]
    fn forward_then_inverse_round_trips() {
        let line = "x\ty\t漢字 z";
        for (col, _) in line.chars().enumerate() {
            let v = visual_col(line, col, 8);
            assert_eq!(visual_to_column(line, v, 8), Some((col, 0)));
        }
    }

    #[test]
    fn column_for_visual_clamps_to_line_end() {
        assert_eq!(column_for_visual("ab", 10, 4), 2);
        assert_eq!(column_for_visual("a\tb", 2, 4), 1);
    }
}

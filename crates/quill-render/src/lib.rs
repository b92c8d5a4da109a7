//! Logical-to-visual rendering: turns a window of buffer lines into a grid
//! of display cells, recomputed every frame.
//!
//! A rune that spans several cells (a tab, a wide glyph) produces one head
//! cell carrying the glyph and the run width, followed by filler cells; all
//! cells of a run share one logical position so the inverse mapping can
//! attribute any of them back to a single rune. Horizontal scroll may enter
//! a line mid-run, in which case the run's remaining cells are still
//! emitted (a half-scrolled tab shows its trailing blanks, not a skipped
//! character).
//!
//! The inverse mapping itself lives in `quill_text::width`; this crate only
//! ever walks the same accumulation, so forward and inverse stay exact
//! inverses on every rendered row.

use bitflags::bitflags;

use quill_text::{Buffer, Position, width};

bitflags! {
    /// Per-cell style bits; the painter decides what they look like.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u8 {
        /// Inside the live selection (which is also the search match span).
        const SELECTED = 1;
    }
}

/// One terminal cell of a rendered frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    /// The (line, rune-column) this cell displays. Shared by every cell of
    /// a multi-cell run.
    pub logical: Position,
    /// What the painter draws here. Fillers and tab heads draw a blank.
    pub glyph: char,
    /// The rune this cell belongs to.
    pub source: char,
    pub flags: CellFlags,
    /// Width of the whole run on head cells; 1 on fillers.
    pub width: usize,
}

/// The window of the document a frame covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub top_line: usize,
    pub height: usize,
    pub left_col: usize,
    pub width: usize,
}

/// Frame-invariant layout inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutContext {
    pub tab_size: usize,
    /// Normalized half-open selection range, if any.
    pub selection: Option<(Position, Position)>,
}

/// A rendered frame: one cell row per visible source line. Rows are
/// truncated at the viewport width and never padded — the painter fills the
/// remainder with background.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub rows: Vec<Vec<Cell>>,
}

/// Lay out the viewport. Lines past the end of the buffer produce no rows.
pub fn layout(buf: &Buffer, vp: Viewport, ctx: &LayoutContext) -> Frame {
    let mut rows = Vec::new();
    for row in 0..vp.height {
        let line_idx = vp.top_line + row;
        if line_idx >= buf.line_count() {
            break;
        }
        rows.push(layout_line(&buf.line(line_idx), line_idx, row, vp, ctx));
    }
    Frame { rows }
}

fn layout_line(
    line: &str,
    line_idx: usize,
    row: usize,
    vp: Viewport,
    ctx: &LayoutContext,
) -> Vec<Cell> {
    let mut cells = Vec::new();
    if vp.width == 0 {
        return cells;
    }
    // Locate the rune whose cell run straddles the scroll offset; if the
    // offset lands inside the run, the head cells fall off-screen and only
    // the trailing part is emitted.
    let (start_column, start_offset) = match width::visual_to_column(line, vp.left_col, ctx.tab_size)
    {
        Some(pair) => pair,
        None => return cells,
    };
    let mut view_col = -(start_offset as isize);
    let mut column = start_column;
    for ch in line.chars().skip(start_column) {
        let run_start = (vp.left_col as isize + view_col) as usize;
        let rw = width::run_width(ch, run_start, ctx.tab_size);
        let logical = Position::new(line_idx, column);
        let flags = flags_for(ctx, logical);
        for i in 0..rw {
            let vc = view_col + i as isize;
            if vc < 0 {
                continue;
            }
            let vc = vc as usize;
            if vc >= vp.width {
                break;
            }
            let head = i == 0;
            cells.push(Cell {
                row,
                col: vc,
                logical,
                glyph: if head && ch != '\t' { ch } else { ' ' },
                source: ch,
                flags,
                width: if head { rw } else { 1 },
            });
        }
        view_col += rw as isize;
        column += 1;
        if view_col >= vp.width as isize {
            break;
        }
    }
    cells
}

fn flags_for(ctx: &LayoutContext, pos: Position) -> CellFlags {
    match ctx.selection {
        Some((start, end)) if start <= pos && pos < end => CellFlags::SELECTED,
        _ => CellFlags::empty(),
    }
}

/// Screen cell of a buffer position, when visible in the viewport.
pub fn cursor_cell(
    buf: &Buffer,
    pos: Position,
    vp: Viewport,
    tab_size: usize,
) -> Option<(usize, usize)> {
    if pos.line < vp.top_line {
        return None;
    }
    let row = pos.line - vp.top_line;
    if row >= vp.height {
        return None;
    }
    let v = width::visual_col(&buf.line(pos.line), pos.column, tab_size);
    if v < vp.left_col {
        return None;
    }
    let col = v - vp.left_col;
    (col < vp.width).then_some((row, col))
}

/// Hit-test: the logical position under a screen cell (clamped into the
/// document). Shared by click placement and horizontal scroll computation.
pub fn locate(buf: &Buffer, vp: Viewport, tab_size: usize, row: usize, col: usize) -> Position {
    let line = (vp.top_line + row).min(buf.line_count() - 1);
    let text = buf.line(line);
    Position::new(
        line,
        width::column_for_visual(&text, vp.left_col + col, tab_size),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vp(top: usize, height: usize, left: usize, width_: usize) -> Viewport {
        Viewport {
            top_line: top,
            height,
            left_col: left,
            width: width_,
        }
    }

    fn ctx(tab_size: usize) -> LayoutContext {
        LayoutContext {
            tab_size,
            selection: None,
        }
    }

    #[test]
    fn tab_expansion_cell_counts() {
        // "a\tb" at tab_size 4 from column 0: a@0, tab run 1..=3, b@4.
        let buf = Buffer::from_str("a\tb");
        let frame = layout(&buf, vp(0, 1, 0, 80), &ctx(4));
        let row = &frame.rows[0];
        assert_eq!(row.len(), 5, "3 runes, 5 cells");
        assert_eq!(row[0].glyph, 'a');
        assert_eq!(row[0].width, 1);
        assert_eq!(row[1].source, '\t');
        assert_eq!(row[1].glyph, ' ');
        assert_eq!(row[1].width, 3, "head cell carries the run width");
        assert_eq!(row[2].width, 1);
        assert_eq!(row[3].logical, Position::new(0, 1));
        assert_eq!(row[4].glyph, 'b');
        assert_eq!(row[4].col, 4);
        assert_eq!(row[4].logical, Position::new(0, 2));
    }

    #[test]
    fn wide_glyph_filler_shares_logical_position() {
        let buf = Buffer::from_str("界x");
        let frame = layout(&buf, vp(0, 1, 0, 80), &ctx(4));
        let row = &frame.rows[0];
        assert_eq!(row.len(), 3);
        assert_eq!(row[0].glyph, '界');
        assert_eq!(row[0].width, 2);
        assert_eq!(row[1].glyph, ' ');
        assert_eq!(row[1].source, '界');
        assert_eq!(row[1].logical, row[0].logical);
        assert_eq!(row[2].glyph, 'x');
    }

    #[test]
    fn scroll_into_tab_emits_trailing_blanks() {
        // Cells: a@0, tab 1..=3, b@4. Scrolled to left_col 2, the tab's
        // remaining two cells appear first, not a skipped rune.
        let buf = Buffer::from_str("a\tb");
        let frame = layout(&buf, vp(0, 1, 2, 80), &ctx(4));
        let row = &frame.rows[0];
        assert_eq!(row.len(), 3);
        assert_eq!(row[0].source, '\t');
        assert_eq!(row[0].width, 1, "mid-run entry has no head cell");
        assert_eq!(row[0].logical, Position::new(0, 1));
        assert_eq!(row[1].source, '\t');
        assert_eq!(row[2].glyph, 'b');
        assert_eq!(row[2].col, 2);
    }

    #[test]
    fn scroll_into_wide_glyph() {
        let buf = Buffer::from_str("界x");
        let frame = layout(&buf, vp(0, 1, 1, 80), &ctx(4));
        let row = &frame.rows[0];
        assert_eq!(row[0].source, '界');
        assert_eq!(row[0].glyph, ' ', "half-scrolled glyph shows its blank");
        assert_eq!(row[1].glyph, 'x');
    }

    #[test]
    fn rows_truncate_at_width_and_height() {
        let buf = Buffer::from_str("abcdef\nshort\nthird\nfourth");
        let frame = layout(&buf, vp(0, 2, 0, 3), &ctx(4));
        assert_eq!(frame.rows.len(), 2, "height bounds the rows");
        assert_eq!(frame.rows[0].len(), 3, "width bounds the cells");
        assert_eq!(frame.rows[1].len(), 3);
    }

    #[test]
    fn short_lines_yield_short_rows() {
        let buf = Buffer::from_str("ab");
        let frame = layout(&buf, vp(0, 5, 0, 80), &ctx(4));
        assert_eq!(frame.rows.len(), 1, "no rows past the buffer");
        assert_eq!(frame.rows[0].len(), 2, "no trailing padding");
    }

    #[test]
    fn scroll_past_line_end_yields_empty_row() {
        let buf = Buffer::from_str("ab\nlonger line");
        let frame = layout(&buf, vp(0, 2, 5, 80), &ctx(4));
        assert!(frame.rows[0].is_empty());
        assert!(!frame.rows[1].is_empty());
    }

    #[test]
    fn selection_flags_cover_half_open_range() {
        let buf = Buffer::from_str("abcd");
        let context = LayoutContext {
            tab_size: 4,
            selection: Some((Position::new(0, 1), Position::new(0, 3))),
        };
        let frame = layout(&buf, vp(0, 1, 0, 80), &context);
        let row = &frame.rows[0];
        assert!(!row[0].flags.contains(CellFlags::SELECTED));
        assert!(row[1].flags.contains(CellFlags::SELECTED));
        assert!(row[2].flags.contains(CellFlags::SELECTED));
        assert!(!row[3].flags.contains(CellFlags::SELECTED), "end exclusive");
    }

    #[test]
    fn cursor_cell_accounts_for_tabs_and_scroll() {
        let buf = Buffer::from_str("a\tb");
        assert_eq!(
            cursor_cell(&buf, Position::new(0, 2), vp(0, 1, 0, 80), 4),
            Some((0, 4))
        );
        assert_eq!(
            cursor_cell(&buf, Position::new(0, 2), vp(0, 1, 2, 80), 4),
            Some((0, 2))
        );
        assert_eq!(
            cursor_cell(&buf, Position::new(0, 0), vp(0, 1, 2, 80), 4),
            None,
            "scrolled off to the left"
        );
        assert_eq!(
            cursor_cell(&buf, Position::new(0, 0), vp(1, 1, 0, 80), 4),
            None,
            "above the viewport"
        );
    }

    #[test]
    fn locate_inverts_cursor_cell() {
        let buf = Buffer::from_str("a\t界b\nnext");
        let viewport = vp(0, 2, 0, 80);
        for column in 0..=buf.line_len(0) {
            let pos = Position::new(0, column);
            if let Some((row, col)) = cursor_cell(&buf, pos, viewport, 4) {
                assert_eq!(locate(&buf, viewport, 4, row, col), pos);
            }
        }
    }

    #[test]
    fn locate_clamps_outside_content() {
        let buf = Buffer::from_str("ab\ncd");
        assert_eq!(locate(&buf, vp(0, 10, 0, 80), 4, 7, 0), Position::new(1, 0));
        assert_eq!(locate(&buf, vp(0, 10, 0, 80), 4, 0, 50), Position::new(0, 2));
    }
}

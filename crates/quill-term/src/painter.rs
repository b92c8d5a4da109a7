//! Frame and prompt painting.
//!
//! The painter writes whole rows left to right. A wide head glyph already
//! advances the terminal pen over its filler cells, so fillers that the pen
//! has passed are skipped; tab fillers (and fillers orphaned by a mid-run
//! horizontal scroll) still print their blank.

use anyhow::Result;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{Clear, ClearType};
use std::io::{self, Write};

use quill_render::{CellFlags, Frame};
use quill_text::width::rune_width;

/// Paint a full frame: text rows, reverse-video status line, hardware
/// cursor placement.
pub fn paint_frame(
    frame: &Frame,
    cursor: Option<(usize, usize)>,
    status: &str,
    size: (u16, u16),
) -> Result<()> {
    let (w, h) = size;
    if w == 0 || h == 0 {
        return Ok(());
    }
    let mut out = io::stdout();
    queue!(out, Hide)?;
    let text_rows = h.saturating_sub(1) as usize;
    for row in 0..text_rows {
        queue!(out, MoveTo(0, row as u16), Clear(ClearType::CurrentLine))?;
        let Some(cells) = frame.rows.get(row) else {
            continue;
        };
        let mut selected = false;
        let mut pen = 0usize;
        for cell in cells {
            if cell.col < pen {
                continue;
            }
            let wants = cell.flags.contains(CellFlags::SELECTED);
            if wants != selected {
                queue!(
                    out,
                    SetAttribute(if wants {
                        Attribute::Reverse
                    } else {
                        Attribute::NoReverse
                    })
                )?;
                selected = wants;
            }
            let glyph_width = rune_width(cell.glyph);
            // A wide glyph whose second cell was clipped at the right edge
            // paints a blank instead of overflowing the row.
            if cell.col + glyph_width > w as usize {
                queue!(out, Print(' '))?;
                pen = cell.col + 1;
            } else {
                queue!(out, Print(cell.glyph))?;
                pen = cell.col + glyph_width;
            }
        }
        if selected {
            queue!(out, SetAttribute(Attribute::NoReverse))?;
        }
    }

    let mut line = truncate_cells(status, w as usize);
    let used: usize = line.chars().map(rune_width).sum();
    line.extend(std::iter::repeat_n(' ', (w as usize).saturating_sub(used)));
    queue!(
        out,
        MoveTo(0, h - 1),
        Clear(ClearType::CurrentLine),
        SetAttribute(Attribute::Reverse),
        Print(line),
        SetAttribute(Attribute::NoReverse)
    )?;

    if let Some((row, col)) = cursor
        && row < text_rows
        && (col as u16) < w
    {
        queue!(out, MoveTo(col as u16, row as u16), Show)?;
    }
    out.flush()?;
    Ok(())
}

/// Paint the prompt line over the status row, leaving the terminal cursor
/// after the input.
pub fn paint_prompt(label: &str, input: &str, size: (u16, u16)) -> Result<()> {
    let (w, h) = size;
    if w == 0 || h == 0 {
        return Ok(());
    }
    let mut out = io::stdout();
    let text = truncate_cells(&format!("{label} {input}"), w as usize);
    queue!(
        out,
        MoveTo(0, h - 1),
        Clear(ClearType::CurrentLine),
        Print(text),
        Show
    )?;
    out.flush()?;
    Ok(())
}

fn truncate_cells(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut result = String::new();
    for ch in text.chars() {
        let cw = rune_width(ch);
        if used + cw > width {
            break;
        }
        used += cw;
        result.push(ch);
    }
    result
}

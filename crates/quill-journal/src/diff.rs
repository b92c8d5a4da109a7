//! Line-level edit script between two documents, expressed as rune-offset
//! edits into the old text.
//!
//! Used by `apply_diff` when a file changed on disk and the user reloads:
//! the script is applied left-to-right through the journal so the reload is
//! itself reversible. Matching runs on whole lines via a longest common
//! subsequence; documents too large for the quadratic table fall back to a
//! single whole-document replacement, which is still correct, just coarser.

/// Replace old runes `[old_start, old_end)` with `replacement`. Offsets are
/// rune counts into the *old* text; edits are disjoint and ascending.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct CharEdit {
    pub old_start: usize,
    pub old_end: usize,
    pub replacement: String,
}

/// A maximal run of non-matching lines: old lines `[i, j)` replaced by new
/// lines `[p, q)`.
#[derive(Debug, Clone, Copy)]
struct Region {
    i: usize,
    j: usize,
    p: usize,
    q: usize,
}

/// LCS table cells beyond this are not worth the memory; one coarse region
/// covers the whole document instead.
const LCS_CELL_LIMIT: usize = 1 << 22;

pub(crate) fn char_edits(old: &str, new: &str) -> Vec<CharEdit> {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();

    let regions = if old_lines.len().saturating_mul(new_lines.len()) > LCS_CELL_LIMIT {
        vec![Region {
            i: 0,
            j: old_lines.len(),
            p: 0,
            q: new_lines.len(),
        }]
    } else {
        lcs_regions(&old_lines, &new_lines)
    };

    let old_starts = line_start_offsets(&old_lines);
    let old_total = old.chars().count();

    regions
        .into_iter()
        .map(|r| region_to_edit(r, &old_lines, &new_lines, &old_starts, old_total))
        .collect()
}

/// Rune offset of each line start in the joined text.
fn line_start_offsets(lines: &[&str]) -> Vec<usize> {
    let mut starts = Vec::with_capacity(lines.len());
    let mut off = 0;
    for l in lines {
        starts.push(off);
        off += l.chars().count() + 1;
    }
    starts
}

/// Convert a line region into a rune-offset edit.
///
/// Lines followed by kept lines own their trailing terminator, so interior
/// regions replace whole `line + '\n'` blocks. Regions touching the final
/// line need the terminator handled explicitly: a pure deletion through the
/// end also eats the terminator *before* the block, and a pure insertion
/// past the end supplies a leading one.
fn region_to_edit(
    r: Region,
    old_lines: &[&str],
    new_lines: &[&str],
    old_starts: &[usize],
    old_total: usize,
) -> CharEdit {
    let old_len = old_lines.len();
    if r.j < old_len {
        let mut replacement = String::new();
        for l in &new_lines[r.p..r.q] {
            replacement.push_str(l);
            replacement.push('\n');
        }
        CharEdit {
            old_start: old_starts[r.i],
            old_end: old_starts[r.j],
            replacement,
        }
    } else if r.p == r.q {
        let old_start = if r.i > 0 { old_starts[r.i] - 1 } else { 0 };
        CharEdit {
            old_start,
            old_end: old_total,
            replacement: String::new(),
        }
    } else if r.i < old_len {
        CharEdit {
            old_start: old_starts[r.i],
            old_end: old_total,
            replacement: new_lines[r.p..r.q].join("\n"),
        }
    } else {
        let mut replacement = String::from("\n");
        replacement.push_str(&new_lines[r.p..r.q].join("\n"));
        CharEdit {
            old_start: old_total,
            old_end: old_total,
            replacement,
        }
    }
}

/// Longest-common-subsequence walk over lines, emitting maximal change
/// regions. `dp[i][j]` holds the LCS length of `old[i..]` and `new[j..]`.
fn lcs_regions(old: &[&str], new: &[&str]) -> Vec<Region> {
    let n = old.len();
    let m = new.len();
    let stride = m + 1;
    let mut dp = vec![0u32; (n + 1) * stride];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i * stride + j] = if old[i] == new[j] {
                dp[(i + 1) * stride + j + 1] + 1
            } else {
                dp[(i + 1) * stride + j].max(dp[i * stride + j + 1])
            };
        }
    }

    let mut regions = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    let mut open: Option<(usize, usize)> = None;
    while i < n && j < m {
        if old[i] == new[j] {
            if let Some((ci, cp)) = open.take() {
                regions.push(Region {
                    i: ci,
                    j: i,
                    p: cp,
                    q: j,
                });
            }
            i += 1;
            j += 1;
        } else {
            if open.is_none() {
                open = Some((i, j));
            }
            if dp[(i + 1) * stride + j] >= dp[i * stride + j + 1] {
                i += 1;
            } else {
                j += 1;
            }
        }
    }
    if i < n || j < m {
        let (ci, cp) = open.take().unwrap_or((i, j));
        regions.push(Region {
            i: ci,
            j: n,
            p: cp,
            q: m,
        });
    } else if let Some((ci, cp)) = open.take() {
        regions.push(Region {
            i: ci,
            j: i,
            p: cp,
            q: j,
        });
    }
    regions
}

//! Line-level diffing for mutation evidence and rollback previews.
//!
//! Longest-common-subsequence over lines, rendered as a unified diff.
//! LOC deltas come from the real edit script, never from estimates.

/// Added/removed line counts for one file change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub lines_added: usize,
    pub lines_removed: usize,
}

impl DiffStats {
    /// Total lines touched: the "LOC changed" figure used for budgeting.
    pub fn loc_changed(&self) -> usize {
        self.lines_added + self.lines_removed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op<'a> {
    Equal(&'a str),
    Delete(&'a str),
    Insert(&'a str),
}

fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = content.split('\n').collect();
    // A trailing newline yields a phantom empty last element; drop it so
    // "a\n" is one line, not two.
    if content.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// Edit script between two line slices.
///
/// Common prefix and suffix are stripped before the O(n·m) LCS table is
/// built, which keeps the table small for the typical recipe edit (a few
/// changed lines in a large file).
fn edit_script<'a>(before: &[&'a str], after: &[&'a str]) -> Vec<Op<'a>> {
    let common_prefix = before
        .iter()
        .zip(after.iter())
        .take_while(|(b, a)| b == a)
        .count();
    let common_suffix = before[common_prefix..]
        .iter()
        .rev()
        .zip(after[common_prefix..].iter().rev())
        .take_while(|(b, a)| b == a)
        .count();

    let b = &before[common_prefix..before.len() - common_suffix];
    let a = &after[common_prefix..after.len() - common_suffix];

    let mut ops = Vec::with_capacity(before.len().max(after.len()));
    ops.extend(before[..common_prefix].iter().map(|l| Op::Equal(*l)));
    ops.extend(middle_ops(b, a));
    ops.extend(
        before[before.len() - common_suffix..]
            .iter()
            .map(|l| Op::Equal(*l)),
    );
    ops
}

/// Upper bound on the LCS table; beyond it the middle section degrades to
/// whole-block delete+insert rather than allocating gigabytes.
const MAX_LCS_CELLS: usize = 4_000_000;

/// LCS dynamic program over the trimmed middle section.
fn middle_ops<'a>(before: &[&'a str], after: &[&'a str]) -> Vec<Op<'a>> {
    let n = before.len();
    let m = after.len();
    if n == 0 {
        return after.iter().map(|l| Op::Insert(*l)).collect();
    }
    if m == 0 {
        return before.iter().map(|l| Op::Delete(*l)).collect();
    }
    if n * m > MAX_LCS_CELLS {
        let mut ops: Vec<Op<'a>> = before.iter().map(|l| Op::Delete(*l)).collect();
        ops.extend(after.iter().map(|l| Op::Insert(*l)));
        return ops;
    }

    // lcs[i][j] = LCS length of before[i..] and after[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if before[i] == after[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if before[i] == after[j] {
            ops.push(Op::Equal(before[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(Op::Delete(before[i]));
            i += 1;
        } else {
            ops.push(Op::Insert(after[j]));
            j += 1;
        }
    }
    ops.extend(before[i..].iter().map(|l| Op::Delete(*l)));
    ops.extend(after[j..].iter().map(|l| Op::Insert(*l)));
    ops
}

/// Line counts actually added/removed between two contents.
pub fn diff_stats(before: &str, after: &str) -> DiffStats {
    let ops = edit_script(&split_lines(before), &split_lines(after));
    let mut stats = DiffStats::default();
    for op in &ops {
        match op {
            Op::Insert(_) => stats.lines_added += 1,
            Op::Delete(_) => stats.lines_removed += 1,
            Op::Equal(_) => {}
        }
    }
    stats
}

const HUNK_CONTEXT: usize = 3;

/// Render a unified diff (`--- a/path`, `+++ b/path`, `@@` hunks with three
/// lines of context). Returns an empty string when the contents are equal.
pub fn unified_diff(path: &str, before: &str, after: &str) -> String {
    let before_lines = split_lines(before);
    let after_lines = split_lines(after);
    let ops = edit_script(&before_lines, &after_lines);
    if !ops
        .iter()
        .any(|op| matches!(op, Op::Insert(_) | Op::Delete(_)))
    {
        return String::new();
    }

    // Line numbers per op, tracked as we walk the script.
    let mut hunks: Vec<String> = Vec::new();
    let mut idx = 0;
    let mut before_line = 1usize;
    let mut after_line = 1usize;

    while idx < ops.len() {
        // Skip the equal run before the next change.
        let mut equal_run = 0;
        while idx + equal_run < ops.len() && matches!(ops[idx + equal_run], Op::Equal(_)) {
            equal_run += 1;
        }
        if idx + equal_run >= ops.len() {
            break;
        }
        let lead_context = equal_run.min(HUNK_CONTEXT);
        let skipped = equal_run - lead_context;
        before_line += skipped;
        after_line += skipped;
        idx += skipped;

        // Collect one hunk: changes plus interior equal runs shorter than
        // 2×context, ending after trailing context.
        let hunk_start = idx;
        let mut cursor = idx + lead_context;
        loop {
            // consume the change run
            while cursor < ops.len() && !matches!(ops[cursor], Op::Equal(_)) {
                cursor += 1;
            }
            // measure the following equal run
            let mut eq = 0;
            while cursor + eq < ops.len() && matches!(ops[cursor + eq], Op::Equal(_)) {
                eq += 1;
            }
            if cursor + eq >= ops.len() || eq > 2 * HUNK_CONTEXT {
                cursor += eq.min(HUNK_CONTEXT);
                break;
            }
            cursor += eq;
        }

        let hunk_ops = &ops[hunk_start..cursor];
        let old_start = before_line;
        let new_start = after_line;
        let mut old_count = 0;
        let mut new_count = 0;
        let mut body = String::new();
        for op in hunk_ops {
            match op {
                Op::Equal(l) => {
                    body.push_str(&format!(" {l}\n"));
                    old_count += 1;
                    new_count += 1;
                }
                Op::Delete(l) => {
                    body.push_str(&format!("-{l}\n"));
                    old_count += 1;
                }
                Op::Insert(l) => {
                    body.push_str(&format!("+{l}\n"));
                    new_count += 1;
                }
            }
        }
        before_line += old_count;
        after_line += new_count;
        idx = cursor;

        hunks.push(format!(
            "@@ -{old_start},{old_count} +{new_start},{new_count} @@\n{body}"
        ));
    }

    format!("--- a/{path}\n+++ b/{path}\n{}", hunks.concat())
}

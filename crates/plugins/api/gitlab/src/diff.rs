//! Unified diff parsing.
//!
//! GitLab returns each file's changes as the hunk part of a unified diff.
//! Parsing assigns every line its old and new line numbers so inline
//! comments can be checked against lines that actually exist.

use std::sync::LazyLock;

use regex::Regex;
use tracklens_core::{DiffHunk, DiffLine, LineKind};

static HUNK_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap());

/// Header numbers; `None` when a number does not fit in `u32`.
fn parse_header(caps: &regex::Captures<'_>) -> Option<(u32, u32, u32, u32)> {
    let number = |index: usize, default: u32| match caps.get(index) {
        Some(m) => m.as_str().parse::<u32>().ok(),
        None => Some(default),
    };
    Some((number(1, 0)?, number(2, 1)?, number(3, 0)?, number(4, 1)?))
}

/// Parse the hunks of a unified diff.
///
/// Lines before the first hunk header are ignored, as are
/// `\ No newline at end of file` markers. A header whose numbers overflow
/// `u32` is rejected, and lines up to the next valid header are dropped.
/// Line numbers past `u32::MAX` are left unset.
pub fn parse_unified_diff(text: &str) -> Vec<DiffHunk> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut in_hunk = false;
    // Lines consumed on each side of the current hunk
    let mut old_seen: u32 = 0;
    let mut new_seen: u32 = 0;

    for raw in text.lines() {
        if let Some(caps) = HUNK_HEADER.captures(raw) {
            in_hunk = false;
            let Some((old_start, old_count, new_start, new_count)) = parse_header(&caps) else {
                continue;
            };
            hunks.push(DiffHunk {
                header: raw.to_string(),
                old_start,
                old_count,
                new_start,
                new_count,
                lines: Vec::new(),
            });
            in_hunk = true;
            old_seen = 0;
            new_seen = 0;
            continue;
        }

        if !in_hunk || raw.starts_with('\\') {
            continue;
        }
        let Some(hunk) = hunks.last_mut() else {
            continue;
        };

        let line = if let Some(text) = raw.strip_prefix('+') {
            let line = DiffLine {
                kind: LineKind::Add,
                old_line: None,
                new_line: hunk.new_start.checked_add(new_seen),
                text: text.to_string(),
            };
            new_seen = new_seen.saturating_add(1);
            line
        } else if let Some(text) = raw.strip_prefix('-') {
            let line = DiffLine {
                kind: LineKind::Remove,
                old_line: hunk.old_start.checked_add(old_seen),
                new_line: None,
                text: text.to_string(),
            };
            old_seen = old_seen.saturating_add(1);
            line
        } else {
            let line = DiffLine {
                kind: LineKind::Context,
                old_line: hunk.old_start.checked_add(old_seen),
                new_line: hunk.new_start.checked_add(new_seen),
                text: raw.strip_prefix(' ').unwrap_or(raw).to_string(),
            };
            old_seen = old_seen.saturating_add(1);
            new_seen = new_seen.saturating_add(1);
            line
        };
        hunk.lines.push(line);
    }

    hunks
}

/// Added and removed line counts across hunks.
pub fn count_changes(hunks: &[DiffHunk]) -> (usize, usize) {
    hunks
        .iter()
        .flat_map(|h| &h.lines)
        .fold((0, 0), |(add, del), line| match line.kind {
            LineKind::Add => (add + 1, del),
            LineKind::Remove => (add, del + 1),
            LineKind::Context => (add, del),
        })
}

//! Single-cell table normalization
//!
//! A one-row, one-column table is easy to misread: `| A |` without a
//! delimiter is just a paragraph, and a paragraph written directly under the
//! table is absorbed as a second row. Such tables are rewritten as
//!
//! ```text
//! | A |
//! |---|
//! ```
//!
//! followed by a blank line. Wider or taller tables are left alone.

use super::postprocess::FenceTracker;
use once_cell::sync::Lazy;
use regex::Regex;

/// One cell: no unescaped pipe between the outer pipes.
static SINGLE_CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|((?:[^|\\]|\\.)*)\|\s*$").unwrap());
static SINGLE_DELIMITER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|\s*:?-+:?\s*\|\s*$").unwrap());

pub fn normalize_tables(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut tracker = FenceTracker::default();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let outside = tracker.is_outside(line);
        let starts_block = out.last().map_or(true, |prev| prev.trim().is_empty());

        if outside && starts_block {
            if let Some(caps) = SINGLE_CELL_RE.captures(line) {
                let has_delimiter = lines
                    .get(i + 1)
                    .is_some_and(|next| SINGLE_DELIMITER_RE.is_match(next));
                let after = if has_delimiter { i + 2 } else { i + 1 };
                let follower = lines.get(after).copied();
                let single_row = match follower {
                    None => true,
                    Some(next) if next.trim().is_empty() => true,
                    // a paragraph under a real table would become a row
                    Some(next) => has_delimiter && !next.trim_start().starts_with('|'),
                };

                if single_row {
                    out.push(format!("| {} |", caps[1].trim()));
                    out.push("|---|".to_string());
                    if follower.is_some_and(|next| !next.trim().is_empty()) {
                        out.push(String::new());
                    }
                    i = after;
                    continue;
                }
            }
        }

        out.push(line.to_string());
        i += 1;
    }
    out.join("\n")
}

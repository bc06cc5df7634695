//! String passes over emitted Markdown
//!
//! These run on the emitter's output in a fixed order. Every pass that looks at
//! line syntax skips the inside of fenced code blocks.

use super::table;
use crate::markers;
use tracing::trace;

/// Run every string pass and finish with exactly one trailing newline.
pub fn finish(markdown: &str) -> String {
    let text = strip_blank_lines_before_fence_close(markdown);
    let text = strip_leading_blank_lines(&text);
    let text = markers::reveal(&text);
    trace!("post: markers revealed");
    let text = table::normalize_tables(&text);
    trace!("post: tables normalized");

    let text = text.trim_end_matches(['\n', ' ']);
    if text.is_empty() {
        String::new()
    } else {
        format!("{text}\n")
    }
}

/// Tracks whether a line sits inside a fenced code block.
///
/// Quote markers and indentation in front of a fence are ignored, so fences
/// inside blockquotes and list items are recognised too.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FenceLine {
    Outside,
    Opening,
    Inside,
    Closing,
}

impl FenceTracker {
    pub fn observe(&mut self, line: &str) -> FenceLine {
        let body = line.trim_start_matches([' ', '\t', '>']);
        match self.open {
            Some((fence, len)) => {
                let run = body.chars().take_while(|c| *c == fence).count();
                if run >= len && body[run * fence.len_utf8()..].trim().is_empty() {
                    self.open = None;
                    FenceLine::Closing
                } else {
                    FenceLine::Inside
                }
            }
            None => {
                let Some(fence @ ('`' | '~')) = body.chars().next() else {
                    return FenceLine::Outside;
                };
                let run = body.chars().take_while(|c| *c == fence).count();
                let info = &body[run..];
                if run < 3 || (fence == '`' && info.contains('`')) {
                    return FenceLine::Outside;
                }
                self.open = Some((fence, run));
                FenceLine::Opening
            }
        }
    }

    /// Whether `line` is syntax to rewrite rather than code.
    pub fn is_outside(&mut self, line: &str) -> bool {
        self.observe(line) == FenceLine::Outside
    }
}

fn is_blank(line: &str) -> bool {
    line.trim_start_matches([' ', '\t', '>']).is_empty()
}

/// Drop blank lines that sit directly before a closing fence.
pub fn strip_blank_lines_before_fence_close(text: &str) -> String {
    let mut tracker = FenceTracker::default();
    let mut out: Vec<&str> = Vec::new();
    let mut opened_at = 0;
    for line in text.lines() {
        match tracker.observe(line) {
            FenceLine::Opening => opened_at = out.len() + 1,
            FenceLine::Closing => {
                while out.len() > opened_at && out.last().is_some_and(|l| is_blank(l)) {
                    out.pop();
                }
            }
            FenceLine::Inside | FenceLine::Outside => {}
        }
        out.push(line);
    }
    out.join("\n")
}

pub fn strip_leading_blank_lines(text: &str) -> String {
    let mut lines = text.lines().skip_while(|line| line.trim().is_empty());
    let mut out = String::new();
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        out.push_str(line);
    }
    out
}

//! Invisible marker codec
//!
//! Dates, statuses and decisions have no Markdown syntax. While rendering they
//! are carried through the Markdown emitter as text wrapped in reserved
//! zero-width code points, then revealed as readable code-span content:
//!
//! | Marker   | Invisible form                  | Visible form           |
//! |----------|---------------------------------|------------------------|
//! | date     | `U+200B iso U+200B`             | `[date]2024-01-15`     |
//! | status   | `U+200C code U+200D text U+200C` | `[status:g]Done`       |
//! | decision | `U+200E code U+200F text U+200E` | `[decision:d]Ship it`  |
//!
//! Each category owns its own pair of code points, so markers never nest or
//! collide. Payloads are [`sanitize`]d before encoding: any reserved code point
//! inside user text is dropped.

use crate::adf::{DecisionState, StatusColor};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const DATE: char = '\u{200B}';
const STATUS_OPEN: char = '\u{200C}';
const STATUS_SEP: char = '\u{200D}';
const DECISION_OPEN: char = '\u{200E}';
const DECISION_SEP: char = '\u{200F}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Date(String),
    Status { color: StatusColor, text: String },
    Decision { state: DecisionState, text: String },
}

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x{200B}([^\x{200B}-\x{200F}]*)\x{200B}").unwrap());
static STATUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x{200C}([nrbgypt])\x{200D}([^\x{200B}-\x{200F}]*)\x{200C}").unwrap()
});
static DECISION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x{200E}([dau])\x{200F}([^\x{200B}-\x{200F}]*)\x{200E}").unwrap()
});

static VISIBLE_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[date\](\d{4}-\d{2}-\d{2})$").unwrap());
static VISIBLE_STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[status:([nrbgypt])\](.*)$").unwrap());
static VISIBLE_DECISION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[decision:([dau])\](.*)$").unwrap());

/// Whether `c` belongs to the reserved marker range.
pub fn is_reserved(c: char) -> bool {
    ('\u{200B}'..='\u{200F}').contains(&c)
}

/// Remove every reserved code point from `text`.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| !is_reserved(*c)).collect()
}

/// Encode a marker into its invisible form.
pub fn encode(marker: &Marker) -> String {
    match marker {
        Marker::Date(iso) => format!("{DATE}{}{DATE}", sanitize(iso)),
        Marker::Status { color, text } => format!(
            "{STATUS_OPEN}{}{STATUS_SEP}{}{STATUS_OPEN}",
            color.code(),
            sanitize(text)
        ),
        Marker::Decision { state, text } => format!(
            "{DECISION_OPEN}{}{DECISION_SEP}{}{DECISION_OPEN}",
            state.code(),
            sanitize(text)
        ),
    }
}

/// Decode a string that consists of exactly one invisible marker.
pub fn decode(text: &str) -> Option<Marker> {
    if let Some(payload) = text
        .strip_prefix(DATE)
        .and_then(|rest| rest.strip_suffix(DATE))
    {
        return (!payload.contains(is_reserved)).then(|| Marker::Date(payload.to_string()));
    }

    if let Some(caps) = STATUS_RE.captures(text) {
        if caps.get(0).map(|m| m.as_str().len()) == Some(text.len()) {
            let color = StatusColor::from_code(first_char(&caps[1])?)?;
            return Some(Marker::Status {
                color,
                text: caps[2].to_string(),
            });
        }
    }

    if let Some(caps) = DECISION_RE.captures(text) {
        if caps.get(0).map(|m| m.as_str().len()) == Some(text.len()) {
            let state = DecisionState::from_code(first_char(&caps[1])?)?;
            return Some(Marker::Decision {
                state,
                text: caps[2].to_string(),
            });
        }
    }

    None
}

/// Rewrite every invisible marker in `text` into its visible form.
pub fn reveal(text: &str) -> String {
    let text = STATUS_RE.replace_all(text, |caps: &Captures| {
        format!("[status:{}]{}", &caps[1], &caps[2])
    });
    let text = DATE_RE.replace_all(&text, |caps: &Captures| format!("[date]{}", &caps[1]));
    let text = DECISION_RE.replace_all(&text, |caps: &Captures| {
        format!("[decision:{}]{}", &caps[1], &caps[2])
    });
    text.into_owned()
}

/// Recognise the visible form of a marker (the full content of a code span).
pub fn parse_visible(text: &str) -> Option<Marker> {
    if let Some(caps) = VISIBLE_DATE_RE.captures(text) {
        return Some(Marker::Date(caps[1].to_string()));
    }
    if let Some(caps) = VISIBLE_STATUS_RE.captures(text) {
        return Some(Marker::Status {
            color: StatusColor::from_code(first_char(&caps[1])?)?,
            text: caps[2].to_string(),
        });
    }
    if let Some(caps) = VISIBLE_DECISION_RE.captures(text) {
        return Some(Marker::Decision {
            state: DecisionState::from_code(first_char(&caps[1])?)?,
            text: caps[2].to_string(),
        });
    }
    None
}

fn first_char(s: &str) -> Option<char> {
    s.chars().next()
}

//! Core data structures for ADF documents.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// The root of an ADF document (`{"type": "doc", "version": 1, ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "super::json::RawDocument", into = "super::json::RawDocument")]
pub struct Document {
    pub version: u32,
    pub content: Vec<Node>,
}

impl Document {
    pub fn new(content: Vec<Node>) -> Self {
        Document {
            version: 1,
            content,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

/// A single ADF node.
///
/// Block kinds own block children, except paragraph-like kinds (paragraph,
/// heading, decision and task items) which own inline children. Inline kinds
/// own no children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "super::json::RawNode", into = "super::json::RawNode")]
pub enum Node {
    Paragraph {
        content: Vec<Node>,
    },
    Heading {
        level: u8,
        content: Vec<Node>,
    },
    BulletList {
        content: Vec<Node>,
    },
    /// `order` is the first number of the list; `None` when the attribute is absent.
    OrderedList {
        order: Option<u32>,
        content: Vec<Node>,
    },
    ListItem {
        content: Vec<Node>,
    },
    TaskList {
        content: Vec<Node>,
    },
    TaskItem {
        checked: bool,
        content: Vec<Node>,
    },
    /// Code blocks hold their source as text children.
    CodeBlock {
        language: Option<String>,
        content: Vec<Node>,
    },
    Blockquote {
        content: Vec<Node>,
    },
    Panel {
        kind: PanelKind,
        content: Vec<Node>,
    },
    Table {
        content: Vec<Node>,
    },
    TableRow {
        content: Vec<Node>,
    },
    TableHeader {
        content: Vec<Node>,
    },
    TableCell {
        content: Vec<Node>,
    },
    Rule,
    Text {
        text: String,
        marks: Vec<Mark>,
    },
    HardBreak,
    MediaSingle {
        content: Vec<Node>,
    },
    MediaGroup {
        content: Vec<Node>,
    },
    Media {
        id: Option<String>,
        alt: Option<String>,
    },
    Mention {
        id: String,
        text: String,
    },
    Status {
        color: StatusColor,
        text: String,
    },
    /// `timestamp` is the raw millisecond epoch string carried by ADF.
    Date {
        timestamp: Option<String>,
    },
    DecisionList {
        content: Vec<Node>,
    },
    DecisionItem {
        state: DecisionState,
        content: Vec<Node>,
    },
    Emoji {
        short_name: String,
        text: Option<String>,
    },
    InlineCard {
        url: String,
    },
    /// Any node kind not modelled above. Attributes are not retained.
    Unsupported {
        node_type: String,
        text: Option<String>,
        content: Vec<Node>,
    },
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text {
            text: text.into(),
            marks: normalize_marks(marks),
        }
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Node::Paragraph { content }
    }

    /// The ADF `type` string of this node.
    pub fn type_name(&self) -> &str {
        match self {
            Node::Paragraph { .. } => "paragraph",
            Node::Heading { .. } => "heading",
            Node::BulletList { .. } => "bulletList",
            Node::OrderedList { .. } => "orderedList",
            Node::ListItem { .. } => "listItem",
            Node::TaskList { .. } => "taskList",
            Node::TaskItem { .. } => "taskItem",
            Node::CodeBlock { .. } => "codeBlock",
            Node::Blockquote { .. } => "blockquote",
            Node::Panel { .. } => "panel",
            Node::Table { .. } => "table",
            Node::TableRow { .. } => "tableRow",
            Node::TableHeader { .. } => "tableHeader",
            Node::TableCell { .. } => "tableCell",
            Node::Rule => "rule",
            Node::Text { .. } => "text",
            Node::HardBreak => "hardBreak",
            Node::MediaSingle { .. } => "mediaSingle",
            Node::MediaGroup { .. } => "mediaGroup",
            Node::Media { .. } => "media",
            Node::Mention { .. } => "mention",
            Node::Status { .. } => "status",
            Node::Date { .. } => "date",
            Node::DecisionList { .. } => "decisionList",
            Node::DecisionItem { .. } => "decisionItem",
            Node::Emoji { .. } => "emoji",
            Node::InlineCard { .. } => "inlineCard",
            Node::Unsupported { node_type, .. } => node_type,
        }
    }

    /// Whether this node lives inside paragraph-like content.
    pub fn is_inline(&self) -> bool {
        match self {
            Node::Text { .. }
            | Node::HardBreak
            | Node::Mention { .. }
            | Node::Status { .. }
            | Node::Date { .. }
            | Node::Emoji { .. }
            | Node::InlineCard { .. } => true,
            Node::Unsupported { text, content, .. } => text.is_some() && content.is_empty(),
            _ => false,
        }
    }

    /// Child nodes, if this kind owns any.
    pub fn children(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Paragraph { content }
            | Node::Heading { content, .. }
            | Node::BulletList { content }
            | Node::OrderedList { content, .. }
            | Node::ListItem { content }
            | Node::TaskList { content }
            | Node::TaskItem { content, .. }
            | Node::CodeBlock { content, .. }
            | Node::Blockquote { content }
            | Node::Panel { content, .. }
            | Node::Table { content }
            | Node::TableRow { content }
            | Node::TableHeader { content }
            | Node::TableCell { content }
            | Node::MediaSingle { content }
            | Node::MediaGroup { content }
            | Node::DecisionList { content }
            | Node::DecisionItem { content, .. }
            | Node::Unsupported { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Paragraph { content }
            | Node::Heading { content, .. }
            | Node::BulletList { content }
            | Node::OrderedList { content, .. }
            | Node::ListItem { content }
            | Node::TaskList { content }
            | Node::TaskItem { content, .. }
            | Node::CodeBlock { content, .. }
            | Node::Blockquote { content }
            | Node::Panel { content, .. }
            | Node::Table { content }
            | Node::TableRow { content }
            | Node::TableHeader { content }
            | Node::TableCell { content }
            | Node::MediaSingle { content }
            | Node::MediaGroup { content }
            | Node::DecisionList { content }
            | Node::DecisionItem { content, .. }
            | Node::Unsupported { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Concatenated visible text of this node and its descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text { text, .. } => out.push_str(text),
            Node::HardBreak => out.push('\n'),
            Node::Mention { text, .. } => out.push_str(text),
            Node::Status { text, .. } => out.push_str(text),
            Node::Emoji { short_name, text } => {
                out.push_str(text.as_deref().unwrap_or(short_name));
            }
            Node::InlineCard { url } => out.push_str(url),
            Node::Date { timestamp } => {
                if let Some(iso) = timestamp.as_deref().and_then(timestamp_to_iso) {
                    out.push_str(&iso);
                }
            }
            Node::Unsupported {
                text: Some(text), ..
            } => out.push_str(text),
            _ => {
                if let Some(children) = self.children() {
                    for child in children {
                        child.collect_text(out);
                    }
                }
            }
        }
    }
}

/// Text formatting marks.
///
/// Declaration order is the rendering priority: a link wraps everything, code
/// is always innermost.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mark {
    Link { href: String },
    Strong,
    Em,
    Strike,
    Code,
}

impl Mark {
    pub fn rank(&self) -> u8 {
        match self {
            Mark::Link { .. } => 0,
            Mark::Strong => 1,
            Mark::Em => 2,
            Mark::Strike => 3,
            Mark::Code => 4,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Mark::Link { .. } => "link",
            Mark::Strong => "strong",
            Mark::Em => "em",
            Mark::Strike => "strike",
            Mark::Code => "code",
        }
    }

    pub fn same_kind(&self, other: &Mark) -> bool {
        self.rank() == other.rank()
    }
}

/// Deduplicate marks by kind (first occurrence wins) and sort them by priority.
pub fn normalize_marks(marks: Vec<Mark>) -> Vec<Mark> {
    let mut out: Vec<Mark> = Vec::with_capacity(marks.len());
    for mark in marks {
        if !out.iter().any(|m| m.same_kind(&mark)) {
            out.push(mark);
        }
    }
    out.sort_by_key(Mark::rank);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelKind {
    #[default]
    Info,
    Success,
    Note,
    Warning,
    Error,
}

impl PanelKind {
    pub const ALL: [PanelKind; 5] = [
        PanelKind::Info,
        PanelKind::Success,
        PanelKind::Note,
        PanelKind::Warning,
        PanelKind::Error,
    ];

    /// Unknown panel types fall back to `info`.
    pub fn from_attr(value: &str) -> Self {
        match value {
            "success" => PanelKind::Success,
            "note" => PanelKind::Note,
            "warning" => PanelKind::Warning,
            "error" => PanelKind::Error,
            _ => PanelKind::Info,
        }
    }

    pub fn as_attr(&self) -> &'static str {
        match self {
            PanelKind::Info => "info",
            PanelKind::Success => "success",
            PanelKind::Note => "note",
            PanelKind::Warning => "warning",
            PanelKind::Error => "error",
        }
    }

    /// GitHub alert keyword used in `> [!KEYWORD]`.
    pub fn alert(&self) -> &'static str {
        match self {
            PanelKind::Info => "NOTE",
            PanelKind::Success => "TIP",
            PanelKind::Note => "IMPORTANT",
            PanelKind::Warning => "WARNING",
            PanelKind::Error => "CAUTION",
        }
    }

    pub fn from_alert(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "NOTE" => Some(PanelKind::Info),
            "TIP" => Some(PanelKind::Success),
            "IMPORTANT" => Some(PanelKind::Note),
            "WARNING" => Some(PanelKind::Warning),
            "CAUTION" => Some(PanelKind::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusColor {
    #[default]
    Neutral,
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Teal,
}

impl StatusColor {
    pub const ALL: [StatusColor; 7] = [
        StatusColor::Neutral,
        StatusColor::Red,
        StatusColor::Blue,
        StatusColor::Green,
        StatusColor::Yellow,
        StatusColor::Purple,
        StatusColor::Teal,
    ];

    /// Unknown colors fall back to `neutral`.
    pub fn from_attr(value: &str) -> Self {
        match value {
            "red" => StatusColor::Red,
            "blue" => StatusColor::Blue,
            "green" => StatusColor::Green,
            "yellow" => StatusColor::Yellow,
            "purple" => StatusColor::Purple,
            "teal" => StatusColor::Teal,
            _ => StatusColor::Neutral,
        }
    }

    pub fn as_attr(&self) -> &'static str {
        match self {
            StatusColor::Neutral => "neutral",
            StatusColor::Red => "red",
            StatusColor::Blue => "blue",
            StatusColor::Green => "green",
            StatusColor::Yellow => "yellow",
            StatusColor::Purple => "purple",
            StatusColor::Teal => "teal",
        }
    }

    pub fn code(&self) -> char {
        match self {
            StatusColor::Neutral => 'n',
            StatusColor::Red => 'r',
            StatusColor::Blue => 'b',
            StatusColor::Green => 'g',
            StatusColor::Yellow => 'y',
            StatusColor::Purple => 'p',
            StatusColor::Teal => 't',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|color| color.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecisionState {
    #[default]
    Decided,
    Acknowledged,
    Undiscussed,
}

impl DecisionState {
    pub const ALL: [DecisionState; 3] = [
        DecisionState::Decided,
        DecisionState::Acknowledged,
        DecisionState::Undiscussed,
    ];

    /// Unknown states fall back to `DECIDED`.
    pub fn from_attr(value: &str) -> Self {
        match value {
            "ACKNOWLEDGED" => DecisionState::Acknowledged,
            "UP_FOR_DISCUSSION" => DecisionState::Undiscussed,
            _ => DecisionState::Decided,
        }
    }

    pub fn as_attr(&self) -> &'static str {
        match self {
            DecisionState::Decided => "DECIDED",
            DecisionState::Acknowledged => "ACKNOWLEDGED",
            DecisionState::Undiscussed => "UP_FOR_DISCUSSION",
        }
    }

    pub fn code(&self) -> char {
        match self {
            DecisionState::Decided => 'd',
            DecisionState::Acknowledged => 'a',
            DecisionState::Undiscussed => 'u',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.code() == code)
    }
}

/// Convert an ADF millisecond timestamp into a UTC `YYYY-MM-DD` date.
///
/// Returns `None` when the value is not an integer or is out of range.
pub fn timestamp_to_iso(timestamp: &str) -> Option<String> {
    let millis: i64 = timestamp.trim().parse().ok()?;
    let datetime = DateTime::from_timestamp_millis(millis)?;
    Some(datetime.format("%Y-%m-%d").to_string())
}

/// Convert a `YYYY-MM-DD` date into the ADF timestamp of its UTC midnight.
pub fn iso_to_timestamp(iso: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(midnight.timestamp_millis().to_string())
}

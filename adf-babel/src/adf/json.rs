//! ADF JSON wire shape
//!
//! [`RawNode`] mirrors the generic `{type, attrs, content, text, marks}` object
//! every ADF node is serialized as. The typed [`Node`] converts from and into it,
//! so `serde_json` handles a [`Document`] directly.

use super::nodes::{
    normalize_marks, DecisionState, Document, Mark, Node, PanelKind, StatusColor,
};
use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(rename = "type", default = "doc_type")]
    doc_type: String,
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    content: Vec<Node>,
}

fn doc_type() -> String {
    "doc".to_string()
}

fn default_version() -> u32 {
    1
}

impl TryFrom<RawDocument> for Document {
    type Error = String;

    fn try_from(raw: RawDocument) -> Result<Self, Self::Error> {
        if raw.doc_type != "doc" {
            return Err(format!(
                "expected a 'doc' node at the root, found '{}'",
                raw.doc_type
            ));
        }
        Ok(Document {
            version: raw.version,
            content: raw.content,
        })
    }
}

impl From<Document> for RawDocument {
    fn from(doc: Document) -> Self {
        RawDocument {
            doc_type: doc_type(),
            version: doc.version,
            content: doc.content,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<Vec<RawNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    marks: Option<Vec<RawMark>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMark {
    #[serde(rename = "type")]
    mark_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<Map<String, Value>>,
}

impl RawNode {
    fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.as_ref().and_then(|attrs| attrs.get(key))
    }

    /// String attribute; numbers are accepted and stringified.
    fn attr_str(&self, key: &str) -> Option<String> {
        match self.attr(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn attr_u64(&self, key: &str) -> Option<u64> {
        match self.attr(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn take_children(&mut self) -> Vec<Node> {
        self.content
            .take()
            .unwrap_or_default()
            .into_iter()
            .map(Node::from)
            .collect()
    }
}

impl From<RawNode> for Node {
    fn from(mut raw: RawNode) -> Self {
        match raw.node_type.as_str() {
            "paragraph" => Node::Paragraph {
                content: raw.take_children(),
            },
            "heading" => Node::Heading {
                level: raw.attr_u64("level").unwrap_or(1).clamp(1, 6) as u8,
                content: raw.take_children(),
            },
            "bulletList" => Node::BulletList {
                content: raw.take_children(),
            },
            "orderedList" => Node::OrderedList {
                order: raw
                    .attr_u64("order")
                    .map(|n| u32::try_from(n).unwrap_or(u32::MAX)),
                content: raw.take_children(),
            },
            "listItem" => Node::ListItem {
                content: raw.take_children(),
            },
            "taskList" => Node::TaskList {
                content: raw.take_children(),
            },
            "taskItem" => Node::TaskItem {
                checked: raw.attr_str("state").as_deref() == Some("DONE"),
                content: raw.take_children(),
            },
            "codeBlock" => Node::CodeBlock {
                language: raw.attr_str("language").filter(|l| !l.is_empty()),
                content: raw.take_children(),
            },
            "blockquote" => Node::Blockquote {
                content: raw.take_children(),
            },
            "panel" => Node::Panel {
                kind: PanelKind::from_attr(raw.attr_str("panelType").as_deref().unwrap_or("")),
                content: raw.take_children(),
            },
            "table" => Node::Table {
                content: raw.take_children(),
            },
            "tableRow" => Node::TableRow {
                content: raw.take_children(),
            },
            "tableHeader" => Node::TableHeader {
                content: raw.take_children(),
            },
            "tableCell" => Node::TableCell {
                content: raw.take_children(),
            },
            "rule" => Node::Rule,
            "text" => {
                let marks = raw
                    .marks
                    .take()
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(mark_from_raw)
                    .collect();
                Node::marked(raw.text.take().unwrap_or_default(), marks)
            }
            "hardBreak" => Node::HardBreak,
            "mediaSingle" => Node::MediaSingle {
                content: raw.take_children(),
            },
            "mediaGroup" => Node::MediaGroup {
                content: raw.take_children(),
            },
            "media" => Node::Media {
                id: raw.attr_str("id").filter(|s| !s.is_empty()),
                alt: raw.attr_str("alt").filter(|s| !s.is_empty()),
            },
            "mention" => Node::Mention {
                id: raw.attr_str("id").unwrap_or_default(),
                text: raw
                    .attr_str("text")
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| raw.attr_str("displayName"))
                    .unwrap_or_default(),
            },
            "status" => Node::Status {
                color: StatusColor::from_attr(raw.attr_str("color").as_deref().unwrap_or("")),
                text: raw.attr_str("text").unwrap_or_default(),
            },
            "date" => Node::Date {
                timestamp: raw.attr_str("timestamp").filter(|s| !s.is_empty()),
            },
            "decisionList" => Node::DecisionList {
                content: raw.take_children(),
            },
            "decisionItem" => Node::DecisionItem {
                state: DecisionState::from_attr(raw.attr_str("state").as_deref().unwrap_or("")),
                content: raw.take_children(),
            },
            "emoji" => Node::Emoji {
                short_name: raw.attr_str("shortName").unwrap_or_default(),
                text: raw.attr_str("text").filter(|s| !s.is_empty()),
            },
            "inlineCard" => Node::InlineCard {
                url: raw.attr_str("url").unwrap_or_default(),
            },
            other => {
                debug!(node_type = other, "keeping unsupported ADF node");
                Node::Unsupported {
                    node_type: other.to_string(),
                    text: raw.text.take(),
                    content: raw.take_children(),
                }
            }
        }
    }
}

fn mark_from_raw(raw: RawMark) -> Option<Mark> {
    match raw.mark_type.as_str() {
        "strong" => Some(Mark::Strong),
        "em" => Some(Mark::Em),
        "code" => Some(Mark::Code),
        "strike" => Some(Mark::Strike),
        "link" => {
            let href = raw
                .attrs
                .as_ref()
                .and_then(|attrs| attrs.get("href"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(Mark::Link { href })
        }
        other => {
            debug!(mark_type = other, "dropping unsupported ADF mark");
            None
        }
    }
}

fn mark_to_raw(mark: Mark) -> RawMark {
    let mark_type = mark.type_name().to_string();
    let attrs = match mark {
        Mark::Link { href } => Some(attrs([("href", Value::String(href))])),
        _ => None,
    };
    RawMark { mark_type, attrs }
}

fn attrs<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn raw(node_type: &str) -> RawNode {
    RawNode {
        node_type: node_type.to_string(),
        ..RawNode::default()
    }
}

fn container(node_type: &str, content: Vec<Node>) -> RawNode {
    RawNode {
        content: Some(content.into_iter().map(RawNode::from).collect()),
        ..raw(node_type)
    }
}

fn with_attrs(mut node: RawNode, map: Map<String, Value>) -> RawNode {
    node.attrs = Some(map);
    node
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        match node {
            Node::Heading { level, content } => with_attrs(
                container("heading", content),
                attrs([("level", Value::from(level))]),
            ),
            Node::OrderedList { order, content } => {
                let node = container("orderedList", content);
                match order {
                    Some(order) => with_attrs(node, attrs([("order", Value::from(order))])),
                    None => node,
                }
            }
            Node::TaskList { content } => with_attrs(
                container("taskList", content),
                attrs([("localId", Value::from(""))]),
            ),
            Node::TaskItem { checked, content } => with_attrs(
                container("taskItem", content),
                attrs([
                    ("localId", Value::from("")),
                    ("state", Value::from(if checked { "DONE" } else { "TODO" })),
                ]),
            ),
            Node::CodeBlock { language, content } => {
                let node = container("codeBlock", content);
                match language {
                    Some(language) => with_attrs(node, attrs([("language", Value::from(language))])),
                    None => node,
                }
            }
            Node::Panel { kind, content } => with_attrs(
                container("panel", content),
                attrs([("panelType", Value::from(kind.as_attr()))]),
            ),
            Node::Text { text, marks } => RawNode {
                text: Some(text),
                marks: if marks.is_empty() {
                    None
                } else {
                    Some(marks.into_iter().map(mark_to_raw).collect())
                },
                ..raw("text")
            },
            Node::Media { id, alt } => {
                let mut map = attrs([("type", Value::from("file"))]);
                if let Some(id) = id {
                    map.insert("id".to_string(), Value::from(id));
                }
                if let Some(alt) = alt {
                    map.insert("alt".to_string(), Value::from(alt));
                }
                with_attrs(raw("media"), map)
            }
            Node::Mention { id, text } => with_attrs(
                raw("mention"),
                attrs([("id", Value::from(id)), ("text", Value::from(text))]),
            ),
            Node::Status { color, text } => with_attrs(
                raw("status"),
                attrs([
                    ("text", Value::from(text)),
                    ("color", Value::from(color.as_attr())),
                ]),
            ),
            Node::Date { timestamp } => match timestamp {
                Some(ts) => with_attrs(raw("date"), attrs([("timestamp", Value::from(ts))])),
                None => raw("date"),
            },
            Node::DecisionList { content } => with_attrs(
                container("decisionList", content),
                attrs([("localId", Value::from(""))]),
            ),
            Node::DecisionItem { state, content } => with_attrs(
                container("decisionItem", content),
                attrs([
                    ("localId", Value::from("")),
                    ("state", Value::from(state.as_attr())),
                ]),
            ),
            Node::Emoji { short_name, text } => {
                let mut map = attrs([("shortName", Value::from(short_name))]);
                if let Some(text) = text {
                    map.insert("text".to_string(), Value::from(text));
                }
                with_attrs(raw("emoji"), map)
            }
            Node::InlineCard { url } => {
                with_attrs(raw("inlineCard"), attrs([("url", Value::from(url))]))
            }
            Node::Unsupported {
                node_type,
                text,
                content,
            } => RawNode {
                text,
                content: if content.is_empty() {
                    None
                } else {
                    Some(content.into_iter().map(RawNode::from).collect())
                },
                ..raw(&node_type)
            },
            Node::Rule => raw("rule"),
            Node::HardBreak => raw("hardBreak"),
            other => {
                let node_type = other.type_name().to_string();
                let content = match other.children() {
                    Some(children) => children.clone(),
                    None => Vec::new(),
                };
                container(&node_type, content)
            }
        }
    }
}

/// Parse ADF JSON text into a [`Document`].
pub fn from_json(source: &str) -> Result<Document, FormatError> {
    let doc: Document = serde_json::from_str(source)?;
    Ok(doc)
}

/// Serialize a [`Document`] as pretty-printed ADF JSON.
pub fn to_json(doc: &Document) -> Result<String, FormatError> {
    let mut text = serde_json::to_string_pretty(doc)?;
    text.push('\n');
    Ok(text)
}

//! Tree passes run before Markdown emission
//!
//! Each pass rewrites ADF node lists into a shape the emitter can print
//! directly. They run in a fixed order (see [`prepare`]): later passes rely on
//! earlier ones, e.g. marker encoding sanitizes text after mentions have become
//! plain text.

use super::mentions::{display_text, mention_url};
use crate::adf::nodes::normalize_marks;
use crate::adf::{timestamp_to_iso, DecisionState, Mark, Node, StatusColor};
use crate::markers::{self, Marker};
use tracing::trace;

/// Run every pass in order.
pub fn prepare(content: Vec<Node>, base_url: Option<&str>) -> Vec<Node> {
    let content = default_list_order(content);
    trace!("pass: default list order");
    let content = replace_media(content);
    trace!("pass: media placeholders");
    let content = split_mark_spacing(content);
    trace!("pass: mark spacing");
    let content = lift_code_blocks(content);
    trace!("pass: lift code blocks out of lists");
    let content = mentions_to_links(content, base_url);
    trace!("pass: mentions");
    let content = encode_markers(content);
    trace!("pass: markers");
    content
}

fn map_children(mut node: Node, f: &dyn Fn(Vec<Node>) -> Vec<Node>) -> Node {
    if let Some(children) = node.children_mut() {
        let taken = std::mem::take(children);
        *children = f(taken);
    }
    node
}

/// Ordered lists without an `order` attribute start at 1.
pub fn default_list_order(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::OrderedList { order, content } => Node::OrderedList {
                order: Some(order.unwrap_or(1)),
                content: default_list_order(content),
            },
            other => map_children(other, &default_list_order),
        })
        .collect()
}

/// Text shown in place of an attachment.
pub fn media_placeholder(id: Option<&str>, alt: Option<&str>) -> Node {
    let name = alt.or(id).unwrap_or("unknown");
    Node::marked(
        format!("(see file \"{name}\" in attachments)"),
        vec![Mark::Em],
    )
}

/// Replace media with emphasised placeholder text.
///
/// Block media (`mediaSingle`, `mediaGroup`) becomes one paragraph per
/// attachment; a bare `media` node inside inline content becomes text.
pub fn replace_media(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::MediaSingle { content } | Node::MediaGroup { content } => {
                for media in collect_media(content) {
                    out.push(Node::paragraph(vec![media]));
                }
            }
            Node::Media { id, alt } => out.push(media_placeholder(id.as_deref(), alt.as_deref())),
            other => out.push(map_children(other, &replace_media)),
        }
    }
    out
}

fn collect_media(content: Vec<Node>) -> Vec<Node> {
    let mut found = Vec::new();
    for node in content {
        match node {
            Node::Media { id, alt } => {
                found.push(media_placeholder(id.as_deref(), alt.as_deref()))
            }
            Node::MediaSingle { content } | Node::MediaGroup { content } => {
                found.extend(collect_media(content))
            }
            // captions and other wrappers
            other => {
                if let Some(children) = other.children() {
                    found.extend(collect_media(children.clone()));
                }
            }
        }
    }
    found
}

fn is_flanking(mark: &Mark) -> bool {
    matches!(mark, Mark::Strong | Mark::Em | Mark::Strike)
}

/// Move leading and trailing whitespace out of strong, em and strike text.
///
/// Markdown emphasis cannot open or close next to whitespace, so `**bold **`
/// would not round-trip. The whitespace keeps any link or code mark.
pub fn split_mark_spacing(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text { text, marks } if marks.iter().any(is_flanking) => {
                let outer: Vec<Mark> = marks.iter().filter(|m| !is_flanking(m)).cloned().collect();
                let trimmed_start = text.trim_start();
                let leading = &text[..text.len() - trimmed_start.len()];
                let core = trimmed_start.trim_end();
                let trailing = &trimmed_start[core.len()..];

                if core.is_empty() {
                    push_text(&mut out, text.clone(), outer);
                    continue;
                }
                if !leading.is_empty() {
                    push_text(&mut out, leading.to_string(), outer.clone());
                }
                push_text(&mut out, core.to_string(), marks.clone());
                if !trailing.is_empty() {
                    push_text(&mut out, trailing.to_string(), outer);
                }
            }
            Node::Text { text, marks } => push_text(&mut out, text, marks),
            other => out.push(map_children(other, &split_mark_spacing)),
        }
    }
    detach_edge_punctuation(out)
}

/// Anything that is neither a letter, a digit nor whitespace. Symbols count,
/// as they do for Markdown flanking.
fn is_punctuation(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

fn link_of(marks: &[Mark]) -> Option<&Mark> {
    marks.iter().find(|m| matches!(m, Mark::Link { .. }))
}

/// The character of `node` a delimiter of a run with `marks` would touch,
/// with the marks it carries. `None` when a code fence or link bracket is
/// written in between.
fn touching_char(node: &Node, marks: &[Mark], last: bool) -> Option<(char, Vec<Mark>)> {
    let Node::Text {
        text,
        marks: theirs,
    } = node
    else {
        return None;
    };
    if theirs.contains(&Mark::Code) || link_of(theirs) != link_of(marks) {
        return None;
    }
    let c = if last {
        text.chars().next_back()
    } else {
        text.chars().next()
    }?;
    Some((c, theirs.clone()))
}

/// Whether a delimiter of `own` sits between the run and a neighbour with
/// `theirs`, i.e. some flanking mark starts or stops there.
fn delimits(own: &[Mark], theirs: &[Mark]) -> bool {
    own.iter().any(|m| is_flanking(m) && !theirs.contains(m))
}

fn shared_marks(own: &[Mark], theirs: &[Mark]) -> Vec<Mark> {
    own.iter()
        .filter(|m| !is_flanking(m) || theirs.contains(m))
        .cloned()
        .collect()
}

/// Move edge punctuation out of strong, em and strike text when the
/// character across the delimiter is a letter or digit.
///
/// `x*a.*b` is not emphasis: the closing `*` sits between punctuation and a
/// letter. `x*a*.b` is. Whitespace right after a moved opening character (or
/// right before a moved closing one) moves with it.
fn detach_edge_punctuation(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut rest = nodes.into_iter().peekable();
    while let Some(node) = rest.next() {
        let Node::Text { text, marks } = node else {
            out.push(node);
            continue;
        };
        if !marks.iter().any(is_flanking) {
            push_text(&mut out, text, marks);
            continue;
        }

        let mut core = text.as_str();
        let mut leading = None;
        if let Some((before, theirs)) = out.last().and_then(|n| touching_char(n, &marks, true)) {
            if before.is_alphanumeric()
                && delimits(&marks, &theirs)
                && core.starts_with(is_punctuation)
            {
                let first = core.chars().next().map_or(0, char::len_utf8);
                let cut = core.len() - core[first..].trim_start().len();
                leading = Some((core[..cut].to_string(), shared_marks(&marks, &theirs)));
                core = &core[cut..];
            }
        }
        let mut trailing = None;
        if let Some((after, theirs)) = rest.peek().and_then(|n| touching_char(n, &marks, false)) {
            if after.is_alphanumeric()
                && delimits(&marks, &theirs)
                && core.ends_with(is_punctuation)
            {
                let last = core.chars().next_back().map_or(0, char::len_utf8);
                let cut = core[..core.len() - last].trim_end().len();
                trailing = Some((core[cut..].to_string(), shared_marks(&marks, &theirs)));
                core = &core[..cut];
            }
        }

        if let Some((piece, piece_marks)) = leading {
            push_text(&mut out, piece, piece_marks);
        }
        push_text(&mut out, core.to_string(), marks);
        if let Some((piece, piece_marks)) = trailing {
            push_text(&mut out, piece, piece_marks);
        }
    }
    out
}

/// Append text, merging it into the previous node when the mark sets match.
pub(crate) fn push_text(out: &mut Vec<Node>, text: String, marks: Vec<Mark>) {
    if text.is_empty() {
        return;
    }
    let marks = normalize_marks(marks);
    if let Some(Node::Text {
        text: prev,
        marks: prev_marks,
    }) = out.last_mut()
    {
        if *prev_marks == marks {
            prev.push_str(&text);
            return;
        }
    }
    out.push(Node::Text { text, marks });
}

fn is_list(node: &Node) -> bool {
    matches!(node, Node::BulletList { .. } | Node::OrderedList { .. })
}

/// Move code blocks that sit directly in list items to just after the list.
///
/// Items left empty are dropped, and so is a list left without items.
pub fn lift_code_blocks(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let node = map_children(node, &lift_code_blocks);
        if !is_list(&node) {
            out.push(node);
            continue;
        }

        let mut list = node;
        let mut lifted = Vec::new();
        if let Some(items) = list.children_mut() {
            let taken = std::mem::take(items);
            for item in taken {
                match item {
                    Node::ListItem { content } => {
                        let (code, rest): (Vec<Node>, Vec<Node>) = content
                            .into_iter()
                            .partition(|child| matches!(child, Node::CodeBlock { .. }));
                        lifted.extend(code);
                        if !rest.is_empty() {
                            items.push(Node::ListItem { content: rest });
                        }
                    }
                    other => items.push(other),
                }
            }
        }
        if list.children().is_some_and(|items| !items.is_empty()) {
            out.push(list);
        }
        out.extend(lifted);
    }
    out
}

/// Turn mentions into `@Name` text linked to the user's profile.
pub fn mentions_to_links(nodes: Vec<Node>, base_url: Option<&str>) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Mention { id, text } if id.trim().is_empty() => {
                let name = text.trim();
                Node::text(if name.is_empty() { "@unknown" } else { name })
            }
            Node::Mention { id, text } => Node::marked(
                display_text(&text, &id),
                vec![Mark::Link {
                    href: mention_url(base_url, &id),
                }],
            ),
            other => map_children(other, &|children| mentions_to_links(children, base_url)),
        })
        .collect()
}

fn marker_text(marker: Marker) -> Node {
    Node::marked(markers::encode(&marker), vec![Mark::Code])
}

fn date_marker(timestamp: Option<&str>) -> Node {
    let label = match timestamp {
        None => "[no date]".to_string(),
        Some(ts) => timestamp_to_iso(ts).unwrap_or_else(|| "[invalid date]".to_string()),
    };
    marker_text(Marker::Date(label))
}

fn status_marker(color: StatusColor, text: &str) -> Node {
    let text = markers::sanitize(text);
    let text = text.trim();
    if text.is_empty() {
        marker_text(Marker::Status {
            color: StatusColor::Neutral,
            text: "[no status]".to_string(),
        })
    } else {
        marker_text(Marker::Status {
            color,
            text: text.to_string(),
        })
    }
}

fn decision_text(content: &[Node]) -> String {
    let text: String = content.iter().map(Node::plain_text).collect();
    let text = markers::sanitize(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sanitize text, then encode dates, statuses and decisions as markers.
///
/// A `decisionList` becomes a blockquote holding one paragraph per decision;
/// decisions without text are dropped from it.
pub fn encode_markers(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text { text, marks } => out.push(Node::Text {
                text: markers::sanitize(&text),
                marks,
            }),
            Node::Date { timestamp } => out.push(date_marker(timestamp.as_deref())),
            Node::Status { color, text } => out.push(status_marker(color, &text)),
            Node::DecisionList { content } => {
                let paragraphs = content
                    .into_iter()
                    .filter_map(|item| match item {
                        Node::DecisionItem { state, content } => {
                            let text = decision_text(&content);
                            (!text.is_empty()).then(|| {
                                Node::paragraph(vec![marker_text(Marker::Decision { state, text })])
                            })
                        }
                        _ => None,
                    })
                    .collect();
                out.push(Node::Blockquote {
                    content: paragraphs,
                });
            }
            Node::DecisionItem { state, content } => {
                let text = decision_text(&content);
                let marker = if text.is_empty() {
                    Marker::Decision {
                        state: DecisionState::Decided,
                        text: "[no decision]".to_string(),
                    }
                } else {
                    Marker::Decision { state, text }
                };
                out.push(Node::paragraph(vec![marker_text(marker)]));
            }
            Node::Mention { id, text } => out.push(Node::Mention {
                id,
                text: markers::sanitize(&text),
            }),
            Node::Unsupported {
                node_type,
                text,
                content,
            } => out.push(Node::Unsupported {
                node_type,
                text: text.map(|t| markers::sanitize(&t)),
                content: encode_markers(content),
            }),
            other => out.push(map_children(other, &encode_markers)),
        }
    }
    out
}

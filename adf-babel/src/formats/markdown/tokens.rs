//! Markdown token model
//!
//! A typed block/inline tree lifted out of the comrak arena. Parsing ADF out of
//! Markdown happens in two steps: comrak AST → tokens (this module) and
//! tokens → ADF ([`super::parser`]). Keeping the tokens owned and arena-free
//! lets the second step restructure freely (splitting lists, regrouping task
//! paragraphs) without borrowing from comrak.

use crate::adf::PanelKind;
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, ComrakOptions};

/// A block token with the 1-based source line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub line: usize,
    pub kind: BlockKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    List {
        ordered: Option<u32>,
        items: Vec<ListEntry>,
    },
    CodeBlock {
        language: Option<String>,
        literal: String,
    },
    BlockQuote(Vec<Block>),
    /// A block quote opened by a `[!KIND]` line; the marker line is removed.
    Alert {
        kind: PanelKind,
        children: Vec<Block>,
    },
    Table(Vec<TableRow>),
    ThematicBreak,
    Html(String),
    Unsupported {
        name: String,
        text: String,
    },
}

/// A list item; `task` is `Some(checked)` for `- [ ]` / `- [x]` items.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub task: Option<bool>,
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub header: bool,
    pub cells: Vec<Vec<Inline>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Code(String),
    Strong(Vec<Inline>),
    Emph(Vec<Inline>),
    Strike(Vec<Inline>),
    Link { url: String, children: Vec<Inline> },
    Image { url: String, alt: String },
    SoftBreak,
    HardBreak,
    Html(String),
    Unsupported { name: String, text: String },
}

impl Inline {
    /// Visible text, with breaks collapsed to spaces.
    pub fn plain_text(inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            match inline {
                Inline::Text(text) | Inline::Code(text) | Inline::Html(text) => {
                    out.push_str(text)
                }
                Inline::Strong(children)
                | Inline::Emph(children)
                | Inline::Strike(children)
                | Inline::Link { children, .. } => out.push_str(&Inline::plain_text(children)),
                Inline::Image { alt, .. } => out.push_str(alt),
                Inline::SoftBreak | Inline::HardBreak => out.push(' '),
                Inline::Unsupported { text, .. } => out.push_str(text),
            }
        }
        out
    }
}

pub(crate) fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options
}

/// Tokenize Markdown source.
pub fn tokenize(source: &str) -> Vec<Block> {
    let arena = Arena::new();
    let options = default_comrak_options();
    let root = parse_document(&arena, source, &options);
    let lines: Vec<&str> = source.lines().collect();
    collect_blocks(root, &lines)
}

fn collect_blocks<'a>(parent: &'a AstNode<'a>, lines: &[&str]) -> Vec<Block> {
    parent
        .children()
        .filter_map(|child| block_from_node(child, lines))
        .collect()
}

fn block_from_node<'a>(node: &'a AstNode<'a>, lines: &[&str]) -> Option<Block> {
    let data = node.data.borrow();
    let line = data.sourcepos.start.line;

    let kind = match &data.value {
        NodeValue::Paragraph => BlockKind::Paragraph(collect_inlines(node)),
        NodeValue::Heading(heading) => BlockKind::Heading {
            level: heading.level.clamp(1, 6),
            content: collect_inlines(node),
        },
        NodeValue::List(list) => {
            let ordered = match list.list_type {
                ListType::Ordered => Some(u32::try_from(list.start).unwrap_or(1)),
                ListType::Bullet => None,
            };
            let items = node
                .children()
                .filter_map(|child| {
                    let task = match &child.data.borrow().value {
                        NodeValue::Item(_) => None,
                        NodeValue::TaskItem(symbol) => Some(symbol.is_some()),
                        _ => return None,
                    };
                    Some(ListEntry {
                        task,
                        children: collect_blocks(child, lines),
                    })
                })
                .collect();
            BlockKind::List { ordered, items }
        }
        NodeValue::CodeBlock(code) => {
            let language = code
                .info
                .split_whitespace()
                .next()
                .map(str::to_string)
                .filter(|lang| !lang.is_empty());
            BlockKind::CodeBlock {
                language,
                literal: code.literal.clone(),
            }
        }
        NodeValue::BlockQuote => {
            let children = collect_blocks(node, lines);
            let written = node
                .first_child()
                .is_some_and(|first| starts_with_alert_marker(first, lines));
            if written {
                match split_alert(children) {
                    Ok((kind, children)) => BlockKind::Alert { kind, children },
                    Err(children) => BlockKind::BlockQuote(children),
                }
            } else {
                BlockKind::BlockQuote(children)
            }
        }
        NodeValue::Table(_) => {
            let rows = node
                .children()
                .filter_map(|row| {
                    let header = match &row.data.borrow().value {
                        NodeValue::TableRow(header) => *header,
                        _ => return None,
                    };
                    let cells = row.children().map(collect_inlines).collect();
                    Some(TableRow { header, cells })
                })
                .collect();
            BlockKind::Table(rows)
        }
        NodeValue::ThematicBreak => BlockKind::ThematicBreak,
        NodeValue::HtmlBlock(html) => BlockKind::Html(html.literal.clone()),
        other => BlockKind::Unsupported {
            name: node_name(other),
            text: collect_text(node),
        },
    };

    Some(Block { line, kind })
}

/// Whether the source of `node` opens with a literal `[!`. An escaped `\[!`
/// reads the same once comrak has unescaped it, so the text alone can't tell.
fn starts_with_alert_marker<'a>(node: &'a AstNode<'a>, lines: &[&str]) -> bool {
    let start = node.data.borrow().sourcepos.start;
    lines
        .get(start.line.saturating_sub(1))
        .and_then(|line| line.get(start.column.saturating_sub(1)..))
        .is_some_and(|rest| rest.trim_start_matches([' ', '\t', '>']).starts_with("[!"))
}

/// Detect a GitHub alert: the first line of the first paragraph reads `[!KIND]`.
fn split_alert(mut children: Vec<Block>) -> Result<(PanelKind, Vec<Block>), Vec<Block>> {
    let kind = match children.first() {
        Some(Block {
            kind: BlockKind::Paragraph(inlines),
            ..
        }) => alert_kind(inlines),
        _ => None,
    };
    let Some(kind) = kind else {
        return Err(children);
    };

    if let BlockKind::Paragraph(inlines) = &mut children[0].kind {
        let rest = match inlines
            .iter()
            .position(|i| matches!(i, Inline::SoftBreak | Inline::HardBreak))
        {
            Some(pos) => inlines.split_off(pos + 1),
            None => Vec::new(),
        };
        *inlines = rest;
    }
    if matches!(&children[0].kind, BlockKind::Paragraph(inlines) if inlines.is_empty()) {
        children.remove(0);
    }
    Ok((kind, children))
}

fn alert_kind(inlines: &[Inline]) -> Option<PanelKind> {
    let mut first_line = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => first_line.push_str(text),
            Inline::SoftBreak | Inline::HardBreak => break,
            _ => return None,
        }
    }
    let keyword = first_line.trim().strip_prefix("[!")?.strip_suffix(']')?;
    PanelKind::from_alert(keyword)
}

fn collect_inlines<'a>(parent: &'a AstNode<'a>) -> Vec<Inline> {
    parent.children().map(inline_from_node).collect()
}

fn inline_from_node<'a>(node: &'a AstNode<'a>) -> Inline {
    let data = node.data.borrow();
    match &data.value {
        NodeValue::Text(text) => Inline::Text(text.clone()),
        NodeValue::Code(code) => Inline::Code(code.literal.clone()),
        NodeValue::Strong => Inline::Strong(collect_inlines(node)),
        NodeValue::Emph => Inline::Emph(collect_inlines(node)),
        NodeValue::Strikethrough => Inline::Strike(collect_inlines(node)),
        NodeValue::Link(link) => Inline::Link {
            url: link.url.clone(),
            children: collect_inlines(node),
        },
        NodeValue::Image(link) => Inline::Image {
            url: link.url.clone(),
            alt: collect_text(node),
        },
        NodeValue::SoftBreak => Inline::SoftBreak,
        NodeValue::LineBreak => Inline::HardBreak,
        NodeValue::HtmlInline(html) => Inline::Html(html.clone()),
        other => Inline::Unsupported {
            name: node_name(other),
            text: collect_text(node),
        },
    }
}

/// Snake-case name of a comrak node kind, used in warnings.
fn node_name(value: &NodeValue) -> String {
    let debug = format!("{value:?}");
    let variant: String = debug
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    let mut name = String::new();
    for (i, c) in variant.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                name.push('_');
            }
            name.push(c.to_ascii_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}

/// Collect text content from a node and its descendants.
fn collect_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut output = String::new();
    collect_text_into(node, &mut output);
    output
}

fn collect_text_into<'a>(node: &'a AstNode<'a>, output: &mut String) {
    match &node.data.borrow().value {
        NodeValue::Text(text) => output.push_str(text),
        NodeValue::Code(code) => output.push_str(&code.literal),
        NodeValue::CodeBlock(code) => output.push_str(&code.literal),
        NodeValue::SoftBreak | NodeValue::LineBreak => output.push(' '),
        _ => {
            for child in node.children() {
                collect_text_into(child, output);
            }
        }
    }
}

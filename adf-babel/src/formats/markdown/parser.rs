//! Markdown parsing (Markdown → ADF import)
//!
//! Pipeline: Markdown string → comrak AST → tokens → ADF tree
//!
//! Parsing never fails. Anything ADF cannot express is kept as plain text and
//! reported through [`ParseOutcome::warnings`].

use super::mentions::{display_text, mention_account_id};
use super::passes::push_text;
use super::tokens::{tokenize, Block, BlockKind, Inline, ListEntry, TableRow};
use crate::adf::{iso_to_timestamp, Document, Mark, Node};
use crate::markers::{self, Marker};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, trace};

const UNCHECKED: char = '☐';
const CHECKED: char = '☑';

static IMAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[[^\]]*$").unwrap());
static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]+\](?:[^(]|$)").unwrap());
static TASK_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\s*\[([ xX])\](\s|$)").unwrap());
static ALERT_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[!(NOTE|TIP|IMPORTANT|WARNING|CAUTION)\]").unwrap());
static DECISION_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[decision:[dau]\]").unwrap());
static BROKEN_RULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-{3,}|_{3,}|\*{3,})[^\s\-_*]").unwrap());
static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^<br\s*/?>$").unwrap());

/// Settings that influence how Markdown maps onto ADF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseContext {
    /// Site root; when set, only profile links on this site become mentions.
    pub base_url: Option<String>,
}

impl ParseContext {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        ParseContext {
            base_url: Some(base_url.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub document: Document,
    /// Human-readable diagnostics, deduplicated, in discovery order.
    pub warnings: Vec<String>,
}

/// Parse Markdown into an ADF document.
pub fn parse_from_markdown(source: &str, context: &ParseContext) -> ParseOutcome {
    if source.trim().is_empty() {
        return ParseOutcome {
            document: Document::empty(),
            warnings: Vec::new(),
        };
    }

    // Step 1: Markdown → tokens
    let blocks = tokenize(source);
    trace!(blocks = blocks.len(), "tokenized markdown");

    // Step 2: diagnostics on text comrak left unparsed
    let mut parser = AdfBuilder::new(context.base_url.as_deref());
    for warning in detect_malformed(&blocks) {
        parser.warn(warning);
    }

    // Step 3: tokens → ADF
    let content = parser.blocks(&blocks);

    for warning in &parser.warnings {
        debug!(%warning, "markdown import");
    }
    ParseOutcome {
        document: Document::new(content),
        warnings: parser.warnings,
    }
}

struct AdfBuilder<'a> {
    base_url: Option<&'a str>,
    warnings: Vec<String>,
    reported: HashSet<String>,
}

impl<'a> AdfBuilder<'a> {
    fn new(base_url: Option<&'a str>) -> Self {
        Self {
            base_url,
            warnings: Vec::new(),
            reported: HashSet::new(),
        }
    }

    fn warn(&mut self, message: String) {
        if self.reported.insert(message.clone()) {
            self.warnings.push(message);
        }
    }

    fn blocks(&mut self, blocks: &[Block]) -> Vec<Node> {
        let mut out: Vec<Node> = Vec::new();
        for block in blocks {
            match &block.kind {
                BlockKind::Paragraph(inlines) if is_glyph_paragraph(inlines) => {
                    let items = self.glyph_items(inlines, block.line);
                    append_task_items(&mut out, items);
                }
                _ => {
                    for node in self.block(block) {
                        match node {
                            Node::TaskList { content } => append_task_items(&mut out, content),
                            other => out.push(other),
                        }
                    }
                }
            }
        }
        out
    }

    fn block(&mut self, block: &Block) -> Vec<Node> {
        let line = block.line;
        match &block.kind {
            BlockKind::Paragraph(inlines) => {
                let content = self.inlines(inlines);
                if content.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::paragraph(content)]
                }
            }
            BlockKind::Heading { level, content } => vec![Node::Heading {
                level: *level,
                content: self.inlines(content),
            }],
            BlockKind::List { ordered, items } => self.list(*ordered, items),
            BlockKind::CodeBlock { language, literal } => {
                let code = literal.strip_suffix('\n').unwrap_or(literal);
                let content = if code.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::text(code)]
                };
                vec![Node::CodeBlock {
                    language: language.clone().filter(|lang| !lang.is_empty()),
                    content,
                }]
            }
            BlockKind::BlockQuote(children) => match decision_items(children) {
                Some(items) => vec![Node::DecisionList { content: items }],
                None => vec![Node::Blockquote {
                    content: self.blocks(children),
                }],
            },
            BlockKind::Alert { kind, children } => vec![Node::Panel {
                kind: *kind,
                content: self.blocks(children),
            }],
            BlockKind::Table(rows) => vec![self.table(rows)],
            BlockKind::ThematicBreak => vec![Node::Rule],
            BlockKind::Html(html) => {
                self.warn("Unsupported markdown element: html block".to_string());
                text_paragraph(html.trim_end())
            }
            BlockKind::Unsupported { name, text } => {
                self.warn(format!(
                    "Unsupported markdown element: {}",
                    name.replace('_', " ")
                ));
                trace!(line, %name, "kept unsupported block as text");
                text_paragraph(text)
            }
        }
    }

    /// A list splits into runs: plain items stay a bullet/ordered list, task
    /// items become a task list.
    fn list(&mut self, ordered: Option<u32>, items: &[ListEntry]) -> Vec<Node> {
        let mut out: Vec<Node> = Vec::new();
        for (index, entry) in items.iter().enumerate() {
            if let Some(checked) = entry.task {
                let items = self.task_item(checked, &entry.children);
                append_task_items(&mut out, items);
                continue;
            }

            let mut content = self.blocks(&entry.children);
            if content.is_empty() {
                content.push(Node::paragraph(Vec::new()));
            }
            let item = Node::ListItem { content };
            match (ordered, out.last_mut()) {
                (None, Some(Node::BulletList { content })) => content.push(item),
                (Some(_), Some(Node::OrderedList { content, .. })) => content.push(item),
                (None, _) => out.push(Node::BulletList {
                    content: vec![item],
                }),
                (Some(start), _) => out.push(Node::OrderedList {
                    order: Some(start.saturating_add(index as u32)),
                    content: vec![item],
                }),
            }
        }
        out
    }

    /// A task item followed by the items of any task lists nested under it.
    fn task_item(&mut self, checked: bool, children: &[Block]) -> Vec<Node> {
        let mut content = Vec::new();
        let mut nested = Vec::new();

        for (i, child) in children.iter().enumerate() {
            match &child.kind {
                BlockKind::Paragraph(inlines) if i == 0 => content = self.inlines(inlines),
                BlockKind::List { items, .. } if items.iter().all(|e| e.task.is_some()) => {
                    for node in self.block(child) {
                        if let Node::TaskList { content } = node {
                            nested.extend(content);
                        }
                    }
                }
                other => {
                    self.warn(format!(
                        "Line {}: Nested {} in task item converted to text",
                        child.line,
                        block_name(other)
                    ));
                    let text = block_text(other);
                    if !text.is_empty() {
                        if !content.is_empty() {
                            content.push(Node::HardBreak);
                        }
                        push_text(&mut content, text, Vec::new());
                    }
                }
            }
        }

        let mut items = vec![Node::TaskItem { checked, content }];
        items.extend(nested);
        items
    }

    /// Task items written in display form: each line starting with a glyph
    /// opens an item, other lines continue the previous one.
    fn glyph_items(&mut self, inlines: &[Inline], line: usize) -> Vec<Node> {
        let mut items: Vec<(bool, Vec<Inline>)> = Vec::new();
        for (separator, mut line_inlines) in split_lines(inlines) {
            match take_glyph(&mut line_inlines) {
                Some(checked) => items.push((checked, line_inlines)),
                None => match items.last_mut() {
                    Some((_, content)) => {
                        content.extend(separator);
                        content.extend(line_inlines);
                    }
                    None => items.push((false, line_inlines)),
                },
            }
        }
        trace!(line, items = items.len(), "task glyph paragraph");
        items
            .into_iter()
            .map(|(checked, content)| Node::TaskItem {
                checked,
                content: self.inlines(&content),
            })
            .collect()
    }

    fn table(&mut self, rows: &[TableRow]) -> Node {
        let rows = rows
            .iter()
            .map(|row| Node::TableRow {
                content: row
                    .cells
                    .iter()
                    .map(|cell| {
                        let inlines = self.inlines(cell);
                        let content = if inlines.is_empty() {
                            Vec::new()
                        } else {
                            vec![Node::paragraph(inlines)]
                        };
                        if row.header {
                            Node::TableHeader { content }
                        } else {
                            Node::TableCell { content }
                        }
                    })
                    .collect(),
            })
            .collect();
        Node::Table { content: rows }
    }

    fn inlines(&mut self, inlines: &[Inline]) -> Vec<Node> {
        let mut out = Vec::new();
        self.collect_inlines(inlines, &[], &mut out);
        out
    }

    fn collect_inlines(&mut self, inlines: &[Inline], marks: &[Mark], out: &mut Vec<Node>) {
        for inline in inlines {
            match inline {
                Inline::Text(text) => push_text(out, text.clone(), marks.to_vec()),
                Inline::Code(code) => match markers::parse_visible(code) {
                    Some(Marker::Status { color, text }) => out.push(Node::Status { color, text }),
                    Some(Marker::Date(iso)) if iso_to_timestamp(&iso).is_some() => {
                        out.push(Node::Date {
                            timestamp: iso_to_timestamp(&iso),
                        })
                    }
                    _ => push_text(out, code.clone(), with_mark(marks, Mark::Code)),
                },
                Inline::Strong(children) => {
                    self.collect_inlines(children, &with_mark(marks, Mark::Strong), out)
                }
                Inline::Emph(children) => {
                    self.collect_inlines(children, &with_mark(marks, Mark::Em), out)
                }
                Inline::Strike(children) => {
                    self.collect_inlines(children, &with_mark(marks, Mark::Strike), out)
                }
                Inline::Link { url, children } => {
                    match mention_account_id(url, self.base_url) {
                        Some(id) => {
                            let name = Inline::plain_text(children);
                            let text = display_text(&name, &id);
                            out.push(Node::Mention { id, text });
                        }
                        None => {
                            let link = Mark::Link { href: url.clone() };
                            self.collect_inlines(children, &with_mark(marks, link), out)
                        }
                    }
                }
                Inline::Image { alt, .. } => {
                    self.warn("Unsupported inline markdown: image".to_string());
                    push_text(out, alt.clone(), marks.to_vec());
                }
                Inline::SoftBreak => push_text(out, " ".to_string(), marks.to_vec()),
                Inline::HardBreak => out.push(Node::HardBreak),
                Inline::Html(html) if BR_RE.is_match(html.trim()) => out.push(Node::HardBreak),
                Inline::Html(html) => {
                    self.warn("Unsupported inline markdown: html inline".to_string());
                    push_text(out, html.clone(), marks.to_vec());
                }
                Inline::Unsupported { name, text } => {
                    self.warn(format!(
                        "Unsupported inline markdown: {}",
                        name.replace('_', " ")
                    ));
                    push_text(out, text.clone(), marks.to_vec());
                }
            }
        }
    }
}

fn with_mark(marks: &[Mark], mark: Mark) -> Vec<Mark> {
    let mut marks = marks.to_vec();
    marks.push(mark);
    marks
}

fn text_paragraph(text: &str) -> Vec<Node> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::paragraph(vec![Node::text(text)])]
    }
}

fn append_task_items(out: &mut Vec<Node>, items: Vec<Node>) {
    if items.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(Node::TaskList { content }) => content.extend(items),
        _ => out.push(Node::TaskList { content: items }),
    }
}

/// A quote whose paragraphs are all `[decision:x]…` code spans.
fn decision_items(children: &[Block]) -> Option<Vec<Node>> {
    if children.is_empty() {
        return None;
    }
    children
        .iter()
        .map(|block| match &block.kind {
            BlockKind::Paragraph(inlines) => match inlines.as_slice() {
                [Inline::Code(code)] => match markers::parse_visible(code)? {
                    Marker::Decision { state, text } => Some(Node::DecisionItem {
                        state,
                        content: if text.is_empty() {
                            Vec::new()
                        } else {
                            vec![Node::text(text)]
                        },
                    }),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn glyph_of(text: &str) -> Option<(bool, &str)> {
    let (checked, rest) = if let Some(rest) = text.strip_prefix(UNCHECKED) {
        (false, rest)
    } else {
        (true, text.strip_prefix(CHECKED)?)
    };
    (rest.is_empty() || rest.starts_with(char::is_whitespace)).then_some((checked, rest))
}

fn is_glyph_paragraph(inlines: &[Inline]) -> bool {
    matches!(inlines.first(), Some(Inline::Text(text)) if glyph_of(text).is_some())
}

/// Strip a leading glyph from a line, returning whether it was checked.
fn take_glyph(line: &mut Vec<Inline>) -> Option<bool> {
    let Some(Inline::Text(text)) = line.first() else {
        return None;
    };
    let (checked, rest) = glyph_of(text)?;
    let rest = rest.trim_start().to_string();
    if rest.is_empty() {
        line.remove(0);
    } else {
        line[0] = Inline::Text(rest);
    }
    Some(checked)
}

/// Split inline content at soft and hard breaks. Each line carries the break
/// that preceded it.
fn split_lines(inlines: &[Inline]) -> Vec<(Option<Inline>, Vec<Inline>)> {
    let mut lines = vec![(None, Vec::new())];
    for inline in inlines {
        match inline {
            Inline::SoftBreak | Inline::HardBreak => {
                lines.push((Some(inline.clone()), Vec::new()));
            }
            other => {
                if let Some((_, line)) = lines.last_mut() {
                    line.push(other.clone());
                }
            }
        }
    }
    lines
}

fn block_name(kind: &BlockKind) -> &'static str {
    match kind {
        BlockKind::Paragraph(_) => "paragraph",
        BlockKind::Heading { .. } => "heading",
        BlockKind::List { .. } => "list",
        BlockKind::CodeBlock { .. } => "code block",
        BlockKind::BlockQuote(_) | BlockKind::Alert { .. } => "blockquote",
        BlockKind::Table(_) => "table",
        BlockKind::ThematicBreak => "horizontal rule",
        BlockKind::Html(_) => "html block",
        BlockKind::Unsupported { .. } => "element",
    }
}

fn block_text(kind: &BlockKind) -> String {
    match kind {
        BlockKind::Paragraph(inlines) | BlockKind::Heading { content: inlines, .. } => {
            Inline::plain_text(inlines)
        }
        BlockKind::List { items, .. } => items
            .iter()
            .flat_map(|item| item.children.iter())
            .map(|block| block_text(&block.kind))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        BlockKind::CodeBlock { literal, .. } => literal.trim_end().to_string(),
        BlockKind::BlockQuote(children) | BlockKind::Alert { children, .. } => children
            .iter()
            .map(|block| block_text(&block.kind))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        BlockKind::Table(rows) => rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .map(|cell| Inline::plain_text(cell))
            .collect::<Vec<_>>()
            .join(" "),
        BlockKind::ThematicBreak => String::new(),
        BlockKind::Html(html) => html.trim_end().to_string(),
        BlockKind::Unsupported { text, .. } => text.clone(),
    }
}

/// Syntax comrak gave up on and left as literal text.
fn detect_malformed(blocks: &[Block]) -> Vec<String> {
    let mut warnings = Vec::new();
    for block in blocks {
        check_block(block, &mut warnings);
    }
    warnings
}

fn check_block(block: &Block, warnings: &mut Vec<String>) {
    let line = block.line;
    match &block.kind {
        BlockKind::Paragraph(inlines) => {
            check_inlines(inlines, line, warnings);
            let content = Inline::plain_text(inlines);
            let content = content.trim();
            if BROKEN_RULE_RE.is_match(content) {
                warnings.push(format!(
                    "Line {line}: Malformed horizontal rule - \"{content}\" \
                     (should be \"---\", \"***\", or \"___\" alone on a line)"
                ));
            }
        }
        BlockKind::Heading { content, .. } => check_inlines(content, line, warnings),
        BlockKind::List { items, .. } => {
            for child in items.iter().flat_map(|item| item.children.iter()) {
                check_block(child, warnings);
            }
        }
        BlockKind::BlockQuote(children) | BlockKind::Alert { children, .. } => {
            for child in children {
                check_block(child, warnings);
            }
        }
        BlockKind::Table(rows) => {
            for cell in rows.iter().flat_map(|row| row.cells.iter()) {
                check_inlines(cell, line, warnings);
            }
        }
        _ => {}
    }
}

/// Check runs of adjacent text; comrak may split one run into several nodes.
fn check_inlines(inlines: &[Inline], line: usize, warnings: &mut Vec<String>) {
    let mut run = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => run.push_str(text),
            other => {
                check_text(&run, line, warnings);
                run.clear();
                if let Inline::Strong(children)
                | Inline::Emph(children)
                | Inline::Strike(children)
                | Inline::Link { children, .. } = other
                {
                    check_inlines(children, line, warnings);
                }
            }
        }
    }
    check_text(&run, line, warnings);
}

fn check_text(text: &str, line: usize, warnings: &mut Vec<String>) {
    if text.is_empty() {
        return;
    }
    let excerpt: String = text.chars().take(50).collect();

    if text.matches("**").count() % 2 != 0 {
        warnings.push(format!(
            "Line {line}: Unclosed bold marker (**) in \"{excerpt}\""
        ));
    }
    if text.matches('`').count() % 2 != 0 {
        warnings.push(format!(
            "Line {line}: Unclosed code marker (`) in \"{excerpt}\""
        ));
    }
    if IMAGE_RE.is_match(text) {
        warnings.push(format!(
            "Line {line}: Incomplete image syntax in \"{excerpt}\""
        ));
    }
    if BRACKET_RE.is_match(text)
        && !TASK_MARKER_RE.is_match(text.trim())
        && !ALERT_MARKER_RE.is_match(text)
        && !DECISION_MARKER_RE.is_match(text)
    {
        warnings.push(format!(
            "Line {line}: Incomplete link syntax - missing URL in \"{excerpt}\""
        ));
    }
}

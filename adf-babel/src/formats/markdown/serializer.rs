//! Markdown serialization (ADF → Markdown export)
//!
//! Pipeline: ADF tree → tree passes ([`super::passes`]) → line emitter (this
//! module) → string post-processing ([`super::postprocess`]).
//!
//! The emitter is line oriented: every block renders to a `Vec<String>` and
//! containers (list items, quotes, panels) prefix the lines of their children.
//! Inline content is written with mark continuity: a mark that is still active
//! on the next text node stays open instead of being closed and reopened.

use super::passes;
use super::postprocess;
use crate::adf::{Document, Mark, Node, PanelKind};
use crate::markers;

/// Options for rendering ADF into Markdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Site root used for mention links, e.g. `https://example.atlassian.net`.
    pub base_url: Option<String>,
}

impl RenderOptions {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        RenderOptions {
            base_url: Some(base_url.into()),
        }
    }
}

/// Serialize an ADF document to Markdown. Never fails.
pub fn serialize_to_markdown(doc: &Document, options: &RenderOptions) -> String {
    let content = passes::prepare(doc.content.clone(), options.base_url.as_deref());
    let lines = MarkdownSerializer::new().serialize(&content);
    postprocess::finish(&lines.join("\n"))
}

/// Where inline content is being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineContext {
    Block,
    Cell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListStyle {
    Bullet,
    Ordered,
}

pub struct MarkdownSerializer {
    bullets: [char; 2],
    delimiters: [char; 2],
}

impl Default for MarkdownSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownSerializer {
    pub fn new() -> Self {
        Self {
            bullets: ['-', '*'],
            delimiters: ['.', ')'],
        }
    }

    pub fn serialize(&self, content: &[Node]) -> Vec<String> {
        self.blocks(content, false)
    }

    /// Render a sequence of blocks separated by blank lines.
    ///
    /// With `tight` set (list item bodies) a list that may interrupt a
    /// paragraph follows it directly.
    fn blocks(&self, nodes: &[Node], tight: bool) -> Vec<String> {
        let nodes = merge_task_lists(nodes);
        let mut lines: Vec<String> = Vec::new();
        let mut previous: Option<&Node> = None;
        // Adjacent lists of the same style would merge when re-read, so every
        // other one switches bullet or delimiter.
        let mut alternate = false;

        for node in nodes.iter() {
            let style = list_style(node);
            alternate = match (previous.and_then(list_style), style) {
                (Some(prev), Some(cur)) if prev == cur => !alternate,
                _ => false,
            };

            let rendered = self.block(node, alternate);
            if rendered.is_empty() {
                continue;
            }

            let joins_tightly = tight
                && matches!(previous, Some(Node::Paragraph { .. }))
                && can_interrupt_paragraph(node);
            if !lines.is_empty() && !joins_tightly {
                lines.push(String::new());
            }
            lines.extend(rendered);
            previous = Some(node);
        }
        lines
    }

    fn block(&self, node: &Node, alternate: bool) -> Vec<String> {
        match node {
            Node::Paragraph { content } => paragraph_lines(content),
            Node::Heading { level, content } => vec![heading_line(*level, content)],
            Node::BulletList { content } => {
                let bullet = self.bullets[usize::from(alternate)];
                self.list(content, |_| format!("{bullet} "))
            }
            Node::OrderedList { order, content } => {
                let start = order.unwrap_or(1);
                let delimiter = self.delimiters[usize::from(alternate)];
                self.list(content, |index| {
                    format!("{}{delimiter} ", u64::from(start) + index as u64)
                })
            }
            Node::ListItem { content } => self.blocks(content, true),
            Node::TaskList { content } => {
                let mut lines = Vec::new();
                task_lines(content, &mut lines);
                lines
            }
            Node::TaskItem { .. } => {
                let mut lines = Vec::new();
                task_lines(std::slice::from_ref(node), &mut lines);
                lines
            }
            Node::CodeBlock { language, content } => code_block_lines(language.as_deref(), content),
            Node::Blockquote { content } => quote(self.blocks(content, false)),
            Node::Panel { kind, content } => quote(self.panel(*kind, content)),
            Node::Table { content } => table_lines(content),
            Node::TableRow { content }
            | Node::TableHeader { content }
            | Node::TableCell { content } => self.blocks(content, false),
            Node::Rule => vec!["---".to_string()],
            Node::Unsupported { content, text, .. } => {
                if !content.is_empty() && content.iter().all(Node::is_inline) {
                    paragraph_lines(content)
                } else if !content.is_empty() {
                    self.blocks(content, false)
                } else {
                    text.as_deref()
                        .map(|text| paragraph_lines(&[Node::text(text)]))
                        .unwrap_or_default()
                }
            }
            inline if inline.is_inline() => paragraph_lines(std::slice::from_ref(inline)),
            // media and decisions are rewritten by the tree passes
            _ => Vec::new(),
        }
    }

    fn list(&self, items: &[Node], marker: impl Fn(usize) -> String) -> Vec<String> {
        let mut lines = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let marker = marker(index);
            let body = match item {
                Node::ListItem { content } => self.blocks(content, true),
                other => self.blocks(std::slice::from_ref(other), true),
            };
            if body.is_empty() {
                lines.push(marker.trim_end().to_string());
                continue;
            }
            let indent = " ".repeat(marker.chars().count());
            for (i, line) in body.into_iter().enumerate() {
                if i == 0 {
                    lines.push(format!("{marker}{line}"));
                } else if line.is_empty() {
                    lines.push(line);
                } else {
                    lines.push(format!("{indent}{line}"));
                }
            }
        }
        lines
    }

    /// Panels are written as a quote opened by a GitHub alert marker.
    ///
    /// A paragraph (glyph paragraphs included) follows the marker line
    /// directly. Any other block gets a blank line first, since a list or rule
    /// written right under `[!NOTE]` would continue or underline it.
    fn panel(&self, kind: PanelKind, content: &[Node]) -> Vec<String> {
        let mut lines = vec![format!("[!{}]", kind.alert())];
        let body = self.blocks(content, false);
        if body.is_empty() {
            return lines;
        }
        let first = merge_task_lists(content)
            .into_iter()
            .find(|node| !self.block(node, false).is_empty());
        let joins = matches!(
            first,
            Some(Node::Paragraph { .. } | Node::TaskList { .. } | Node::TaskItem { .. })
        );
        if !joins {
            lines.push(String::new());
        }
        lines.extend(body);
        lines
    }
}

fn list_style(node: &Node) -> Option<ListStyle> {
    match node {
        Node::BulletList { .. } => Some(ListStyle::Bullet),
        Node::OrderedList { .. } => Some(ListStyle::Ordered),
        _ => None,
    }
}

fn can_interrupt_paragraph(node: &Node) -> bool {
    match node {
        Node::BulletList { .. } => true,
        Node::OrderedList { order, .. } => order.unwrap_or(1) == 1,
        _ => false,
    }
}

/// Consecutive task lists render as one.
fn merge_task_lists(nodes: &[Node]) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let (Node::TaskList { content: items }, Some(Node::TaskList { content: prev })) =
            (node, out.last_mut())
        {
            prev.extend(items.iter().cloned());
            continue;
        }
        out.push(node.clone());
    }
    out
}

fn quote(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect()
}

fn paragraph_lines(content: &[Node]) -> Vec<String> {
    let start = content
        .iter()
        .position(|n| !matches!(n, Node::HardBreak))
        .unwrap_or(content.len());
    let end = content
        .iter()
        .rposition(|n| !matches!(n, Node::HardBreak))
        .map_or(start, |i| i + 1);
    let text = render_inline(&content[start..end], InlineContext::Block);
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .map(|line| escape_line_start(line.trim()))
        .collect()
}

fn heading_line(level: u8, content: &[Node]) -> String {
    let flattened: Vec<Node> = content
        .iter()
        .map(|node| match node {
            Node::HardBreak => Node::text(" "),
            other => other.clone(),
        })
        .collect();
    let text = render_inline(&flattened, InlineContext::Block);
    let text = escape_closing_hashes(text.trim());
    let hashes = "#".repeat(usize::from(level.clamp(1, 6)));
    if text.is_empty() {
        hashes
    } else {
        format!("{hashes} {text}")
    }
}

/// A heading ending in ` #` would lose the hashes as a closing sequence.
fn escape_closing_hashes(text: &str) -> String {
    let body = text.trim_end_matches('#');
    if body.len() == text.len() || !(body.is_empty() || body.ends_with(char::is_whitespace)) {
        return text.to_string();
    }
    format!("{body}\\{}", &text[body.len()..])
}

/// Task items as ☐/☑ glyph paragraphs, one per item, with nested task lists
/// flattened to the same level.
///
/// The glyph is written here rather than as `- [ ]` syntax so that it
/// survives any container prefix (quote markers, list markers) added later.
fn task_lines(items: &[Node], lines: &mut Vec<String>) {
    for item in items {
        match item {
            Node::TaskItem { checked, content } => {
                let glyph = if *checked { '☑' } else { '☐' };
                let inline = inline_content(content);
                let text = render_inline(&inline, InlineContext::Block);
                let mut parts = text.split('\n');
                let first = parts.next().unwrap_or("").trim();
                if !lines.is_empty() {
                    lines.push(String::new());
                }
                lines.push(format!("{glyph} {first}").trim_end().to_string());
                for rest in parts {
                    let rest = escape_line_start(rest.trim());
                    if !rest.is_empty() {
                        lines.push(format!("  {rest}"));
                    }
                }
            }
            Node::TaskList { content } => task_lines(content, lines),
            _ => {}
        }
    }
}

/// Inline content of a node that should only hold inlines; stray blocks are
/// flattened with hard breaks between them.
fn inline_content(content: &[Node]) -> Vec<Node> {
    if content.iter().all(Node::is_inline) {
        return content.to_vec();
    }
    let mut out = Vec::new();
    for node in content {
        if node.is_inline() {
            out.push(node.clone());
            continue;
        }
        if !out.is_empty() {
            out.push(Node::HardBreak);
        }
        match node {
            Node::Paragraph { content } | Node::Heading { content, .. } => {
                out.extend(inline_content(content))
            }
            other => out.push(Node::text(other.plain_text())),
        }
    }
    out
}

fn code_block_lines(language: Option<&str>, content: &[Node]) -> Vec<String> {
    let code: String = content.iter().map(Node::plain_text).collect();
    let language = language
        .and_then(|lang| lang.split_whitespace().next())
        .unwrap_or("");
    let fence = if language.contains('`') {
        "~".repeat((longest_run(&code, '~') + 1).max(3))
    } else {
        "`".repeat((longest_run(&code, '`') + 1).max(3))
    };

    let mut lines = vec![format!("{fence}{language}")];
    lines.extend(code.lines().map(str::to_string));
    lines.push(fence);
    lines
}

fn table_lines(rows: &[Node]) -> Vec<String> {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .filter_map(|row| match row {
            Node::TableRow { content } => Some(content.iter().map(cell_text).collect()),
            _ => None,
        })
        .collect();
    let Some(columns) = rows.iter().map(Vec::len).max() else {
        return Vec::new();
    };
    let columns = columns.max(1);

    let format_row = |cells: &[String]| {
        let mut line = String::from("|");
        for i in 0..columns {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            line.push(' ');
            line.push_str(cell);
            line.push_str(" |");
        }
        line
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_row(&rows[0]));
    lines.push(format!("|{}", " --- |".repeat(columns)));
    for row in &rows[1..] {
        lines.push(format_row(row));
    }
    lines
}

/// A table cell on one line: blocks are joined with `<br>`.
fn cell_text(cell: &Node) -> String {
    let mut parts = Vec::new();
    if let Some(children) = cell.children() {
        cell_parts(children, &mut parts);
    }
    parts.join("<br>")
}

fn cell_parts(nodes: &[Node], parts: &mut Vec<String>) {
    let mut inline_run: Vec<Node> = Vec::new();
    for node in nodes {
        if node.is_inline() {
            inline_run.push(node.clone());
            continue;
        }
        push_cell_inline(&inline_run, parts);
        inline_run.clear();

        match node {
            Node::Paragraph { content } | Node::Heading { content, .. } => {
                push_cell_inline(content, parts)
            }
            Node::CodeBlock { content, .. } => {
                let code: String = content.iter().map(Node::plain_text).collect();
                for line in code.lines().filter(|l| !l.trim().is_empty()) {
                    parts.push(code_span(line, InlineContext::Cell));
                }
            }
            Node::BulletList { content } | Node::OrderedList { content, .. } => {
                for item in content {
                    let mut item_parts = Vec::new();
                    if let Some(children) = item.children() {
                        cell_parts(children, &mut item_parts);
                    }
                    if let Some(first) = item_parts.first_mut() {
                        first.insert_str(0, "- ");
                    }
                    parts.extend(item_parts);
                }
            }
            Node::TaskList { content } => cell_parts(content, parts),
            Node::TaskItem { checked, content } => {
                let glyph = if *checked { '☑' } else { '☐' };
                let text = render_inline(&inline_content(content), InlineContext::Cell);
                parts.push(format!("{glyph} {}", text.trim()).trim_end().to_string());
            }
            Node::Rule => {}
            other => {
                if let Some(children) = other.children() {
                    cell_parts(children, parts);
                }
            }
        }
    }
    push_cell_inline(&inline_run, parts);
}

fn push_cell_inline(content: &[Node], parts: &mut Vec<String>) {
    if content.is_empty() {
        return;
    }
    let text = render_inline(content, InlineContext::Cell);
    let text = text.trim();
    if !text.is_empty() {
        parts.push(text.to_string());
    }
}

/// Write inline nodes, keeping marks open across adjacent text nodes.
fn render_inline(nodes: &[Node], context: InlineContext) -> String {
    let mut writer = InlineWriter::new(context);
    for node in nodes {
        match node {
            Node::Text { text, marks } => writer.text(text, marks),
            Node::HardBreak => writer.hard_break(),
            Node::Mention { text, .. } => writer.text(text, &[]),
            Node::Emoji { short_name, text } => {
                writer.text(text.as_deref().unwrap_or(short_name.as_str()), &[])
            }
            Node::InlineCard { url } => {
                writer.text(url, &[Mark::Link { href: url.clone() }])
            }
            other => writer.text(&other.plain_text(), &[]),
        }
    }
    writer.finish()
}

struct InlineWriter {
    context: InlineContext,
    output: String,
    open: Vec<Mark>,
    /// Output length right after the last code span.
    code_end: Option<usize>,
}

impl InlineWriter {
    fn new(context: InlineContext) -> Self {
        Self {
            context,
            output: String::new(),
            open: Vec::new(),
            code_end: None,
        }
    }

    fn text(&mut self, text: &str, marks: &[Mark]) {
        let text = text.replace(['\n', '\r'], " ");
        if text.is_empty() {
            return;
        }
        let code = marks.contains(&Mark::Code);
        let wanted: Vec<&Mark> = marks.iter().filter(|m| **m != Mark::Code).collect();

        let keep = self
            .open
            .iter()
            .zip(wanted.iter())
            .take_while(|(open, wanted)| open == *wanted)
            .count();
        self.close_to(keep);
        for mark in &wanted[keep..] {
            self.open_mark(mark);
        }

        if code {
            // two spans written back to back would share one backtick run
            if self.code_end == Some(self.output.len()) {
                self.output.push(' ');
            }
            self.output.push_str(&code_span(&text, self.context));
            self.code_end = Some(self.output.len());
        } else {
            self.output.push_str(&escape_text(&text));
        }
    }

    fn hard_break(&mut self) {
        self.close_to(0);
        match self.context {
            InlineContext::Block => {
                let trimmed = self.output.trim_end().len();
                self.output.truncate(trimmed);
                self.output.push_str("\\\n");
            }
            InlineContext::Cell => self.output.push_str("<br>"),
        }
    }

    fn open_mark(&mut self, mark: &Mark) {
        if matches!(mark, Mark::Link { .. }) && self.output.ends_with('!') {
            // `![` would open an image
            self.output.insert(self.output.len() - 1, '\\');
        }
        let delimiter = match mark {
            Mark::Link { .. } => "[",
            Mark::Strong => "**",
            Mark::Em => "*",
            Mark::Strike => "~~",
            Mark::Code => "",
        };
        self.output.push_str(delimiter);
        self.open.push(mark.clone());
    }

    fn close_to(&mut self, depth: usize) {
        while self.open.len() > depth {
            let Some(mark) = self.open.pop() else {
                break;
            };
            match mark {
                Mark::Link { href } => {
                    self.output.push_str("](");
                    self.output.push_str(&link_destination(&href, self.context));
                    self.output.push(')');
                }
                Mark::Strong => self.output.push_str("**"),
                Mark::Em => self.output.push('*'),
                Mark::Strike => self.output.push_str("~~"),
                Mark::Code => {}
            }
        }
    }

    fn finish(mut self) -> String {
        self.close_to(0);
        self.output
    }
}

fn longest_run(text: &str, target: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == target {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// A code span whose fence is longer than any backtick run in `text`.
///
/// Padding is decided on the revealed text: a marker payload ending in a
/// backtick only touches the fence once the marker is made visible.
fn code_span(text: &str, context: InlineContext) -> String {
    let text = match context {
        InlineContext::Cell => text.replace('|', "\\|"),
        InlineContext::Block => text.to_string(),
    };
    let fence = "`".repeat(longest_run(&text, '`') + 1);
    let visible = markers::reveal(&text);
    let pad = visible.starts_with('`')
        || visible.ends_with('`')
        || (visible.starts_with(' ') && visible.ends_with(' ') && !visible.trim().is_empty());
    if pad {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

fn link_destination(href: &str, context: InlineContext) -> String {
    let href = match context {
        InlineContext::Cell => href.replace('|', "%7C"),
        InlineContext::Block => href.to_string(),
    };
    if href.is_empty() {
        return "<>".to_string();
    }
    if href.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
        let cleaned = href
            .replace('\n', "%0A")
            .replace('<', "%3C")
            .replace('>', "%3E");
        return format!("<{cleaned}>");
    }
    let mut out = String::with_capacity(href.len());
    for c in href.chars() {
        if matches!(c, '(' | ')' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Backslash-escape Markdown punctuation in literal text.
fn escape_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let escape = match c {
            '\\' | '`' | '*' | '[' | ']' | '<' | '~' | '|' => true,
            '_' => {
                let before = i.checked_sub(1).map(|j| chars[j]);
                let after = chars.get(i + 1).copied();
                !(before.is_some_and(char::is_alphanumeric) && after.is_some_and(char::is_alphanumeric))
            }
            '&' => looks_like_entity(&chars[i..]),
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn looks_like_entity(rest: &[char]) -> bool {
    let body: String = rest
        .iter()
        .skip(1)
        .take(33)
        .take_while(|c| **c != ';')
        .collect();
    let terminated = rest.get(body.chars().count() + 1) == Some(&';');
    terminated && !body.is_empty() && body.chars().all(|c| c.is_ascii_alphanumeric() || c == '#')
}

/// Escape characters that would turn the start of a line into block syntax.
fn escape_line_start(line: &str) -> String {
    let Some(first) = line.chars().next() else {
        return String::new();
    };
    if matches!(first, '#' | '>' | '-' | '+' | '=') {
        return format!("\\{line}");
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(delimiter @ ('.' | ')')) = line[digits..].chars().next() {
            return format!("{}\\{delimiter}{}", &line[..digits], &line[digits + 1..]);
        }
    }
    line.to_string()
}

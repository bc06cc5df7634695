//! Markdown format implementation
//!
//! Bidirectional conversion between ADF and GitHub-flavoured Markdown.
//!
//! # Library Choice
//!
//! Import goes through `comrak` (tables, strikethrough and task lists enabled).
//! Export is a hand-written line emitter: ADF constructs without Markdown syntax
//! (panels, statuses, dates, decisions) need output comrak's formatter cannot
//! produce, and the emitter controls escaping so that re-rendering a parsed
//! document gives the same text back.
//!
//! # Element Mapping Table
//!
//! | ADF node         | Markdown                        | Notes                                  |
//! |------------------|---------------------------------|----------------------------------------|
//! | paragraph        | Paragraph                       | Line-start syntax escaped              |
//! | heading          | `#` … `######`                  |                                        |
//! | bulletList       | `- item`                        | Adjacent lists alternate `-` / `*`     |
//! | orderedList      | `1. item`                       | `order` → start number                 |
//! | taskList         | `☐ item` / `☑ item`             | Nested task lists are flattened        |
//! | codeBlock        | Fenced block                    | Lifted out of lists                    |
//! | blockquote       | `> quote`                       |                                        |
//! | panel            | `> [!NOTE]` alert               | info/success/note/warning/error        |
//! | table            | Pipe table                      | First row is the header                |
//! | rule             | `---`                           |                                        |
//! | decisionList     | Quote of `` `[decision:d]…` ``  | One paragraph per decision             |
//! | mention          | `[@Name](…/jira/people/<id>)`   | Base URL from [`RenderOptions`]        |
//! | status           | `` `[status:g]Done` ``          |                                        |
//! | date             | `` `[date]2024-01-15` ``        | UTC calendar date                      |
//! | media            | `*(see file "x" in attachments)*` | Export only                          |
//! | hardBreak        | `\` line end, `<br>` in tables  |                                        |
//!
//! # Lossy Conversions
//!
//! - Media nodes become placeholder text
//! - Nested task lists come back flat
//! - Emoji become their text, inline cards become links
//! - Unknown node types keep only their text
//! - Images and raw HTML in Markdown are kept as text (with a warning)

pub mod mentions;
pub mod parser;
pub mod passes;
pub mod postprocess;
pub mod serializer;
pub mod table;
pub mod tokens;

pub use parser::{parse_from_markdown, ParseContext, ParseOutcome};
pub use serializer::{serialize_to_markdown, RenderOptions};

use crate::adf::Document;
use crate::error::FormatError;
use crate::format::Format;
use std::collections::HashMap;
use tracing::debug;

/// Format implementation for Markdown
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormat {
    base_url: Option<String>,
}

impl MarkdownFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `base_url` for mention links in both directions.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
        }
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            base_url: self.base_url.clone(),
        }
    }
}

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "GitHub-flavoured Markdown"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        let context = ParseContext {
            base_url: self.base_url.clone(),
        };
        let outcome = parse_from_markdown(source, &context);
        if !outcome.warnings.is_empty() {
            debug!(count = outcome.warnings.len(), "markdown parsed with warnings");
        }
        Ok(outcome.document)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(serialize_to_markdown(doc, &self.render_options()))
    }

    /// Accepts `base-url` to override the configured base URL.
    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        let mut render = self.render_options();
        for (key, value) in options {
            match key.as_str() {
                "base-url" => render.base_url = Some(value.clone()).filter(|v| !v.is_empty()),
                other => {
                    return Err(FormatError::NotSupported(format!(
                        "Unknown markdown option '{other}'"
                    )))
                }
            }
        }
        Ok(serialize_to_markdown(doc, &render))
    }
}

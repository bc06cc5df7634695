//! ADF JSON format
//!
//! The document's own wire form. Parsing validates the root node and maps
//! unknown node types to [`crate::adf::Node::Unsupported`]; serialization
//! writes pretty-printed JSON.

use crate::adf::json::{from_json, to_json};
use crate::adf::Document;
use crate::error::FormatError;
use crate::format::Format;

/// Format implementation for ADF JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct AdfFormat;

impl Format for AdfFormat {
    fn name(&self) -> &str {
        "adf"
    }

    fn description(&self) -> &str {
        "Atlassian Document Format (JSON)"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json", "adf"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        if source.trim().is_empty() {
            return Ok(Document::empty());
        }
        from_json(source)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        to_json(doc)
    }
}

//! Markdown ⇄ Atlassian Document Format conversion
//!
//!     Jira and Confluence store rich text as ADF, a JSON tree. This crate renders
//!     ADF as GitHub-flavoured Markdown for reading and editing in plain text, and
//!     parses such Markdown back into ADF.
//!
//!     Both directions are total: rendering never fails, and parsing keeps anything
//!     it cannot express as plain text while collecting human-readable warnings.
//!     A document rendered, parsed and rendered again gives the same Markdown.
//!
//! Architecture
//!
//!     .
//!     ├── adf                     # ADF tree model and its JSON wire form
//!     ├── markers.rs              # Invisible markers for dates, statuses, decisions
//!     ├── error.rs
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── formats
//!     │   ├── adf                 # ADF JSON as a format
//!     │   └── markdown
//!     │       ├── tokens.rs       # comrak AST → owned token tree
//!     │       ├── parser.rs       # tokens → ADF
//!     │       ├── mentions.rs     # mention link URLs
//!     │       ├── passes.rs       # ADF rewrites before emission
//!     │       ├── serializer.rs   # ADF → Markdown lines
//!     │       ├── postprocess.rs  # string passes over emitted Markdown
//!     │       └── table.rs        # single-cell table normalization
//!     └── lib.rs
//!
//!     Rendering runs the ADF tree through a fixed sequence of tree passes, emits
//!     Markdown lines, then applies string passes. Constructs with no Markdown
//!     syntax (statuses, dates, decisions) travel through the emitter wrapped in
//!     zero-width marker characters and are revealed as code spans at the end.
//!
//! Testing
//!
//!     tests
//!     └── markdown
//!         ├── render.rs
//!         ├── parse.rs
//!         └── roundtrip.rs
//!
//!     Note that rust does not by default discover tests in subdirectories, so we need to include these
//!     in the mod.
//!
//!     This is a pure lib: no code here prints, reads the environment or exits.
pub mod adf;
pub mod error;
pub mod format;
pub mod formats;
pub mod markers;
pub mod registry;

pub use adf::{Document, Mark, Node};
pub use error::FormatError;
pub use format::Format;
pub use formats::markdown::{ParseContext, ParseOutcome, RenderOptions};
pub use registry::FormatRegistry;

/// Render an ADF document as Markdown.
pub fn render(doc: &Document, options: &RenderOptions) -> String {
    formats::markdown::serialize_to_markdown(doc, options)
}

/// Parse Markdown into an ADF document, collecting warnings.
pub fn parse(source: &str, context: &ParseContext) -> ParseOutcome {
    formats::markdown::parse_from_markdown(source, context)
}

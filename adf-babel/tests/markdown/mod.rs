//! Markdown ⇄ ADF integration tests
//!
//!     render.rs     ADF JSON → Markdown
//!     parse.rs      Markdown → ADF, including warnings
//!     roundtrip.rs  render → parse → render stability

mod parse;
mod render;
mod roundtrip;

use adf_babel::Document;
use std::path::PathBuf;

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
}

pub fn doc(value: serde_json::Value) -> Document {
    serde_json::from_value(value).expect("valid ADF document")
}

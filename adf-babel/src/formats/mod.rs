//! Format implementations
//!
//! Each format converts between the ADF [`crate::adf::Document`] and a text
//! representation.

pub mod adf;
pub mod markdown;

pub use adf::AdfFormat;
pub use markdown::MarkdownFormat;

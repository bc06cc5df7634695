//! Error types for format operations

use thiserror::Error;

/// Errors that can occur during format operations
///
/// Rendering and Markdown parsing never fail; these cover registry lookups and
/// decoding ADF JSON.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Format not found in registry
    #[error("Format '{0}' not found")]
    FormatNotFound(String),
    /// Format does not support the requested operation
    #[error("Operation not supported: {0}")]
    NotSupported(String),
    /// Malformed ADF JSON
    #[error("Invalid ADF JSON: {0}")]
    Json(#[from] serde_json::Error),
}

//! Atlassian Document Format tree model
//!
//! [`nodes`] holds the typed tree that every conversion works on. [`json`] maps
//! that tree to and from the JSON wire shape used by the Jira REST API.
//!
//! Loading JSON is total: node kinds this crate does not model are kept as
//! [`Node::Unsupported`] and marks it does not model are dropped, so a foreign
//! document always yields a tree the renderer can degrade gracefully.

pub mod json;
pub mod nodes;

pub use nodes::{
    iso_to_timestamp, timestamp_to_iso, DecisionState, Document, Mark, Node, PanelKind,
    StatusColor,
};

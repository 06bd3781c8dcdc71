//! Editable HTML documents for stitching.
//!
//! This crate provides:
//! - [`Document`] — a parsed document with selection, attribute mutation,
//!   subtree transfer between documents and fragment insertion
//! - [`events`] — click handlers and their outcomes

mod document;
pub mod events;

pub use document::Document;
pub use ego_tree::NodeId;
pub use events::{ClickHandler, ClickOutcome, Scroll, ScrollBehavior};

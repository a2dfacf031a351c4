#![forbid(unsafe_code)]

//! In-memory document target for Rill.
//!
//! This crate executes `rill-tree` descriptors against a [`Document`]:
//! an arena-backed node tree with the same observable behavior the
//! runtime needs from a browser DOM, plus counters that make rendering
//! cost visible to tests. [`mount`] builds a tree from scratch;
//! [`hydrate`] walks server markup (read back with [`parse_document`])
//! and adopts the stamped nodes instead, leaving matching markup
//! untouched except for the marker strips.
//!
//! Live state never re-renders from the top. Dynamic text and attributes
//! write through their own effects; dynamic regions and keyed lists
//! reconcile children in place; suspense boundaries swap between content
//! and fallback as their resource counts drain.

pub mod document;
pub mod html;
mod list;
mod reconcile;
pub mod render;

pub use document::{Document, NodeId, WeakDocument};
pub use html::{HtmlError, parse_document, parse_into};
pub use render::{MountHandle, hydrate, mount};

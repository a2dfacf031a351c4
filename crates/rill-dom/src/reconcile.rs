//! Child-order reconciliation and hydration claims.
//!
//! Both the executor's per-element child assembly and the region effects
//! (dynamic, list, suspense) end up with the same problem: a parent node,
//! its current children, and a desired ordered set of nodes. The cursor
//! walk here converges the two with the minimum of structural writes, so
//! a matching prefix costs nothing and a claim-complete hydration pass
//! costs nothing at all.
//!
//! Comment nodes are invisible to reconciliation. The server emits
//! `<!---->` separators between adjacent text runs; the client neither
//! matches nor prunes them.

use std::cell::Cell;

use rill_tree::{HYDRATION_ATTR, HydrationPath};

use crate::document::{Document, NodeId};

enum CursorMode {
    /// First pass over server markup: adopt stamped elements and text
    /// nodes in document order.
    Hydrate,
    /// Re-run of a region effect: the only adoption allowed is a plain
    /// text node whose value already matches.
    ReuseText,
}

/// Adoption state for one parent scope: a cursor over the parent's
/// existing children that advances as executor output claims them.
pub(crate) struct Cursor {
    parent: NodeId,
    next: Cell<usize>,
    mode: CursorMode,
}

impl Cursor {
    pub(crate) fn hydrate(parent: NodeId) -> Self {
        Self {
            parent,
            next: Cell::new(0),
            mode: CursorMode::Hydrate,
        }
    }

    pub(crate) fn reuse_text(parent: NodeId) -> Self {
        Self {
            parent,
            next: Cell::new(0),
            mode: CursorMode::ReuseText,
        }
    }

    pub(crate) fn is_hydrating(&self) -> bool {
        matches!(self.mode, CursorMode::Hydrate)
    }

    /// Adopt the element stamped with `address`, searching from the
    /// cursor onward, and strip the marker. `None` on a miss; the caller
    /// degrades that subtree to fresh creation and reconciliation prunes
    /// whatever the scan left behind.
    pub(crate) fn claim_element(
        &self,
        doc: &Document,
        tag: &str,
        address: &HydrationPath,
    ) -> Option<NodeId> {
        if !self.is_hydrating() {
            return None;
        }
        let expected = address.to_string();
        let children = doc.children(self.parent);
        let mut index = self.next.get();
        while let Some(&node) = children.get(index) {
            if doc.tag(node).as_deref() == Some(tag)
                && doc.attribute(node, HYDRATION_ATTR).as_deref() == Some(expected.as_str())
            {
                self.next.set(index + 1);
                doc.remove_attribute(node, HYDRATION_ATTR);
                return Some(node);
            }
            index += 1;
        }
        None
    }

    /// Adopt the text node at the cursor, skipping comments in place.
    ///
    /// While hydrating any text node is taken (the caller then writes the
    /// value, normally a no-op). On re-runs only a plain text node whose
    /// value equals `value` is reused; a node with parked cleanups
    /// belongs to a live binding and is never stolen.
    pub(crate) fn claim_text(&self, doc: &Document, value: Option<&str>) -> Option<NodeId> {
        let children = doc.children(self.parent);
        let mut index = self.next.get();
        while let Some(&node) = children.get(index) {
            if doc.is_comment(node) {
                index += 1;
                continue;
            }
            if !doc.is_text(node) {
                return None;
            }
            let take = match self.mode {
                CursorMode::Hydrate => true,
                CursorMode::ReuseText => {
                    !doc.has_cleanups(node) && doc.text(node).as_deref() == value
                }
            };
            if take {
                self.next.set(index + 1);
                return Some(node);
            }
            return None;
        }
        None
    }
}

/// Converge `parent`'s children on `desired`, in order. Nodes already in
/// place are left alone, everything else is moved or inserted at the
/// cursor, and trailing leftovers are disposed.
pub(crate) fn reconcile_children(doc: &Document, parent: NodeId, desired: &[NodeId]) {
    let cursor = place_in_order(doc, parent, desired);
    let mut index = cursor;
    loop {
        let Some(current) = doc.child_at(parent, index) else {
            break;
        };
        if doc.is_comment(current) {
            index += 1;
            continue;
        }
        doc.dispose(current);
    }
}

/// Like [`reconcile_children`], but leftovers are detached alive instead
/// of disposed. Suspense swaps use this to park content while the
/// fallback is showing.
pub(crate) fn swap_children(doc: &Document, parent: NodeId, desired: &[NodeId]) {
    let cursor = place_in_order(doc, parent, desired);
    let mut index = cursor;
    loop {
        let Some(current) = doc.child_at(parent, index) else {
            break;
        };
        if doc.is_comment(current) {
            index += 1;
            continue;
        }
        doc.remove_child(parent, current);
    }
}

/// Shared cursor walk: after this, `desired` occupies the leading
/// positions of `parent` (comments interleaved where they already were)
/// and the returned index points at the first leftover.
fn place_in_order(doc: &Document, parent: NodeId, desired: &[NodeId]) -> usize {
    let mut index = 0usize;
    for &node in desired {
        loop {
            match doc.child_at(parent, index) {
                Some(current) if doc.is_comment(current) => index += 1,
                _ => break,
            }
        }
        let current = doc.child_at(parent, index);
        if current != Some(node) {
            doc.insert_before(parent, node, current);
        }
        index += 1;
    }
    index
}

//! The document executor: mounting, hydration, and live regions.
//!
//! [`mount`] walks a descriptor tree and builds document nodes for it;
//! [`hydrate`] does the same walk over server markup, adopting the nodes
//! the server stamped with `data-rill` addresses instead of creating
//! them. Both return a [`MountHandle`] whose [`settle`](MountHandle::settle)
//! drives any resource futures the tree registered.
//!
//! Static structure is built once. Everything live (dynamic text and
//! attributes, dynamic regions, keyed lists, suspense swaps) becomes its
//! own effect, parked as a cleanup on the node it maintains so the
//! subscription dies with the node.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use futures::executor::block_on;
use futures::future::join_all;
use rill_reactive::create_effect;
use rill_tree::props::{handler_event_name, normalize_prop_key};
use rill_tree::{AttrValue, ElementNode, Frame, PendingSet, PropValue, SuspenseNode, VNode, with_frame};
use tracing::{debug, warn};

use crate::document::{Document, NodeId};
use crate::list::execute_list;
use crate::reconcile::{Cursor, reconcile_children, swap_children};

pub(crate) fn child_index(i: usize) -> u32 {
    u32::try_from(i).unwrap_or(u32::MAX)
}

/// Build document nodes for one descriptor, appending the produced
/// top-level ids to `out`. `claim` carries the adoption cursor for the
/// surrounding parent scope, if any.
pub(crate) fn execute_into(
    doc: &Document,
    node: &VNode,
    frame: &Rc<Frame>,
    claim: Option<&Cursor>,
    out: &mut Vec<NodeId>,
) {
    match node {
        VNode::Empty => {}
        VNode::Text(value) => {
            let id = match claim.and_then(|c| c.claim_text(doc, Some(value.as_ref()))) {
                Some(id) => {
                    doc.set_text(id, value.as_ref());
                    id
                }
                None => doc.create_text(value.as_ref()),
            };
            out.push(id);
        }
        VNode::DynText(f) => out.push(execute_dyn_text(doc, f, frame, claim)),
        VNode::Fragment(children) => {
            // An invisible indexing level: child i of the fragment lives
            // at address `fragment.i`, in the same parent scope.
            for (i, child) in children.iter().enumerate() {
                let child_frame = Rc::new(frame.child(child_index(i)));
                execute_into(doc, child, &child_frame, claim, out);
            }
        }
        VNode::Component(body) => {
            let produced = with_frame(Rc::clone(frame), || body());
            execute_into(doc, &produced, frame, claim, out);
        }
        VNode::Scope(scope) => {
            let scoped = Rc::new(frame.with_ambient(scope.key, Rc::clone(&scope.value)));
            execute_into(doc, &scope.child, &scoped, claim, out);
        }
        VNode::Element(element) => out.push(execute_element(doc, element, frame, claim)),
        VNode::Dynamic(f) => out.push(execute_dynamic(doc, f, frame, claim)),
        VNode::List(list) => out.push(execute_list(doc, list, frame, claim)),
        VNode::Suspense(suspense) => out.push(execute_suspense(doc, suspense, frame, claim)),
    }
}

/// Claim the element stamped with this frame's address, or create a
/// fresh one. Returns the node and whether it was claimed.
pub(crate) fn claim_or_create(
    doc: &Document,
    tag: &str,
    frame: &Rc<Frame>,
    claim: Option<&Cursor>,
) -> (NodeId, bool) {
    if let Some(cursor) = claim {
        if let Some(node) = cursor.claim_element(doc, tag, frame.address()) {
            return (node, true);
        }
        if cursor.is_hydrating() {
            warn!(
                tag,
                address = %frame.address(),
                "hydration miss, creating subtree fresh"
            );
        }
    }
    (doc.create_element(tag), false)
}

fn execute_element(
    doc: &Document,
    element: &ElementNode,
    frame: &Rc<Frame>,
    claim: Option<&Cursor>,
) -> NodeId {
    let (node, claimed) = claim_or_create(doc, &element.tag, frame, claim);
    apply_props(doc, node, element, frame);

    let child_claim = claimed.then(|| Cursor::hydrate(node));
    let mut desired = Vec::new();
    for (i, child) in element.children.iter().enumerate() {
        let child_frame = Rc::new(frame.child(child_index(i)));
        execute_into(doc, child, &child_frame, child_claim.as_ref(), &mut desired);
    }
    reconcile_children(doc, node, &desired);
    node
}

fn apply_props(doc: &Document, node: NodeId, element: &ElementNode, frame: &Rc<Frame>) {
    for (key, prop) in &element.props {
        let key = normalize_prop_key(key);
        match prop {
            PropValue::Handler(handler) => match handler_event_name(key) {
                Some(event) => doc.add_listener(node, event, Rc::clone(handler)),
                None => warn!(key, "handler prop without an on* key, ignored"),
            },
            PropValue::Attr(value) => apply_attr(doc, node, key, value),
            PropValue::Style(map) => {
                for (property, value) in map.entries() {
                    doc.merge_style(node, property, value);
                }
            }
            PropValue::DynAttr(f) => {
                let weak = doc.downgrade();
                let f = Rc::clone(f);
                let key = key.to_owned();
                let frame = Rc::clone(frame);
                let effect = create_effect(move || {
                    let value = with_frame(Rc::clone(&frame), &*f);
                    let Some(doc) = weak.upgrade() else { return };
                    apply_attr(&doc, node, &key, &value);
                });
                doc.add_cleanup(node, move || drop(effect));
            }
        }
    }
}

fn apply_attr(doc: &Document, node: NodeId, key: &str, value: &AttrValue) {
    match value {
        AttrValue::Text(text) => doc.set_attribute(node, key, text.as_str()),
        AttrValue::Bool(true) => doc.set_attribute(node, key, ""),
        AttrValue::Bool(false) | AttrValue::Null => doc.remove_attribute(node, key),
    }
}

fn execute_dyn_text(
    doc: &Document,
    f: &Rc<dyn Fn() -> String>,
    frame: &Rc<Frame>,
    claim: Option<&Cursor>,
) -> NodeId {
    let node = match claim.and_then(|c| c.claim_text(doc, None)) {
        Some(id) => id,
        None => doc.create_text(""),
    };
    let weak = doc.downgrade();
    let f = Rc::clone(f);
    let frame = Rc::clone(frame);
    let effect = create_effect(move || {
        let value = with_frame(Rc::clone(&frame), &*f);
        let Some(doc) = weak.upgrade() else { return };
        doc.set_text(node, value);
    });
    doc.add_cleanup(node, move || drop(effect));
    node
}

/// A dynamic region: a `display:contents` container plus an effect that
/// re-executes the closure and reconciles its output in place. The first
/// run hydrates into the claimed container; later runs only reuse equal
/// static text.
fn execute_dynamic(
    doc: &Document,
    f: &Rc<dyn Fn() -> VNode>,
    frame: &Rc<Frame>,
    claim: Option<&Cursor>,
) -> NodeId {
    let (container, claimed) = claim_or_create(doc, "div", frame, claim);
    doc.merge_style(container, "display", "contents");

    let content_frame = Rc::new(frame.child(0));
    let f = Rc::clone(f);
    let weak = doc.downgrade();
    let hydrate_first = Cell::new(claimed);
    let effect = create_effect(move || {
        let produced = with_frame(Rc::clone(&content_frame), &*f);
        let Some(doc) = weak.upgrade() else { return };
        let cursor = if hydrate_first.replace(false) {
            Cursor::hydrate(container)
        } else {
            Cursor::reuse_text(container)
        };
        let mut desired = Vec::new();
        execute_into(&doc, &produced, &content_frame, Some(&cursor), &mut desired);
        reconcile_children(&doc, container, &desired);
    });
    doc.add_cleanup(container, move || drop(effect));
    container
}

/// A suspense boundary. Children execute exactly once, immediately and
/// always fresh (their markup is never claimable: the server may have
/// emitted the fallback instead). Their resources are counted by a
/// boundary-local pending set; a swap effect shows the children while it
/// is idle and a freshly built fallback while it is not. Detached
/// content stays alive, so its signals keep updating off-screen.
fn execute_suspense(
    doc: &Document,
    suspense: &SuspenseNode,
    frame: &Rc<Frame>,
    claim: Option<&Cursor>,
) -> NodeId {
    let (container, claimed) = claim_or_create(doc, "div", frame, claim);
    doc.merge_style(container, "display", "contents");

    let pending = PendingSet::new();
    let content_frame = Rc::new(frame.child(0).with_pending(pending.clone()));
    let mut content = Vec::new();
    execute_into(doc, &suspense.children, &content_frame, None, &mut content);
    // Futures bubble to the nearest driver; counts stay boundary-local.
    frame.pending().absorb(&pending);

    let fallback_vnode = suspense.fallback.clone();
    let fallback_frame = Rc::new(frame.child(0));
    let weak = doc.downgrade();
    let content_for_swap = content.clone();
    let fallback_live = RefCell::new(Vec::new());
    let first = Cell::new(claimed);
    let effect = create_effect(move || {
        let idle = pending.is_idle();
        let Some(doc) = weak.upgrade() else { return };
        if first.replace(false) {
            // Whatever the server put inside the boundary is dead weight.
            for child in doc.children(container) {
                doc.dispose(child);
            }
        }
        if idle {
            for node in fallback_live.borrow_mut().drain(..) {
                doc.dispose(node);
            }
            swap_children(&doc, container, &content_for_swap);
        } else {
            if fallback_live.borrow().is_empty() {
                let mut nodes = Vec::new();
                execute_into(&doc, &fallback_vnode, &fallback_frame, None, &mut nodes);
                *fallback_live.borrow_mut() = nodes;
            }
            let nodes = fallback_live.borrow().clone();
            swap_children(&doc, container, &nodes);
        }
    });

    let cleanup_doc = doc.downgrade();
    doc.add_cleanup(container, move || {
        drop(effect);
        if let Some(doc) = cleanup_doc.upgrade() {
            for &node in &content {
                doc.dispose(node);
            }
        }
    });
    container
}

/// A mounted tree: the document, the node it hangs under, and the
/// pending set its resources drain into.
pub struct MountHandle {
    doc: Document,
    root: NodeId,
    pending: PendingSet,
}

impl MountHandle {
    /// The node the tree was mounted under.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// How many resource futures are waiting to be driven.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.queued()
    }

    /// Drive registered resource futures to completion, repeatedly, until
    /// no new ones appear. Suspense boundaries swap to their children as
    /// their counts drain.
    pub fn settle(&self) {
        loop {
            let futures = self.pending.take_futures();
            if futures.is_empty() {
                break;
            }
            debug!(futures = futures.len(), "driving resource futures");
            block_on(join_all(futures));
        }
    }

    /// Dispose everything under the mount point.
    pub fn unmount(self) {
        for child in self.doc.children(self.root) {
            self.doc.dispose(child);
        }
    }
}

impl fmt::Debug for MountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountHandle")
            .field("root", &self.root)
            .field("pending", &self.pending.queued())
            .finish()
    }
}

/// Execute `component` under `target`, replacing whatever was there.
pub fn mount(component: impl Fn() -> VNode + 'static, doc: &Document, target: NodeId) -> MountHandle {
    for child in doc.children(target) {
        doc.dispose(child);
    }
    let frame = Rc::new(Frame::root());
    let tree = rill_tree::component(component);
    let mut nodes = Vec::new();
    execute_into(doc, &tree, &frame, None, &mut nodes);
    reconcile_children(doc, target, &nodes);
    debug!(nodes = nodes.len(), "mounted");
    MountHandle {
        doc: doc.clone(),
        root: target,
        pending: frame.pending().clone(),
    }
}

/// Execute `component` over server markup already under `target`,
/// adopting stamped nodes instead of creating them. Subtree-level
/// mismatches degrade to fresh creation in place; if the walk panics the
/// markup is discarded and the tree is mounted fresh.
pub fn hydrate(
    component: impl Fn() -> VNode + 'static,
    doc: &Document,
    target: NodeId,
) -> MountHandle {
    let component = Rc::new(component);
    let attempt = {
        let doc = doc.clone();
        let component = Rc::clone(&component);
        panic::catch_unwind(AssertUnwindSafe(move || {
            let frame = Rc::new(Frame::root());
            let tree = rill_tree::component(move || component());
            let cursor = Cursor::hydrate(target);
            let mut nodes = Vec::new();
            execute_into(&doc, &tree, &frame, Some(&cursor), &mut nodes);
            reconcile_children(&doc, target, &nodes);
            (nodes.len(), frame.pending().clone())
        }))
    };
    match attempt {
        Ok((count, pending)) => {
            debug!(nodes = count, "hydrated");
            MountHandle {
                doc: doc.clone(),
                root: target,
                pending,
            }
        }
        Err(_) => {
            warn!("hydration panicked, discarding server markup and mounting fresh");
            mount(move || component(), doc, target)
        }
    }
}

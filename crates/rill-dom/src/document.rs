//! The in-memory document arena.
//!
//! [`Document`] is the mutable tree the executor renders into: a slab of
//! nodes addressed by [`NodeId`], with parent/child links, ordered
//! attributes, event listeners, and per-node cleanup hooks. It stands in
//! for a browser DOM, so its operations mirror the handful the runtime
//! needs (`insert_before`, `set_attribute`, `dispatch`, ...) and nothing
//! more.
//!
//! Two counters make rendering behavior observable: `created_count` ticks
//! on every node creation and `mutation_count` on every write that
//! actually changes the tree. Equal-value writes are no-ops by contract,
//! which is what lets hydration over matching markup finish with nothing
//! but its marker strips on the ledger.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use rill_tree::markup::escape_into;
use rill_tree::{Event, EventHandler, is_void_element};

/// Handle to a node in a [`Document`]. Ids are never reused, so a stale
/// id after disposal simply resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

enum NodeKind {
    Element {
        tag: String,
        /// Insertion-ordered. Presence-only attributes store an empty
        /// value and serialize bare (`<input disabled />`).
        attrs: Vec<(String, String)>,
    },
    Text {
        value: String,
    },
    Comment {
        value: String,
    },
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(String, EventHandler)>,
    cleanups: Vec<Box<dyn FnOnce()>>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
            cleanups: Vec::new(),
        }
    }
}

struct DocumentInner {
    /// Slot per id; disposal frees the slot without reusing it.
    nodes: Vec<Option<NodeData>>,
    root: NodeId,
    created: u64,
    mutations: u64,
}

impl DocumentInner {
    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("document node limit"));
        self.nodes.push(Some(NodeData::new(kind)));
        self.created += 1;
        id
    }

    /// Unlink `child` from its current parent, if any.
    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|data| data.parent) else {
            return;
        };
        if let Some(data) = self.node_mut(parent) {
            data.children.retain(|&c| c != child);
        }
        if let Some(data) = self.node_mut(child) {
            data.parent = None;
        }
    }
}

/// An in-memory document tree.
///
/// Cheap to clone; all clones share the same arena. Borrows of the
/// interior state never escape a method call, so handlers and cleanups
/// run by [`dispatch`](Document::dispatch) and
/// [`dispose`](Document::dispose) are free to re-enter the document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

/// Non-owning [`Document`] handle for closures parked inside effects.
///
/// Effects are parked on document nodes as cleanups, so an effect holding
/// a strong `Document` would keep the whole arena alive in a cycle.
#[derive(Clone)]
pub struct WeakDocument {
    inner: Weak<RefCell<DocumentInner>>,
}

impl WeakDocument {
    #[must_use]
    pub fn upgrade(&self) -> Option<Document> {
        self.inner.upgrade().map(|inner| Document { inner })
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: just the synthetic `#document` root element.
    #[must_use]
    pub fn new() -> Self {
        let mut inner = DocumentInner {
            nodes: Vec::new(),
            root: NodeId(0),
            created: 0,
            mutations: 0,
        };
        let root = inner.alloc(NodeKind::Element {
            tag: String::from("#document"),
            attrs: Vec::new(),
        });
        inner.root = root;
        // The root is bookkeeping, not rendering output.
        inner.created = 0;
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakDocument {
        WeakDocument {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The synthetic root element every mounted tree hangs under.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.inner.borrow().root
    }

    /// Nodes created since the document was opened.
    #[must_use]
    pub fn created_count(&self) -> u64 {
        self.inner.borrow().created
    }

    /// Writes that actually changed the tree: structural moves, text
    /// edits, attribute edits. Equal-value writes do not count.
    #[must_use]
    pub fn mutation_count(&self) -> u64 {
        self.inner.borrow().mutations
    }

    pub fn create_element(&self, tag: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().alloc(NodeKind::Element {
            tag: tag.into(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&self, value: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().alloc(NodeKind::Text {
            value: value.into(),
        })
    }

    pub fn create_comment(&self, value: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().alloc(NodeKind::Comment {
            value: value.into(),
        })
    }

    // ── Structure ──────────────────────────────────────────────────────

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node).and_then(|data| data.parent)
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .node(node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.inner
            .borrow()
            .node(node)
            .and_then(|data| data.children.get(index).copied())
    }

    #[must_use]
    pub fn child_count(&self, node: NodeId) -> usize {
        self.inner
            .borrow()
            .node(node)
            .map_or(0, |data| data.children.len())
    }

    /// Insert `child` under `parent` before `reference` (append when
    /// `None`). A child that already sits elsewhere is moved, DOM-style.
    pub fn insert_before(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let mut inner = self.inner.borrow_mut();
        if inner.node(child).is_none() || inner.node(parent).is_none() {
            return;
        }
        inner.detach(child);
        let Some(data) = inner.node_mut(parent) else {
            return;
        };
        let position = reference
            .and_then(|r| data.children.iter().position(|&c| c == r))
            .unwrap_or(data.children.len());
        data.children.insert(position, child);
        if let Some(data) = inner.node_mut(child) {
            data.parent = Some(parent);
        }
        inner.mutations += 1;
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Unlink `child` from `parent` without running cleanups; the node
    /// stays alive and can be re-inserted. See [`dispose`](Self::dispose)
    /// for the destructive version.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) {
        let mut inner = self.inner.borrow_mut();
        if inner.node(child).and_then(|data| data.parent) != Some(parent) {
            return;
        }
        inner.detach(child);
        inner.mutations += 1;
    }

    // ── Node state ─────────────────────────────────────────────────────

    #[must_use]
    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(
            self.inner.borrow().node(node).map(|data| &data.kind),
            Some(NodeKind::Element { .. })
        )
    }

    #[must_use]
    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(
            self.inner.borrow().node(node).map(|data| &data.kind),
            Some(NodeKind::Text { .. })
        )
    }

    #[must_use]
    pub fn is_comment(&self, node: NodeId) -> bool {
        matches!(
            self.inner.borrow().node(node).map(|data| &data.kind),
            Some(NodeKind::Comment { .. })
        )
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<String> {
        match self.inner.borrow().node(node).map(|data| &data.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn text(&self, node: NodeId) -> Option<String> {
        match self.inner.borrow().node(node).map(|data| &data.kind) {
            Some(NodeKind::Text { value }) => Some(value.clone()),
            _ => None,
        }
    }

    /// Replace a text node's value; equal values are a no-op.
    pub fn set_text(&self, node: NodeId, value: impl Into<String>) {
        let value = value.into();
        let mut inner = self.inner.borrow_mut();
        let Some(NodeKind::Text { value: current }) =
            inner.node_mut(node).map(|data| &mut data.kind)
        else {
            return;
        };
        if *current == value {
            return;
        }
        *current = value;
        inner.mutations += 1;
    }

    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match self.inner.borrow().node(node).map(|data| &data.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        match self.inner.borrow().node(node).map(|data| &data.kind) {
            Some(NodeKind::Element { attrs, .. }) => attrs.clone(),
            _ => Vec::new(),
        }
    }

    /// Set an attribute, keeping first-write order; equal values are a
    /// no-op.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let mut inner = self.inner.borrow_mut();
        let Some(NodeKind::Element { attrs, .. }) =
            inner.node_mut(node).map(|data| &mut data.kind)
        else {
            return;
        };
        match attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, current)) if *current == value => return,
            Some((_, current)) => *current = value,
            None => attrs.push((name.to_string(), value)),
        }
        inner.mutations += 1;
    }

    /// Remove an attribute; absent names are a no-op.
    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        let mut inner = self.inner.borrow_mut();
        let Some(NodeKind::Element { attrs, .. }) =
            inner.node_mut(node).map(|data| &mut data.kind)
        else {
            return;
        };
        let before = attrs.len();
        attrs.retain(|(key, _)| key != name);
        if attrs.len() != before {
            inner.mutations += 1;
        }
    }

    /// Merge one property into the node's `style` attribute, leaving
    /// unrelated properties alone. Equal values are a no-op.
    pub fn merge_style(&self, node: NodeId, property: &str, value: &str) {
        let current = self.attribute(node, "style").unwrap_or_default();
        let mut entries = parse_style(&current);
        match entries.iter_mut().find(|(key, _)| key == property) {
            Some((_, existing)) if existing == value => return,
            Some((_, existing)) => *existing = value.to_string(),
            None => entries.push((property.to_string(), value.to_string())),
        }
        self.set_attribute(node, "style", render_style(&entries));
    }

    // ── Listeners and cleanups ─────────────────────────────────────────

    /// Attach a listener for `event`. Listeners are additive and live for
    /// the node's lifetime.
    pub fn add_listener(&self, node: NodeId, event: impl Into<String>, handler: EventHandler) {
        if let Some(data) = self.inner.borrow_mut().node_mut(node) {
            data.listeners.push((event.into(), handler));
        }
    }

    #[must_use]
    pub fn has_listener(&self, node: NodeId, event: &str) -> bool {
        self.inner.borrow().node(node).is_some_and(|data| {
            data.listeners.iter().any(|(name, _)| name == event)
        })
    }

    /// Park a cleanup on the node; it runs exactly once when the node is
    /// disposed. The executor uses this to tie effect lifetimes to the
    /// nodes they maintain.
    pub fn add_cleanup(&self, node: NodeId, cleanup: impl FnOnce() + 'static) {
        if let Some(data) = self.inner.borrow_mut().node_mut(node) {
            data.cleanups.push(Box::new(cleanup));
        }
    }

    /// Whether any cleanup is parked on the node; a node with cleanups is
    /// maintained by something and must not be adopted by another owner.
    #[must_use]
    pub fn has_cleanups(&self, node: NodeId) -> bool {
        self.inner
            .borrow()
            .node(node)
            .is_some_and(|data| !data.cleanups.is_empty())
    }

    /// Deliver an event to the node's listeners for `event.name`, inside
    /// one implicit batch so multi-signal handlers notify once. Returns
    /// the number of listeners run. No bubbling: delivery is exact.
    pub fn dispatch(&self, node: NodeId, event: &Event) -> usize {
        let handlers: Vec<EventHandler> = {
            let inner = self.inner.borrow();
            let Some(data) = inner.node(node) else {
                return 0;
            };
            data.listeners
                .iter()
                .filter(|(name, _)| name == &event.name)
                .map(|(_, handler)| Rc::clone(handler))
                .collect()
        };
        if handlers.is_empty() {
            return 0;
        }
        rill_reactive::batch(|| {
            for handler in &handlers {
                handler(event);
            }
        });
        handlers.len()
    }

    /// Tear a subtree down: run cleanups for `node` and then for each
    /// descendant, detach it from its parent, and free every slot.
    /// Cleanups run outside the arena borrow and may re-enter the
    /// document; a panicking cleanup does not stop the others.
    pub fn dispose(&self, node: NodeId) {
        let subtree = {
            let inner = self.inner.borrow();
            if inner.node(node).is_none() {
                return;
            }
            let mut ids = Vec::new();
            let mut stack = vec![node];
            while let Some(id) = stack.pop() {
                ids.push(id);
                if let Some(data) = inner.node(id) {
                    stack.extend(data.children.iter().rev().copied());
                }
            }
            ids
        };

        let mut first_panic: Option<Box<dyn Any + Send>> = None;
        for &id in &subtree {
            // A cleanup may have reentrantly disposed part of the subtree.
            let cleanups = match self.inner.borrow_mut().node_mut(id) {
                Some(data) => std::mem::take(&mut data.cleanups),
                None => continue,
            };
            for cleanup in cleanups {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
                    first_panic.get_or_insert(payload);
                }
            }
        }

        {
            let mut inner = self.inner.borrow_mut();
            let attached = inner.node(node).and_then(|data| data.parent).is_some();
            inner.detach(node);
            if attached {
                inner.mutations += 1;
            }
            for &id in &subtree {
                if let Some(slot) = inner.nodes.get_mut(id.index()) {
                    *slot = None;
                }
            }
        }

        if let Some(payload) = first_panic {
            panic::resume_unwind(payload);
        }
    }

    // ── Serialization ──────────────────────────────────────────────────

    /// Render the node's children as markup, matching the server-side
    /// dialect: five-entity escaping, bare presence attributes, and
    /// self-closing void elements.
    #[must_use]
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_html(&mut out, child);
        }
        out
    }

    /// Render a single node (and its subtree) as markup.
    #[must_use]
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(&mut out, node);
        out
    }

    fn write_html(&self, out: &mut String, node: NodeId) {
        enum Piece {
            Text(String),
            Comment(String),
            Open {
                tag: String,
                attrs: Vec<(String, String)>,
                void: bool,
            },
        }
        let piece = {
            let inner = self.inner.borrow();
            match inner.node(node).map(|data| &data.kind) {
                Some(NodeKind::Text { value }) => Piece::Text(value.clone()),
                Some(NodeKind::Comment { value }) => Piece::Comment(value.clone()),
                Some(NodeKind::Element { tag, attrs }) => Piece::Open {
                    tag: tag.clone(),
                    attrs: attrs.clone(),
                    void: is_void_element(tag),
                },
                None => return,
            }
        };
        match piece {
            Piece::Text(value) => escape_into(out, &value),
            Piece::Comment(value) => {
                out.push_str("<!--");
                out.push_str(&value);
                out.push_str("-->");
            }
            Piece::Open { tag, attrs, void } => {
                out.push('<');
                out.push_str(&tag);
                for (name, value) in &attrs {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        escape_into(out, value);
                        out.push('"');
                    }
                }
                if void {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for child in self.children(node) {
                    self.write_html(out, child);
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let live = inner.nodes.iter().filter(|slot| slot.is_some()).count();
        f.debug_struct("Document")
            .field("live_nodes", &live)
            .field("created", &inner.created)
            .field("mutations", &inner.mutations)
            .finish()
    }
}

fn parse_style(value: &str) -> Vec<(String, String)> {
    value
        .split(';')
        .filter_map(|pair| {
            let (property, value) = pair.split_once(':')?;
            let property = property.trim();
            if property.is_empty() {
                return None;
            }
            Some((property.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn render_style(entries: &[(String, String)]) -> String {
    let mut out = String::new();
    for (i, (property, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(property);
        out.push(':');
        out.push_str(value);
    }
    out
}

//! The tree descriptor: a cheap, immutable value describing UI structure.
//!
//! A [`VNode`] carries no side effects. Executing one against a target
//! (live document or string buffer) is what creates nodes, attaches
//! listeners, and spawns effects; executing the same descriptor again
//! against a live tree re-runs all of that, so re-execution is
//! deliberately not idempotent. Descriptors are `Rc`-backed and clone in
//! O(1), which is what lets component closures return them freely.
//!
//! The kinds are a closed set. Anything dynamic is resolved into one of
//! them at construction time; executors match exhaustively and never
//! interpret values structurally.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::context::ContextKey;
use crate::list::ListKey;
use crate::props::{AttrValue, Event, PropValue, StyleMap};

/// A tree descriptor node.
#[derive(Clone)]
pub enum VNode {
    /// A primitive element with tag, props, and ordered children.
    Element(Rc<ElementNode>),
    /// A deferred component body, invoked once at execution time.
    /// Transparent for addressing: the body's output takes the
    /// component's own position.
    Component(Rc<dyn Fn() -> VNode>),
    /// An ordered group of children with no element of its own. Acts as an
    /// invisible indexing level for addressing.
    Fragment(Rc<[VNode]>),
    /// Static text.
    Text(Rc<str>),
    /// A live text binding, re-read whenever its dependencies change.
    DynText(Rc<dyn Fn() -> String>),
    /// A reactive subtree: the closure is re-executed inside an effect and
    /// its output reconciled in place.
    Dynamic(Rc<dyn Fn() -> VNode>),
    /// A keyed list region.
    List(Rc<ListNode>),
    /// An ambient context entry scoped to the child's execution.
    Scope(Rc<ScopeNode>),
    /// A suspense boundary: children plus fallback, coordinated through
    /// the pending set.
    Suspense(Rc<SuspenseNode>),
    /// Renders nothing and owns nothing.
    Empty,
}

/// Interior of [`VNode::Element`].
pub struct ElementNode {
    pub tag: String,
    /// Insertion-ordered; keys are raw (normalization happens at
    /// application time).
    pub props: Vec<(String, PropValue)>,
    pub children: SmallVec<[VNode; 4]>,
}

/// Interior of [`VNode::List`]: a type-erased keyed projection.
pub struct ListNode {
    /// Tracked snapshot of the current items: key plus a render thunk per
    /// item, in item order. Reading signals inside re-runs the consuming
    /// reconciler.
    pub snapshot: Rc<dyn Fn() -> Vec<ListEntry>>,
}

/// One item of a list snapshot.
#[derive(Clone)]
pub struct ListEntry {
    pub key: ListKey,
    pub render: Rc<dyn Fn() -> VNode>,
}

/// Interior of [`VNode::Scope`].
pub struct ScopeNode {
    pub key: ContextKey,
    pub value: Rc<dyn Any>,
    pub child: VNode,
}

/// Interior of [`VNode::Suspense`].
pub struct SuspenseNode {
    pub children: VNode,
    pub fallback: VNode,
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNode::Element(el) => f
                .debug_struct("Element")
                .field("tag", &el.tag)
                .field("children", &el.children.len())
                .finish(),
            VNode::Component(_) => f.write_str("Component(..)"),
            VNode::Fragment(children) => {
                f.debug_tuple("Fragment").field(&children.len()).finish()
            }
            VNode::Text(text) => f.debug_tuple("Text").field(text).finish(),
            VNode::DynText(_) => f.write_str("DynText(..)"),
            VNode::Dynamic(_) => f.write_str("Dynamic(..)"),
            VNode::List(_) => f.write_str("List(..)"),
            VNode::Scope(scope) => f.debug_tuple("Scope").field(&scope.key).finish(),
            VNode::Suspense(_) => f.write_str("Suspense(..)"),
            VNode::Empty => f.write_str("Empty"),
        }
    }
}

impl From<&str> for VNode {
    fn from(value: &str) -> Self {
        text(value)
    }
}

impl From<String> for VNode {
    fn from(value: String) -> Self {
        text(value)
    }
}

/// Static text node.
#[must_use]
pub fn text(value: impl Into<String>) -> VNode {
    VNode::Text(Rc::from(value.into()))
}

/// Live text binding: re-reads `f` whenever signals it read change.
#[must_use]
pub fn dyn_text<S: Into<String>>(f: impl Fn() -> S + 'static) -> VNode {
    VNode::DynText(Rc::new(move || f().into()))
}

/// Ordered group of children without an element of its own.
#[must_use]
pub fn fragment(children: impl IntoIterator<Item = VNode>) -> VNode {
    VNode::Fragment(children.into_iter().collect())
}

/// Deferred component body, invoked once when the descriptor executes.
#[must_use]
pub fn component(f: impl Fn() -> VNode + 'static) -> VNode {
    VNode::Component(Rc::new(f))
}

/// Reactive subtree: `f` re-executes inside an effect and its output is
/// reconciled into the region it occupies.
#[must_use]
pub fn dynamic(f: impl Fn() -> VNode + 'static) -> VNode {
    VNode::Dynamic(Rc::new(f))
}

/// Start building an element descriptor.
#[must_use]
pub fn el(tag: impl Into<String>) -> ElementBuilder {
    ElementBuilder {
        tag: tag.into(),
        props: Vec::new(),
        children: SmallVec::new(),
    }
}

/// Builder for [`VNode::Element`].
#[derive(Debug)]
pub struct ElementBuilder {
    tag: String,
    props: Vec<(String, PropValue)>,
    children: SmallVec<[VNode; 4]>,
}

impl ElementBuilder {
    /// Static attribute. `AttrValue::Bool(true)` renders presence-only,
    /// `Bool(false)` and `Null` render nothing.
    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.props.push((key.into(), PropValue::Attr(value.into())));
        self
    }

    /// Dynamic attribute bound through an effect: re-evaluated whenever
    /// signals read inside `f` change.
    #[must_use]
    pub fn dyn_attr<V: Into<AttrValue>>(
        mut self,
        key: impl Into<String>,
        f: impl Fn() -> V + 'static,
    ) -> Self {
        self.props.push((
            key.into(),
            PropValue::DynAttr(Rc::new(move || f().into())),
        ));
        self
    }

    /// Shorthand for `attr("class", ...)`.
    #[must_use]
    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value.into())
    }

    /// Event listener for `event` (`"click"`, `"input"`, ...). Handler
    /// bodies run inside an implicit batch.
    #[must_use]
    pub fn on(mut self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.props
            .push((format!("on{event}"), PropValue::Handler(Rc::new(handler))));
        self
    }

    /// Inline style map, applied property-by-property.
    #[must_use]
    pub fn style(mut self, style: StyleMap) -> Self {
        self.props
            .push((String::from("style"), PropValue::Style(style)));
        self
    }

    #[must_use]
    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
        self.children.extend(children);
        self
    }

    #[must_use]
    pub fn build(self) -> VNode {
        VNode::Element(Rc::new(ElementNode {
            tag: self.tag,
            props: self.props,
            children: self.children,
        }))
    }
}

impl From<ElementBuilder> for VNode {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

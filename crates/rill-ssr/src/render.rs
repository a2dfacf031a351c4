//! The string executor.
//!
//! Walks a descriptor tree and writes the markup dialect the client
//! reader and hydrator consume: every element stamped with its
//! `data-rill` address, five-entity escaping, presence attributes bare,
//! void elements self-closed, and a `<!---->` separator between adjacent
//! text runs so the client can tell them apart.
//!
//! Live constructs flatten to their current value: dynamic closures are
//! invoked exactly once per pass, handlers are skipped entirely. Suspense
//! boundaries probe their children against a boundary-local pending set
//! and emit the fallback when resources are still outstanding; the async
//! entry points drive those resources and re-render until the tree
//! settles or the pass budget runs out.

use std::rc::Rc;

use futures::executor::block_on;
use futures::future::join_all;
use rill_tree::markup::escape_into;
use rill_tree::props::normalize_prop_key;
use rill_tree::{
    AttrValue, ElementNode, Frame, HYDRATION_ATTR, PendingSet, PropValue, StyleMap, SuspenseNode,
    VNode, is_void_element, with_frame,
};
use tracing::{debug, warn};

const DEFAULT_MAX_PASSES: usize = 5;

/// Knobs for the async render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsrOptions {
    max_passes: usize,
}

impl Default for SsrOptions {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl SsrOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on render passes before giving up on unresolved
    /// resources and shipping fallbacks. Clamped to at least one.
    #[must_use]
    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }
}

/// Render one synchronous pass. Suspense boundaries with outstanding
/// resources emit their fallback; nothing is driven.
pub fn render_to_string(component: impl Fn() -> VNode) -> String {
    let frame = Rc::new(Frame::root());
    render_pass(&component, &frame)
}

/// Render and drive resources to completion, re-rendering until the tree
/// settles (bounded by the default pass budget).
pub fn render_to_string_async(component: impl Fn() -> VNode) -> String {
    render_to_string_async_with(component, SsrOptions::default())
}

/// [`render_to_string_async`] with explicit [`SsrOptions`].
pub fn render_to_string_async_with(component: impl Fn() -> VNode, options: SsrOptions) -> String {
    let frame = Rc::new(Frame::root());
    let mut passes = 1usize;
    let mut html = render_pass(&component, &frame);
    loop {
        let futures = frame.pending().take_futures();
        if futures.is_empty() {
            debug!(passes, "server render settled");
            return html;
        }
        if passes >= options.max_passes {
            warn!(passes, "render pass budget exhausted, shipping fallbacks");
            return html;
        }
        block_on(join_all(futures));
        html = render_pass(&component, &frame);
        passes += 1;
    }
}

fn render_pass(component: &impl Fn() -> VNode, frame: &Rc<Frame>) -> String {
    let tree = with_frame(Rc::clone(frame), component);
    let mut out = String::new();
    let mut last_text = false;
    write_node(&mut out, &tree, frame, &mut last_text);
    out
}

/// `last_text` tracks whether the previous sibling written in the current
/// parent scope ended as raw text; it is shared through fragments,
/// components, and scopes so separators land between *rendered* neighbors
/// regardless of descriptor nesting.
fn write_node(out: &mut String, node: &VNode, frame: &Rc<Frame>, last_text: &mut bool) {
    match node {
        VNode::Empty => {}
        VNode::Text(value) => write_text(out, value, last_text),
        VNode::DynText(f) => {
            let value = with_frame(Rc::clone(frame), &**f);
            write_text(out, &value, last_text);
        }
        VNode::Fragment(children) => {
            for (i, child) in children.iter().enumerate() {
                let child_frame = Rc::new(frame.child(child_index(i)));
                write_node(out, child, &child_frame, last_text);
            }
        }
        VNode::Component(body) => {
            let produced = with_frame(Rc::clone(frame), &**body);
            write_node(out, &produced, frame, last_text);
        }
        VNode::Scope(scope) => {
            let scoped = Rc::new(frame.with_ambient(scope.key, Rc::clone(&scope.value)));
            write_node(out, &scope.child, &scoped, last_text);
        }
        VNode::Element(element) => {
            write_element(out, element, frame);
            *last_text = false;
        }
        VNode::Dynamic(f) => {
            open_container(out, frame);
            let content_frame = Rc::new(frame.child(0));
            let produced = with_frame(Rc::clone(&content_frame), &**f);
            let mut inner_text = false;
            write_node(out, &produced, &content_frame, &mut inner_text);
            out.push_str("</div>");
            *last_text = false;
        }
        VNode::List(list) => {
            open_container(out, frame);
            let entries = with_frame(Rc::clone(frame), &*list.snapshot);
            let mut inner_text = false;
            for (i, entry) in entries.iter().enumerate() {
                let item_frame = Rc::new(frame.child(child_index(i)));
                let produced = with_frame(Rc::clone(&item_frame), &*entry.render);
                write_node(out, &produced, &item_frame, &mut inner_text);
            }
            out.push_str("</div>");
            *last_text = false;
        }
        VNode::Suspense(suspense) => {
            write_suspense(out, suspense, frame);
            *last_text = false;
        }
    }
}

fn write_text(out: &mut String, value: &str, last_text: &mut bool) {
    if *last_text {
        out.push_str("<!---->");
    }
    escape_into(out, value);
    *last_text = true;
}

fn write_element(out: &mut String, element: &ElementNode, frame: &Rc<Frame>) {
    out.push('<');
    out.push_str(&element.tag);
    write_stamp(out, frame);
    for (key, prop) in &element.props {
        let key = normalize_prop_key(key);
        match prop {
            // Wire format carries no behavior; the client rebinds.
            PropValue::Handler(_) => {}
            PropValue::Attr(value) => write_attr(out, key, value),
            PropValue::DynAttr(f) => {
                let value = with_frame(Rc::clone(frame), &**f);
                write_attr(out, key, &value);
            }
            PropValue::Style(map) => write_style(out, map),
        }
    }
    if is_void_element(&element.tag) {
        out.push_str(" />");
        return;
    }
    out.push('>');
    let mut last_text = false;
    for (i, child) in element.children.iter().enumerate() {
        let child_frame = Rc::new(frame.child(child_index(i)));
        write_node(out, child, &child_frame, &mut last_text);
    }
    out.push_str("</");
    out.push_str(&element.tag);
    out.push('>');
}

/// The shared region wrapper: dynamic, list, and suspense output all live
/// inside an addressed `display:contents` div, mirroring the client.
fn open_container(out: &mut String, frame: &Rc<Frame>) {
    out.push_str("<div");
    write_stamp(out, frame);
    out.push_str(" style=\"display:contents\">");
}

fn write_suspense(out: &mut String, suspense: &SuspenseNode, frame: &Rc<Frame>) {
    open_container(out, frame);
    let pending = PendingSet::new();
    let content_frame = Rc::new(frame.child(0).with_pending(pending.clone()));
    let mut content = String::new();
    let mut inner_text = false;
    write_node(&mut content, &suspense.children, &content_frame, &mut inner_text);
    // Registered futures bubble up for the async driver either way.
    frame.pending().absorb(&pending);
    if pending.is_idle() {
        out.push_str(&content);
    } else {
        debug!(outstanding = pending.count(), "suspense pending, emitting fallback");
        let fallback_frame = Rc::new(frame.child(0));
        let mut fallback_text = false;
        write_node(out, &suspense.fallback, &fallback_frame, &mut fallback_text);
    }
    out.push_str("</div>");
}

fn write_stamp(out: &mut String, frame: &Rc<Frame>) {
    out.push(' ');
    out.push_str(HYDRATION_ATTR);
    out.push_str("=\"");
    // Addresses are dot-joined digits; nothing to escape.
    out.push_str(&frame.address().to_string());
    out.push('"');
}

fn write_attr(out: &mut String, key: &str, value: &AttrValue) {
    match value {
        AttrValue::Text(text) => {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_into(out, text);
            out.push('"');
        }
        AttrValue::Bool(true) => {
            out.push(' ');
            out.push_str(key);
        }
        AttrValue::Bool(false) | AttrValue::Null => {}
    }
}

fn write_style(out: &mut String, map: &StyleMap) {
    if map.is_empty() {
        return;
    }
    out.push_str(" style=\"");
    escape_into(out, &map.to_string());
    out.push('"');
}

fn child_index(i: usize) -> u32 {
    u32::try_from(i).unwrap_or(u32::MAX)
}

#![forbid(unsafe_code)]

//! Tree descriptors for Rill: the shared vocabulary between the reactive
//! core and the renderers.
//!
//! A UI is described as a [`VNode`] value built with [`el`], [`text`],
//! [`fragment`], and friends. Descriptors are inert and `Rc`-cheap to
//! clone; the `rill-dom` and `rill-ssr` executors give them meaning.
//! This crate also owns everything both executors must agree on:
//!
//! - the prop model ([`props`]): attribute values, event handlers, style
//!   maps, and the `on*`/`className` key conventions;
//! - the ambient render context ([`context`]): the frame stack carrying
//!   each position's [`HydrationPath`] address, provider values, and
//!   suspense accounting; the hydration contract lives here;
//! - keyed list descriptors ([`list`]);
//! - resources and suspense ([`resource`]);
//! - the markup dialect ([`markup`]): escaping, void elements, and the
//!   hydration marker attribute.

pub mod context;
pub mod list;
pub mod markup;
pub mod props;
pub mod resource;
pub mod vnode;

pub use context::{
    Context, ContextKey, Frame, HydrationPath, create_context, current_frame, provide,
    use_context, with_frame,
};
pub use list::{ListKey, each, each_by};
pub use markup::{HYDRATION_ATTR, escape_html, is_void_element};
pub use props::{AttrValue, Event, EventHandler, PropValue, StyleMap};
pub use resource::{PendingSet, Resource, ResourceCache, create_resource, suspense};
pub use vnode::{
    ElementBuilder, ElementNode, ListEntry, ListNode, ScopeNode, SuspenseNode, VNode, component,
    dyn_text, dynamic, el, fragment, text,
};

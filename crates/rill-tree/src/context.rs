//! Ambient render context: the scoped stack of immutable frames carrying
//! each execution position's hierarchical address, provider values, and
//! suspense accounting.
//!
//! A frame is pushed before a child's subtree executes and popped when it
//! finishes, via an RAII guard so exceptional exits stay balanced. Frames
//! are immutable: entering a child position or providing a context value
//! derives a *new* frame, so an effect can capture its frame at creation
//! and re-push the identical environment on every re-run.
//!
//! The address half of the frame is the hydration contract: given
//! identical descriptor structure, the server and client executions
//! assign every element the same [`HydrationPath`].

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::resource::{PendingSet, ResourceCache};
use crate::vnode::{ScopeNode, VNode};

/// Dot-separated positional address of a node (`0`, `0.1`, `0.1.0`).
///
/// The root of a rendered tree is `0`; an element at child position `i`
/// under address `a` is `a.i`. Fragments add an indexing level without an
/// element of their own; components are transparent.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HydrationPath {
    segments: SmallVec<[u32; 8]>,
}

impl HydrationPath {
    /// The address of a tree's root position.
    #[must_use]
    pub fn root() -> Self {
        Self {
            segments: SmallVec::from_slice(&[0]),
        }
    }

    /// The address of child position `index` under this one.
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        let mut segments = self.segments.clone();
        segments.push(index);
        Self { segments }
    }
}

impl fmt::Display for HydrationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for HydrationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HydrationPath({self})")
    }
}

/// Identity of a context, tying an ambient entry to its value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey(u64);

thread_local! {
    static NEXT_CONTEXT_KEY: Cell<u64> = const { Cell::new(0) };
}

/// Typed handle to an ambient value, created by [`create_context`].
///
/// Cloning shares the identity: all clones read and provide the same
/// ambient slot.
pub struct Context<T: 'static> {
    key: ContextKey,
    default: Rc<T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            default: Rc::clone(&self.default),
        }
    }
}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&self.key).finish()
    }
}

/// Create a context with the value returned wherever no provider is in
/// scope.
#[must_use]
pub fn create_context<T: 'static>(default: T) -> Context<T> {
    let key = NEXT_CONTEXT_KEY.with(|next| {
        let id = next.get();
        next.set(id + 1);
        ContextKey(id)
    });
    Context {
        key,
        default: Rc::new(default),
    }
}

/// Scope `value` to `child`'s execution: descendants reading `context`
/// see `value`, siblings and ancestors do not.
#[must_use]
pub fn provide<T: 'static>(context: &Context<T>, value: T, child: VNode) -> VNode {
    VNode::Scope(Rc::new(ScopeNode {
        key: context.key,
        value: Rc::new(value),
        child,
    }))
}

/// Read the nearest provided value for `context`, or its default.
#[must_use]
pub fn use_context<T: 'static>(context: &Context<T>) -> Rc<T> {
    let frame = current_frame();
    match frame.ambient_value(context.key) {
        Some(value) => value
            .downcast::<T>()
            .unwrap_or_else(|_| Rc::clone(&context.default)),
        None => Rc::clone(&context.default),
    }
}

/// Immutable key/value bag of provided ambient values.
#[derive(Clone, Default)]
pub struct AmbientMap {
    entries: Rc<HashMap<ContextKey, Rc<dyn Any>, ahash::RandomState>>,
}

impl AmbientMap {
    #[must_use]
    fn with(&self, key: ContextKey, value: Rc<dyn Any>) -> Self {
        let mut entries: HashMap<_, _, ahash::RandomState> =
            self.entries.as_ref().clone();
        entries.insert(key, value);
        Self {
            entries: Rc::new(entries),
        }
    }

    #[must_use]
    fn get(&self, key: ContextKey) -> Option<Rc<dyn Any>> {
        self.entries.get(&key).cloned()
    }
}

/// One level of the ambient render context.
#[derive(Clone)]
pub struct Frame {
    address: HydrationPath,
    ambient: AmbientMap,
    pending: PendingSet,
    cache: ResourceCache,
}

impl Frame {
    /// A root frame: address `0`, no providers, fresh suspense
    /// accounting. Render entry points start from here.
    #[must_use]
    pub fn root() -> Self {
        Self {
            address: HydrationPath::root(),
            ambient: AmbientMap::default(),
            pending: PendingSet::new(),
            cache: ResourceCache::default(),
        }
    }

    /// This frame moved to child position `index` (address extended,
    /// everything else shared).
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        Self {
            address: self.address.child(index),
            ambient: self.ambient.clone(),
            pending: self.pending.clone(),
            cache: self.cache.clone(),
        }
    }

    /// This frame with one more ambient entry.
    #[must_use]
    pub fn with_ambient(&self, key: ContextKey, value: Rc<dyn Any>) -> Self {
        Self {
            address: self.address.clone(),
            ambient: self.ambient.with(key, value),
            pending: self.pending.clone(),
            cache: self.cache.clone(),
        }
    }

    /// This frame with a different pending set; suspense boundaries use
    /// it to count their own resources separately from the parent's.
    #[must_use]
    pub fn with_pending(&self, pending: PendingSet) -> Self {
        Self {
            address: self.address.clone(),
            ambient: self.ambient.clone(),
            pending,
            cache: self.cache.clone(),
        }
    }

    #[must_use]
    pub fn address(&self) -> &HydrationPath {
        &self.address
    }

    #[must_use]
    pub fn ambient_value(&self, key: ContextKey) -> Option<Rc<dyn Any>> {
        self.ambient.get(key)
    }

    #[must_use]
    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    #[must_use]
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }
}

thread_local! {
    static FRAMES: RefCell<Vec<Rc<Frame>>> = const { RefCell::new(Vec::new()) };
}

/// Run `f` with `frame` as the innermost ambient frame. The stack is
/// restored even if `f` panics.
pub fn with_frame<R>(frame: Rc<Frame>, f: impl FnOnce() -> R) -> R {
    FRAMES.with(|frames| frames.borrow_mut().push(frame));
    let _guard = FrameGuard;
    f()
}

/// The innermost ambient frame, or a fresh root when nothing is
/// executing.
#[must_use]
pub fn current_frame() -> Rc<Frame> {
    FRAMES.with(|frames| frames.borrow().last().cloned())
        .unwrap_or_else(|| Rc::new(Frame::root()))
}

struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn paths_render_dot_separated() {
        let root = HydrationPath::root();
        assert_eq!(root.to_string(), "0");
        assert_eq!(root.child(1).to_string(), "0.1");
        assert_eq!(root.child(1).child(0).to_string(), "0.1.0");
    }

    #[test]
    fn use_context_returns_default_outside_any_provider() {
        let theme = create_context(String::from("light"));
        assert_eq!(*use_context(&theme), "light");
    }

    #[test]
    fn nearest_frame_value_wins() {
        let theme = create_context(String::from("light"));
        let root = Rc::new(Frame::root());
        let dark = Rc::new(root.with_ambient(theme.key, Rc::new(String::from("dark"))));
        let sepia = Rc::new(dark.with_ambient(theme.key, Rc::new(String::from("sepia"))));

        with_frame(Rc::clone(&dark), || {
            assert_eq!(*use_context(&theme), "dark");
            with_frame(Rc::clone(&sepia), || {
                assert_eq!(*use_context(&theme), "sepia");
            });
            // Inner scope popped; outer value visible again.
            assert_eq!(*use_context(&theme), "dark");
        });
        assert_eq!(*use_context(&theme), "light");
    }

    #[test]
    fn contexts_do_not_collide() {
        let theme = create_context(String::from("light"));
        let size = create_context(14u32);
        let root = Rc::new(Frame::root());
        let frame = Rc::new(root.with_ambient(theme.key, Rc::new(String::from("dark"))));
        with_frame(frame, || {
            assert_eq!(*use_context(&theme), "dark");
            assert_eq!(*use_context(&size), 14);
        });
    }

    #[test]
    fn frame_stack_unwinds_on_panic() {
        let frame = Rc::new(Frame::root());
        let result = catch_unwind(AssertUnwindSafe(|| {
            with_frame(frame, || panic!("boom"));
        }));
        assert!(result.is_err());
        FRAMES.with(|frames| assert!(frames.borrow().is_empty()));
    }

    #[test]
    fn child_frames_extend_the_address_and_share_the_rest() {
        let theme = create_context(0u8);
        let root = Frame::root();
        let provided = root.with_ambient(theme.key, Rc::new(7u8));
        let child = provided.child(2);
        assert_eq!(child.address().to_string(), "0.2");
        with_frame(Rc::new(child), || {
            assert_eq!(*use_context(&theme), 7);
        });
    }
}

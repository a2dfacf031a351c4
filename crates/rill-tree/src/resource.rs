//! Resources and suspense accounting.
//!
//! A resource is an async value bound to a signal: reading it yields
//! `None` until the fetch completes. Creation registers the fetch future
//! in the ambient [`PendingSet`], which is how a suspense boundary knows
//! whether anything under it is still loading. Futures are *stored*, not
//! polled, at registration; render entry points drain them upward and
//! drive them (the client after mount, the server between passes).
//!
//! Resolved values land in the ambient [`ResourceCache`] keyed by the
//! resource key, so a server re-render pass (which re-executes every
//! component and would otherwise re-register every fetch) finds the value
//! synchronously and comes up clean.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use rill_reactive::{ReadSignal, WriteSignal, create_signal};

use crate::context::current_frame;
use crate::vnode::{SuspenseNode, VNode};

/// Count of unresolved resources under one suspense boundary, plus the
/// futures that will resolve them.
///
/// The count lives in a signal so a boundary's swap logic can subscribe
/// to it; the futures list is plain storage drained by whoever drives the
/// render (futures move up toward the root, completion still decrements
/// the set they were registered in).
#[derive(Clone)]
pub struct PendingSet {
    count: ReadSignal<usize>,
    set_count: WriteSignal<usize>,
    futures: Rc<RefCell<Vec<LocalBoxFuture<'static, ()>>>>,
}

impl PendingSet {
    #[must_use]
    pub fn new() -> Self {
        let (count, set_count) = create_signal(0usize);
        Self {
            count,
            set_count,
            futures: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Count one unresolved entry and store its future. The stored future
    /// decrements this set's count when it completes, wherever it ends up
    /// being driven.
    pub fn register(&self, fut: impl Future<Output = ()> + 'static) {
        self.set_count.update(|count| *count + 1);
        let set_count = self.set_count.clone();
        self.futures.borrow_mut().push(Box::pin(async move {
            fut.await;
            set_count.update(|count| count.saturating_sub(1));
        }));
    }

    /// Unresolved entries under this set. A tracked read: an effect
    /// reading this re-runs when the count changes.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.get()
    }

    /// Whether nothing under this set is still loading (tracked).
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.count() == 0
    }

    /// Futures queued for the driver, including ones absorbed from
    /// nested boundaries.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.futures.borrow().len()
    }

    /// Drain the stored futures for driving.
    #[must_use]
    pub fn take_futures(&self) -> Vec<LocalBoxFuture<'static, ()>> {
        std::mem::take(&mut *self.futures.borrow_mut())
    }

    /// Move `other`'s stored futures into this set without touching either
    /// count. Suspense boundaries hand their children's fetches up this
    /// way so the root driver sees every outstanding future.
    pub fn absorb(&self, other: &PendingSet) {
        let mut taken = other.take_futures();
        self.futures.borrow_mut().append(&mut taken);
    }
}

impl Default for PendingSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolved resource values, keyed by resource key.
///
/// Shared by every frame derived from one render root; `Rc<dyn Any>`
/// entries are downcast back through the typed [`create_resource`] call.
#[derive(Clone, Default)]
pub struct ResourceCache {
    entries: Rc<RefCell<HashMap<String, Rc<dyn Any>, ahash::RandomState>>>,
}

impl ResourceCache {
    #[must_use]
    pub fn get<T: 'static>(&self, key: &str) -> Option<Rc<T>> {
        let value = self.entries.borrow().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    pub fn insert<T: 'static>(&self, key: String, value: Rc<T>) {
        self.entries.borrow_mut().insert(key, value);
    }
}

/// Read handle to an async value: `None` while loading.
pub struct Resource<T: 'static> {
    state: ReadSignal<Option<T>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: 'static> Resource<T> {
    /// Whether the value has not arrived yet (tracked).
    #[must_use]
    pub fn loading(&self) -> bool {
        self.state.with(Option::is_none)
    }
}

impl<T: Clone + 'static> Resource<T> {
    /// The value, once resolved (tracked).
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.state.get()
    }
}

/// Create a resource: check the ambient cache, otherwise register the
/// fetch in the ambient pending set and resolve the returned handle when
/// it completes.
///
/// `key` identifies the resource across server render passes; two
/// resources with the same key share one cached value.
#[must_use]
pub fn create_resource<T, Fut>(
    key: impl Into<String>,
    fetcher: impl FnOnce() -> Fut + 'static,
) -> Resource<T>
where
    T: Clone + PartialEq + 'static,
    Fut: Future<Output = T> + 'static,
{
    let key = key.into();
    let frame = current_frame();

    if let Some(cached) = frame.cache().get::<T>(&key) {
        tracing::debug!(resource = %key, "resource served from cache");
        let (state, _set_state) = create_signal(Some((*cached).clone()));
        return Resource { state };
    }

    tracing::debug!(resource = %key, "resource fetch registered");
    let (state, set_state) = create_signal(None::<T>);
    let cache = frame.cache().clone();
    frame.pending().register(async move {
        let value = fetcher().await;
        cache.insert(key, Rc::new(value.clone()));
        set_state.set(Some(value));
    });
    Resource { state }
}

/// A suspense boundary: render `children`, but show `fallback` while any
/// resource created under the boundary is still loading.
#[must_use]
pub fn suspense(children: VNode, fallback: VNode) -> VNode {
    VNode::Suspense(Rc::new(SuspenseNode { children, fallback }))
}

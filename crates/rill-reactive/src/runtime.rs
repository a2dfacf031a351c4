//! Thread-local reactive runtime: current-subscriber tracking, batching,
//! and the pending queue.
//!
//! The runtime is deliberately not a public type. All interaction goes
//! through [`batch`], [`untrack`], and the crate-internal hooks used by
//! signals and effects. State lives in a thread local because execution is
//! single-threaded and synchronous by design; threading a runtime handle
//! through every signal read would leak into every closure signature in the
//! tree layer.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::effect::{EffectInner, SubscriberId};
use crate::signal::SharedSubscribers;

/// Insertion-ordered, deduplicated set of subscribers awaiting a batch
/// flush. The map key is the subscriber id; the value keeps the effect
/// alive until it runs.
type PendingQueue = IndexMap<SubscriberId, Rc<EffectInner>, ahash::RandomState>;

struct Runtime {
    /// The subscriber currently executing, if any. Signal reads register
    /// against this.
    current: RefCell<Option<Rc<EffectInner>>>,
    /// When false, signal reads do not register dependencies (see
    /// [`untrack`]).
    tracking: Cell<bool>,
    /// Reentrant batch depth. Notifications are deferred while > 0.
    batch_depth: Cell<usize>,
    /// Subscribers marked pending during the active batch.
    pending: RefCell<PendingQueue>,
}

thread_local! {
    static RUNTIME: Runtime = Runtime {
        current: RefCell::new(None),
        tracking: Cell::new(true),
        batch_depth: Cell::new(0),
        pending: RefCell::new(PendingQueue::default()),
    };
}

/// Register `subscribers` as a dependency of the currently-executing
/// subscriber, if there is one and tracking is enabled. Called from signal
/// reads.
pub(crate) fn track(subscribers: &SharedSubscribers) {
    RUNTIME.with(|rt| {
        if !rt.tracking.get() {
            return;
        }
        if let Some(current) = rt.current.borrow().as_ref() {
            let newly_added = subscribers
                .borrow_mut()
                .subscribe(current.id(), Rc::downgrade(current));
            // Reading the same signal twice in one run registers once.
            if newly_added {
                current.add_source(subscribers);
            }
        }
    });
}

/// Deliver a change notification to every live subscriber in `subscribers`.
///
/// Iterates a snapshot taken up front, so a subscriber that mutates the
/// subscription list mid-notification (by re-running, subscribing, or
/// disposing others) cannot invalidate the walk. Dead `Weak` entries are
/// pruned as a side effect of snapshotting.
pub(crate) fn notify(subscribers: &SharedSubscribers) {
    let snapshot = subscribers.borrow_mut().snapshot();
    if snapshot.is_empty() {
        return;
    }
    let immediate = RUNTIME.with(|rt| {
        if rt.batch_depth.get() > 0 {
            let mut pending = rt.pending.borrow_mut();
            for effect in snapshot {
                pending.entry(effect.id()).or_insert(effect);
            }
            None
        } else {
            Some(snapshot)
        }
    });
    if let Some(effects) = immediate {
        for effect in &effects {
            EffectInner::run(effect);
        }
    }
}

/// Swap in `effect` as the current subscriber, returning the previous one.
pub(crate) fn swap_current(effect: Option<Rc<EffectInner>>) -> Option<Rc<EffectInner>> {
    RUNTIME.with(|rt| rt.current.replace(effect))
}

/// The currently-executing subscriber, if any.
pub(crate) fn current() -> Option<Rc<EffectInner>> {
    RUNTIME.with(|rt| rt.current.borrow().clone())
}

/// Run `f` with dependency tracking suspended. Signal reads inside `f`
/// return values without registering the current subscriber.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let prev = RUNTIME.with(|rt| rt.tracking.replace(false));
    let guard = TrackingGuard { prev };
    let result = f();
    drop(guard);
    result
}

struct TrackingGuard {
    prev: bool,
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        RUNTIME.with(|rt| rt.tracking.set(self.prev));
    }
}

/// Defer subscriber notification until `f` returns, then run each pending
/// subscriber exactly once, in the order it was first marked pending.
///
/// Batches nest; only the outermost exit flushes. A subscriber marked
/// pending by several distinct writes within one batch still runs once,
/// observing the final values.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    RUNTIME.with(|rt| rt.batch_depth.set(rt.batch_depth.get() + 1));
    let guard = BatchGuard;
    let result = f();
    drop(guard);
    result
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let depth = RUNTIME.with(|rt| {
            let depth = rt.batch_depth.get() - 1;
            rt.batch_depth.set(depth);
            depth
        });
        // Flushing during unwind would run arbitrary user code inside a
        // panic; leave the queue for the next outermost batch instead.
        if depth == 0 && !std::thread::panicking() {
            flush();
        }
    }
}

/// Drain the pending queue, running each subscriber once in insertion
/// order. Writes performed by a flushed subscriber execute immediately
/// (the batch is already closed); a nested `batch` inside a subscriber
/// flushes on its own exit.
fn flush() {
    loop {
        let drained = RUNTIME.with(|rt| std::mem::take(&mut *rt.pending.borrow_mut()));
        if drained.is_empty() {
            return;
        }
        for (_, effect) in drained {
            EffectInner::run(&effect);
        }
    }
}

#![forbid(unsafe_code)]

//! Effects: re-executable units of work with automatic dependency tracking.
//!
//! # Design
//!
//! [`create_effect`] runs its closure immediately with the effect installed
//! as the current subscriber; every signal read during that run registers
//! the effect as a dependent. Before each re-run, *all* previous
//! registrations and cleanup callbacks are torn down, then the closure runs
//! again and records a fresh dependency set. This is what makes conditional
//! tracking self-adjusting: a signal read only under a condition that has
//! since flipped simply never re-registers, so it can no longer trigger the
//! effect.
//!
//! Ownership is explicit. Signals hold `Weak` handles to the effect; the
//! effect owns the list of subscriber sets it registered in and releases
//! those registrations on teardown. Disposal therefore always walks from
//! the subscriber outward and never relies on a signal noticing a dead
//! dependent on its own.
//!
//! The returned [`Effect`] handle owns the computation: dropping it (or
//! calling [`Effect::dispose`]) tears the effect down, runs its cleanups,
//! and makes any already-scheduled execution a no-op.
//!
//! # Failure Modes
//!
//! - **Closure panics**: the current-subscriber slot is restored by an RAII
//!   guard, so the runtime stays usable; registrations made before the
//!   panic remain until the next teardown.
//! - **Cleanup panics**: every remaining cleanup still runs; the first
//!   panic payload is re-raised once the list is finished.

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::rc::Rc;

use crate::runtime;
use crate::signal::SharedSubscribers;

/// Identity of a subscriber, used for registration bookkeeping and pending
/// queue deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SubscriberId(u64);

thread_local! {
    static NEXT_SUBSCRIBER_ID: Cell<u64> = const { Cell::new(0) };
}

fn next_subscriber_id() -> SubscriberId {
    NEXT_SUBSCRIBER_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        SubscriberId(id)
    })
}

/// Shared interior of an effect.
pub(crate) struct EffectInner {
    id: SubscriberId,
    /// The work closure. `None` once disposed. Stored behind `Rc` so a run
    /// can release the borrow before invoking it, which keeps re-entrant
    /// execution (an unbatched self-write) legal rather than a borrow
    /// panic.
    run_fn: RefCell<Option<Rc<dyn Fn()>>>,
    /// Subscriber sets this effect is currently registered in. Cleared and
    /// released on every teardown.
    sources: RefCell<Vec<SharedSubscribers>>,
    /// Callbacks registered via [`on_cleanup`] during the last run.
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    disposed: Cell<bool>,
}

impl EffectInner {
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    /// Record that this effect is registered in `source`. Called by the
    /// runtime only on first registration per signal per run.
    pub(crate) fn add_source(&self, source: &SharedSubscribers) {
        self.sources.borrow_mut().push(Rc::clone(source));
    }

    pub(crate) fn push_cleanup(&self, cleanup: Box<dyn FnOnce()>) {
        self.cleanups.borrow_mut().push(cleanup);
    }

    /// Execute the effect: tear down the previous run, install as current
    /// subscriber, run the closure, restore the previous subscriber.
    ///
    /// A disposed effect is a no-op even if it was already scheduled.
    pub(crate) fn run(this: &Rc<Self>) {
        if this.disposed.get() {
            return;
        }
        this.teardown();
        let work = {
            let slot = this.run_fn.borrow();
            match slot.as_ref() {
                Some(work) => Rc::clone(work),
                None => return,
            }
        };
        let prev = runtime::swap_current(Some(Rc::clone(this)));
        let _guard = CurrentGuard { prev: Some(prev) };
        work();
    }

    /// Release every signal registration and run the cleanup list.
    ///
    /// Cleanups run in registration order. Each one runs even if an earlier
    /// one panicked; the first panic payload is re-raised at the end.
    fn teardown(&self) {
        let sources = std::mem::take(&mut *self.sources.borrow_mut());
        for source in sources {
            source.borrow_mut().unsubscribe(self.id);
        }
        let cleanups = std::mem::take(&mut *self.cleanups.borrow_mut());
        let mut first_panic = None;
        for cleanup in cleanups {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(cleanup)) {
                first_panic.get_or_insert(payload);
            }
        }
        if let Some(payload) = first_panic {
            resume_unwind(payload);
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.teardown();
        self.run_fn.borrow_mut().take();
    }
}

/// Restores the previous current-subscriber on drop, so a panicking effect
/// body cannot leave itself installed.
struct CurrentGuard {
    prev: Option<Option<Rc<EffectInner>>>,
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        if let Some(prev) = self.prev.take() {
            runtime::swap_current(prev);
        }
    }
}

/// Owning handle to a running effect.
///
/// The handle is the effect's lifetime: dropping it disposes the effect
/// (releases all signal registrations, runs cleanups, and turns any
/// scheduled execution into a no-op). Rendering code typically parks the
/// handle in the cleanup list of the node the effect maintains, so the
/// effect dies exactly when its node does.
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Tear the effect down now instead of at drop time.
    pub fn dispose(self) {
        // Drop does the work.
    }

    /// Whether the effect has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id.0)
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

/// Create an effect and run it once immediately.
///
/// The effect re-runs whenever a signal it read during its *last* run
/// changes. Creating effects inside `f` is legal; nested effects are
/// independent of the outer one and live as long as their own handles.
#[must_use = "dropping the handle disposes the effect"]
pub fn create_effect(f: impl Fn() + 'static) -> Effect {
    let inner = Rc::new(EffectInner {
        id: next_subscriber_id(),
        run_fn: RefCell::new(Some(Rc::new(f))),
        sources: RefCell::new(Vec::new()),
        cleanups: RefCell::new(Vec::new()),
        disposed: Cell::new(false),
    });
    EffectInner::run(&inner);
    Effect { inner }
}

/// Register `f` to run the next time the currently-executing effect is torn
/// down (before its re-run, or on dispose). Outside any effect this is a
/// no-op.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    if let Some(current) = runtime::current() {
        current.push_cleanup(Box::new(f));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

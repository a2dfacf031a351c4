#![forbid(unsafe_code)]

//! Reactive signal cells.
//!
//! A [`Signal`] is a shared mutable value with subscriber tracking. Reading
//! it while an effect executes registers that effect as a dependent; writing
//! a different value notifies every live dependent. [`create_signal`] splits
//! the same cell into a [`ReadSignal`] / [`WriteSignal`] handle pair for
//! APIs that hand the two capabilities to different owners.
//!
//! # Invariants
//!
//! 1. `set` with a value equal (`PartialEq`) to the current one is a no-op:
//!    no store, no notification.
//! 2. Subscribers are held as `Weak` handles; a dropped effect is pruned
//!    lazily during notification and never observed again.
//! 3. Notification iterates a snapshot of the subscriber list taken before
//!    the first subscriber runs.
//! 4. Reads outside any effect (or under [`crate::untrack`]) return the
//!    value without registering anything.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::effect::{EffectInner, SubscriberId};
use crate::runtime;

/// Registration-ordered set of weak subscriber handles. One per signal.
#[derive(Default)]
pub(crate) struct SubscriberSet {
    entries: IndexMap<SubscriberId, Weak<EffectInner>, ahash::RandomState>,
}

impl SubscriberSet {
    /// Register `subscriber` under `id`. Returns true when the id was not
    /// already present (first read of this signal in the current run).
    pub(crate) fn subscribe(&mut self, id: SubscriberId, subscriber: Weak<EffectInner>) -> bool {
        match self.entries.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(subscriber);
                true
            }
        }
    }

    /// Drop the registration for `id`, preserving the order of the rest.
    pub(crate) fn unsubscribe(&mut self, id: SubscriberId) {
        self.entries.shift_remove(&id);
    }

    /// Upgrade every live subscriber in registration order, pruning dead
    /// entries as a side effect.
    pub(crate) fn snapshot(&mut self) -> Vec<Rc<EffectInner>> {
        let mut live = Vec::with_capacity(self.entries.len());
        self.entries.retain(|_, weak| match weak.upgrade() {
            Some(strong) => {
                live.push(strong);
                true
            }
            None => false,
        });
        live
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Shared handle to a signal's subscriber set. Effects hold clones of this
/// so teardown can release registrations without going through the signal.
pub(crate) type SharedSubscribers = Rc<RefCell<SubscriberSet>>;

struct SignalInner<T> {
    value: RefCell<T>,
    subscribers: SharedSubscribers,
}

/// A shared reactive cell.
///
/// Cloning a `Signal` creates a new handle to the **same** cell. For the
/// split-handle form used by most rendering code, see [`create_signal`].
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    /// Create a new signal holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(initial),
                subscribers: Rc::new(RefCell::new(SubscriberSet::default())),
            }),
        }
    }

    /// Split this cell into read and write handles sharing the same state.
    #[must_use]
    pub fn split(&self) -> (ReadSignal<T>, WriteSignal<T>) {
        (
            ReadSignal {
                inner: Rc::clone(&self.inner),
            },
            WriteSignal {
                inner: Rc::clone(&self.inner),
            },
        )
    }

    /// Access the current value by reference, registering the current
    /// subscriber as a dependent.
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to this same signal (re-entrant borrow).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        runtime::track(&self.inner.subscribers);
        f(&self.inner.value.borrow())
    }

    /// Access the current value by reference without registering anything.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Current value, registering the current subscriber as a dependent.
    #[must_use]
    pub fn get(&self) -> T {
        runtime::track(&self.inner.subscribers);
        self.inner.value.borrow().clone()
    }

    /// Current value without dependency registration.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Store `next` and notify dependents, unless it equals the current
    /// value (in which case nothing happens at all).
    pub fn set(&self, next: T) {
        {
            let current = self.inner.value.borrow();
            if *current == next {
                return;
            }
        }
        *self.inner.value.borrow_mut() = next;
        runtime::notify(&self.inner.subscribers);
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Compute the next value from the previous one, then [`set`](Self::set)
    /// it (with the same equality gate).
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = {
            let current = self.inner.value.borrow();
            f(&current)
        };
        self.set(next);
    }
}

/// Read handle to a signal, produced by [`create_signal`].
pub struct ReadSignal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadSignal")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

impl<T: 'static> ReadSignal<T> {
    /// Access the current value by reference, registering the current
    /// subscriber as a dependent.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        runtime::track(&self.inner.subscribers);
        f(&self.inner.value.borrow())
    }

    /// Access the current value by reference without registering anything.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }
}

impl<T: Clone + 'static> ReadSignal<T> {
    /// Current value, registering the current subscriber as a dependent.
    #[must_use]
    pub fn get(&self) -> T {
        runtime::track(&self.inner.subscribers);
        self.inner.value.borrow().clone()
    }

    /// Current value without dependency registration.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

/// Write handle to a signal, produced by [`create_signal`].
pub struct WriteSignal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: PartialEq + 'static> WriteSignal<T> {
    /// Store `next` and notify dependents, unless it equals the current
    /// value.
    pub fn set(&self, next: T) {
        {
            let current = self.inner.value.borrow();
            if *current == next {
                return;
            }
        }
        *self.inner.value.borrow_mut() = next;
        runtime::notify(&self.inner.subscribers);
    }
}

impl<T: Clone + PartialEq + 'static> WriteSignal<T> {
    /// Compute the next value from the previous one, then set it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = {
            let current = self.inner.value.borrow();
            f(&current)
        };
        self.set(next);
    }
}

/// Create a signal and return its `(read, write)` handle pair.
#[must_use]
pub fn create_signal<T: 'static>(initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
    Signal::new(initial).split()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

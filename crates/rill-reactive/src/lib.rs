#![forbid(unsafe_code)]

//! Fine-grained reactive dependency graph for Rill.
//!
//! This crate provides the state layer the renderers are built on:
//!
//! - [`Signal`]: a mutable reactive cell with subscriber tracking, plus the
//!   split [`ReadSignal`]/[`WriteSignal`] handles from [`create_signal`].
//! - [`Effect`]: a re-executable unit of work created by [`create_effect`]
//!   that records which signals it read and re-runs when any of them change.
//! - [`Memo`]: a cached derived signal kept fresh by an internal effect.
//! - [`batch`]: a deferred-notification scope collapsing multiple writes
//!   into a single flush.
//!
//! # Architecture
//!
//! Everything is single-threaded: `Rc`/`RefCell`/`Cell` shared state and a
//! thread-local runtime holding the currently-executing subscriber, the
//! batch depth, and the pending queue. Signals store their subscribers as
//! `Weak` handles and prune dead ones lazily during notification; each
//! effect owns the list of subscriber lists it registered in and releases
//! those registrations on teardown, so disposal always walks from the
//! subscriber outward.
//!
//! # Invariants
//!
//! 1. Writing a value equal (`PartialEq`) to the current one is a no-op:
//!    no store, no notification.
//! 2. Before each effect execution, all of its previous registrations and
//!    cleanups are torn down, so dependencies read only under a condition
//!    that has since flipped never retrigger it.
//! 3. Notification iterates a snapshot of the subscriber list, never the
//!    live list, so subscription changes mid-notification are safe.
//! 4. Within one batch flush, subscribers run in the order they were first
//!    marked pending, exactly once each.
//! 5. A disposed effect never executes again, even if already scheduled.

pub mod effect;
pub mod memo;
pub mod runtime;
pub mod signal;

pub use effect::{Effect, create_effect, on_cleanup};
pub use memo::{Memo, create_memo};
pub use runtime::{batch, untrack};
pub use signal::{ReadSignal, Signal, WriteSignal, create_signal};

#![forbid(unsafe_code)]

//! Memos: cached derived values that re-compute only when a dependency
//! changes, and notify dependents only when the result actually differs.
//!
//! A memo is a signal fed by an internal effect. The effect tracks whatever
//! the computation reads and writes the result back into the signal; the
//! signal's equality gate then decides whether downstream subscribers hear
//! about it. A recompute that lands on an equal value is therefore silent,
//! which is what keeps diamond-shaped graphs from amplifying a single write
//! into a cascade.

use std::rc::Rc;

use crate::effect::{Effect, create_effect};
use crate::signal::{ReadSignal, create_signal};

/// Handle to a cached derived value.
///
/// Cloning shares the computation: all clones observe the same cache, and
/// the underlying effect lives until the last clone drops.
pub struct Memo<T: 'static> {
    value: ReadSignal<Option<T>>,
    _effect: Rc<Effect>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _effect: Rc::clone(&self._effect),
        }
    }
}

impl<T: 'static> Memo<T> {
    /// Read the cached value by reference, registering the current
    /// subscriber if one is installed.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.value.with(|slot| {
            // The internal effect runs eagerly at creation, so the slot is
            // always populated by the time a handle exists.
            f(slot.as_ref().expect("memo computed on creation"))
        })
    }
}

impl<T: Clone + 'static> Memo<T> {
    /// Clone the cached value out, registering the current subscriber if
    /// one is installed.
    #[must_use]
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.with(|value| f.debug_tuple("Memo").field(value).finish())
    }
}

/// Create a memo from a tracked computation, evaluating it once
/// immediately.
///
/// `f` re-runs whenever a signal it read during its last evaluation
/// changes; dependents re-run only when the freshly computed value is
/// unequal to the cached one.
#[must_use]
pub fn create_memo<T: PartialEq + 'static>(f: impl Fn() -> T + 'static) -> Memo<T> {
    let (value, set_value) = create_signal(None::<T>);
    let effect = create_effect(move || {
        set_value.set(Some(f()));
    });
    Memo {
        value,
        _effect: Rc::new(effect),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::create_effect;
    use crate::runtime::batch;
    use crate::signal::create_signal;
    use std::cell::Cell;

    #[test]
    fn computes_eagerly_and_caches() {
        let computations = Rc::new(Cell::new(0));
        let computations_in = Rc::clone(&computations);
        let memo = create_memo(move || {
            computations_in.set(computations_in.get() + 1);
            21 * 2
        });
        assert_eq!(computations.get(), 1);
        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        // Reads hit the cache, not the computation.
        assert_eq!(computations.get(), 1);
    }

    #[test]
    fn recomputes_when_a_dependency_changes() {
        let (count, set_count) = create_signal(1);
        let memo = create_memo(move || count.get() * 10);
        assert_eq!(memo.get(), 10);
        set_count.set(3);
        assert_eq!(memo.get(), 30);
    }

    #[test]
    fn equal_results_do_not_notify_dependents() {
        let (count, set_count) = create_signal(1);
        let parity = create_memo(move || count.get() % 2);
        let runs = Rc::new(Cell::new(0));
        let runs_in = Rc::clone(&runs);
        let parity_read = parity.clone();
        let _effect = create_effect(move || {
            let _ = parity_read.get();
            runs_in.set(runs_in.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        // 1 -> 3: parity unchanged, dependent stays quiet.
        set_count.set(3);
        assert_eq!(runs.get(), 1);

        // 3 -> 4: parity flips, dependent re-runs.
        set_count.set(4);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn memo_chains_propagate() {
        let (count, set_count) = create_signal(1);
        let doubled = create_memo(move || count.get() * 2);
        let doubled_read = doubled.clone();
        let quadrupled = create_memo(move || doubled_read.get() * 2);
        assert_eq!(quadrupled.get(), 4);
        set_count.set(5);
        assert_eq!(doubled.get(), 10);
        assert_eq!(quadrupled.get(), 20);
    }

    #[test]
    fn with_reads_without_cloning() {
        let (text, set_text) = create_signal(String::from("aa"));
        let shouted = create_memo(move || text.with(|t| t.to_uppercase()));
        assert_eq!(shouted.with(String::len), 2);
        set_text.set(String::from("abc"));
        assert_eq!(shouted.with(|s| s.clone()), "ABC");
    }

    #[test]
    fn batched_writes_recompute_once() {
        let (a, set_a) = create_signal(1);
        let (b, set_b) = create_signal(2);
        let computations = Rc::new(Cell::new(0));
        let computations_in = Rc::clone(&computations);
        let sum = create_memo(move || {
            computations_in.set(computations_in.get() + 1);
            a.get() + b.get()
        });
        assert_eq!(computations.get(), 1);
        batch(|| {
            set_a.set(10);
            set_b.set(20);
        });
        assert_eq!(sum.get(), 30);
        assert_eq!(computations.get(), 2);
    }

    #[test]
    fn clones_share_the_computation() {
        let computations = Rc::new(Cell::new(0));
        let computations_in = Rc::clone(&computations);
        let (count, set_count) = create_signal(0);
        let memo = create_memo(move || {
            computations_in.set(computations_in.get() + 1);
            count.get()
        });
        let other = memo.clone();
        set_count.set(7);
        assert_eq!(memo.get(), 7);
        assert_eq!(other.get(), 7);
        assert_eq!(computations.get(), 2);
    }
}

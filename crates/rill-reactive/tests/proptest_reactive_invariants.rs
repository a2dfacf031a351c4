//! Property-based invariant tests for signals, effects, memos, and batching.
//!
//! These tests verify structural invariants that must hold for any valid
//! inputs:
//!
//! 1. An effect observes the initial value plus every write that differs
//!    from its predecessor, in order (equal writes are silent).
//! 2. A batch collapses any write burst into at most one re-run, observing
//!    the final value.
//! 3. Nested batches flush exactly once, at the outermost exit.
//! 4. Conditional reads prune: an effect re-runs only for signals read
//!    during its most recent execution.
//! 5. A memo notifies dependents only when its computed value changes.
//! 6. A memo chain of arbitrary depth settles to the correct value after
//!    every write.
//! 7. A disposed effect never runs again, whatever happens afterwards.

use proptest::prelude::*;
use rill_reactive::{batch, create_effect, create_memo, create_signal};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ── Helpers ─────────────────────────────────────────────────────────────

fn writes_strategy() -> impl Strategy<Value = Vec<i32>> {
    proptest::collection::vec(-8i32..=8, 0..=32)
}

/// The values a dedupe-gated observer should see for `initial` followed by
/// `writes`: the initial value, then each write that differs from the value
/// it replaces.
fn expected_observations(initial: i32, writes: &[i32]) -> Vec<i32> {
    let mut seen = vec![initial];
    let mut current = initial;
    for &write in writes {
        if write != current {
            seen.push(write);
            current = write;
        }
    }
    seen
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Equal writes are silent, unequal writes are observed in order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn effect_observes_exactly_the_changes(initial in -8i32..=8, writes in writes_strategy()) {
        let (value, set_value) = create_signal(initial);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = Rc::clone(&seen);
        let _effect = create_effect(move || seen_in.borrow_mut().push(value.get()));
        for &write in &writes {
            set_value.set(write);
        }
        prop_assert_eq!(
            seen.borrow().clone(),
            expected_observations(initial, &writes),
            "initial={}, writes={:?}", initial, writes
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Batching collapses bursts into at most one re-run
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn batch_runs_at_most_once(initial in -8i32..=8, writes in writes_strategy()) {
        let (value, set_value) = create_signal(initial);
        let runs = Rc::new(Cell::new(0u32));
        let last = Rc::new(Cell::new(initial));
        let runs_in = Rc::clone(&runs);
        let last_in = Rc::clone(&last);
        let _effect = create_effect(move || {
            last_in.set(value.get());
            runs_in.set(runs_in.get() + 1);
        });
        prop_assert_eq!(runs.get(), 1);

        batch(|| {
            for &write in &writes {
                set_value.set(write);
            }
        });

        let changed = expected_observations(initial, &writes).len() > 1;
        prop_assert_eq!(
            runs.get(),
            if changed { 2 } else { 1 },
            "writes={:?}", writes
        );
        let final_value = *writes.last().unwrap_or(&initial);
        if changed {
            prop_assert_eq!(last.get(), final_value);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Nested batches flush once, at the outermost exit
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn nested_batches_flush_once(depth in 1usize..=5, writes in writes_strategy()) {
        let (value, set_value) = create_signal(i32::MIN);
        let runs = Rc::new(Cell::new(0u32));
        let runs_in = Rc::clone(&runs);
        let _effect = create_effect(move || {
            let _ = value.get();
            runs_in.set(runs_in.get() + 1);
        });
        prop_assert_eq!(runs.get(), 1);

        fn nest(depth: usize, writes: &[i32], set_value: &rill_reactive::WriteSignal<i32>) {
            if depth == 0 {
                for &write in writes {
                    set_value.set(write);
                }
            } else {
                batch(|| nest(depth - 1, writes, set_value));
            }
        }
        nest(depth, &writes, &set_value);

        // Starting from i32::MIN (outside the write range), any non-empty
        // write list changes the value exactly once from the effect's view.
        prop_assert_eq!(runs.get(), if writes.is_empty() { 1 } else { 2 });
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Dynamic dependencies: only the branch read last can trigger
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn only_the_live_branch_triggers(flips in proptest::collection::vec(any::<bool>(), 0..=16)) {
        let (cond, set_cond) = create_signal(true);
        let (a, set_a) = create_signal(0u32);
        let (b, set_b) = create_signal(0u32);
        let runs = Rc::new(Cell::new(0u32));
        let runs_in = Rc::clone(&runs);
        let _effect = create_effect(move || {
            let _ = if cond.get() { a.get() } else { b.get() };
            runs_in.set(runs_in.get() + 1);
        });

        let mut expected = 1u32;
        let mut branch = true;
        let mut a_value = 0u32;
        let mut b_value = 0u32;
        prop_assert_eq!(runs.get(), expected);

        for &flip in &flips {
            if flip != branch {
                set_cond.set(flip);
                branch = flip;
                expected += 1;
            }
            // Write the dead branch: must not trigger.
            if branch {
                b_value += 1;
                set_b.set(b_value);
            } else {
                a_value += 1;
                set_a.set(a_value);
            }
            prop_assert_eq!(runs.get(), expected, "after dead write, flips={:?}", flips);
            // Write the live branch: must trigger exactly once.
            if branch {
                a_value += 1;
                set_a.set(a_value);
            } else {
                b_value += 1;
                set_b.set(b_value);
            }
            expected += 1;
            prop_assert_eq!(runs.get(), expected, "after live write, flips={:?}", flips);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Memos notify only on change
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn memo_notifies_only_on_change(initial in -64i32..=64, writes in writes_strategy()) {
        let (value, set_value) = create_signal(initial);
        let parity = create_memo(move || value.get().rem_euclid(2));
        let runs = Rc::new(Cell::new(0u32));
        let runs_in = Rc::clone(&runs);
        let parity_read = parity.clone();
        let _effect = create_effect(move || {
            let _ = parity_read.get();
            runs_in.set(runs_in.get() + 1);
        });

        let mut expected = 1u32;
        let mut current = initial;
        for &write in &writes {
            set_value.set(write);
            if write.rem_euclid(2) != current.rem_euclid(2) {
                expected += 1;
            }
            current = write;
            prop_assert_eq!(runs.get(), expected, "writes={:?}", writes);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Memo chains settle to the correct value
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn memo_chain_settles(depth in 1usize..=8, writes in writes_strategy()) {
        let (value, set_value) = create_signal(0i32);
        let mut head = create_memo(move || value.get().wrapping_add(1));
        for _ in 1..depth {
            let prev = head.clone();
            head = create_memo(move || prev.get().wrapping_add(1));
        }
        prop_assert_eq!(head.get(), depth as i32);
        for &write in &writes {
            set_value.set(write);
            prop_assert_eq!(head.get(), write.wrapping_add(depth as i32));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Disposal is permanent
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn disposed_effects_stay_silent(writes in writes_strategy()) {
        let (value, set_value) = create_signal(0i32);
        let runs = Rc::new(Cell::new(0u32));
        let runs_in = Rc::clone(&runs);
        let reader = value.clone();
        let effect = create_effect(move || {
            let _ = reader.get();
            runs_in.set(runs_in.get() + 1);
        });
        let runs_before = runs.get();
        effect.dispose();
        for &write in &writes {
            set_value.set(write);
            batch(|| set_value.set(write.wrapping_add(1)));
        }
        prop_assert_eq!(runs.get(), runs_before);
    }
}

// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};

use stowage_test_utils::{Ledger, Tracked};

use crate::Array;

fn tracked_array(ledger: &Ledger, values: impl IntoIterator<Item = i32>) -> Array<Tracked> {
    ledger.track_all(values).into_iter().collect()
}

// =============================================================================
// clone()
// =============================================================================

#[test]
fn test_clone_failure_after_k_of_n_leaks_nothing() {
    const N: usize = 6;

    for k in 0..N {
        let ledger = Ledger::new();
        let original = tracked_array(&ledger, 0..N as i32);

        ledger.fail_after_clones(k);
        let result = catch_unwind(AssertUnwindSafe(|| original.clone()));

        assert!(result.is_err(), "clone should fail after {k} clones");
        assert_eq!(ledger.clones(), k);
        // Only the original's elements survive.
        assert_eq!(ledger.live(), N);
        assert_eq!(ledger.drops(), k);
        assert!(original.iter().map(Tracked::value).eq(0..N as i32));
    }
}

#[test]
fn test_try_clone_failure_leaves_source_untouched() {
    let ledger = Ledger::new();
    let original = tracked_array(&ledger, [1, 2, 3]);
    let ptr = original.as_ptr();

    ledger.fail_after_clones(2);
    let result = catch_unwind(AssertUnwindSafe(|| original.try_clone()));

    assert!(result.is_err());
    assert_eq!(original, [1, 2, 3]);
    assert_eq!(original.as_ptr(), ptr);
    assert_eq!(ledger.live(), 3);
}

// =============================================================================
// clone_from()
// =============================================================================

#[test]
fn test_clone_from_copy_and_swap_failure_is_strong() {
    let ledger = Ledger::new();
    let mut target = tracked_array(&ledger, [10]);
    let source = tracked_array(&ledger, [1, 2, 3, 4]);
    let ptr = target.as_ptr();

    ledger.fail_after_clones(2);
    let result = catch_unwind(AssertUnwindSafe(|| target.clone_from(&source)));

    assert!(result.is_err());
    assert_eq!(target, [10]);
    assert_eq!(target.capacity(), 1);
    assert_eq!(target.as_ptr(), ptr);
    assert_eq!(ledger.live(), 5);
}

#[test]
fn test_clone_from_reuse_failure_keeps_len_consistent() {
    let ledger = Ledger::new();
    let mut target = tracked_array(&ledger, [10, 20]);
    target.reserve(8);
    let source = tracked_array(&ledger, [1, 2, 3, 4, 5]);

    // Two overwrites and one tail clone succeed, the fourth clone fails.
    ledger.fail_after_clones(3);
    let result = catch_unwind(AssertUnwindSafe(|| target.clone_from(&source)));

    assert!(result.is_err());
    assert_eq!(target, [1, 2, 3]);
    assert_eq!(ledger.live(), 3 + 5);

    drop(target);
    drop(source);
    assert_eq!(ledger.live(), 0);
}

// =============================================================================
// emplace_with()
// =============================================================================

#[test]
fn test_emplace_panic_in_growth_path_is_strong() {
    let ledger = Ledger::new();
    let mut array = tracked_array(&ledger, [1, 2, 3, 4]);
    let ptr = array.as_ptr();
    assert_eq!(array.len(), array.capacity());

    let result = catch_unwind(AssertUnwindSafe(|| {
        array.emplace_with(1, || panic!("constructor failure"));
    }));

    assert!(result.is_err());
    assert_eq!(array, [1, 2, 3, 4]);
    assert_eq!(array.capacity(), 4);
    assert_eq!(array.as_ptr(), ptr);
    assert_eq!(ledger.live(), 4);
}

#[test]
fn test_emplace_panic_in_shifting_path_is_strong() {
    let ledger = Ledger::new();
    let mut array = tracked_array(&ledger, [1, 2, 3]);
    array.reserve(8);

    let result = catch_unwind(AssertUnwindSafe(|| {
        array.emplace_with(0, || panic!("constructor failure"));
    }));

    assert!(result.is_err());
    assert_eq!(array, [1, 2, 3]);
    assert_eq!(ledger.live(), 3);
}

#[test]
fn test_emplace_back_panic_is_strong() {
    let mut array: Array<String> = Array::new();
    array.push(String::from("kept"));

    let result = catch_unwind(AssertUnwindSafe(|| {
        array.emplace_back_with(|| panic!("constructor failure"));
    }));

    assert!(result.is_err());
    assert_eq!(array.len(), 1);
    assert_eq!(array[0], "kept");
}

// =============================================================================
// resize_with() / with_len()
// =============================================================================

#[test]
fn test_resize_with_panic_drops_partial_tail() {
    let ledger = Ledger::new();
    let mut array = tracked_array(&ledger, [1, 2]);
    let mut calls = 0;

    let result = catch_unwind(AssertUnwindSafe(|| {
        array.resize_with(6, || {
            calls += 1;
            if calls == 3 {
                panic!("constructor failure");
            }
            ledger.track(100 + calls)
        });
    }));

    assert!(result.is_err());
    assert_eq!(array, [1, 2]);
    assert_eq!(ledger.live(), 2);
    assert_eq!(ledger.drops(), 2);
}

thread_local! {
    static DEFAULT_BUDGET: Cell<usize> = const { Cell::new(usize::MAX) };
    static FRAGILE_LIVE: Cell<usize> = const { Cell::new(0) };
}

struct Fragile;

impl Default for Fragile {
    fn default() -> Self {
        DEFAULT_BUDGET.with(|budget| {
            if budget.get() == 0 {
                panic!("default failure");
            }
            budget.set(budget.get() - 1);
        });
        FRAGILE_LIVE.with(|live| live.set(live.get() + 1));
        Fragile
    }
}

impl Drop for Fragile {
    fn drop(&mut self) {
        FRAGILE_LIVE.with(|live| live.set(live.get() - 1));
    }
}

#[test]
fn test_with_len_default_panic_leaks_nothing() {
    DEFAULT_BUDGET.with(|budget| budget.set(3));

    let result = catch_unwind(|| Array::<Fragile>::with_len(5));

    assert!(result.is_err());
    assert_eq!(FRAGILE_LIVE.with(Cell::get), 0);

    DEFAULT_BUDGET.with(|budget| budget.set(usize::MAX));
    let array = Array::<Fragile>::with_len(5);
    assert_eq!(FRAGILE_LIVE.with(Cell::get), 5);
    drop(array);
    assert_eq!(FRAGILE_LIVE.with(Cell::get), 0);
}

// =============================================================================
// erase() / truncate() with panicking Drop
// =============================================================================

struct Bomb {
    armed: bool,
}

impl Drop for Bomb {
    fn drop(&mut self) {
        if self.armed {
            panic!("drop failure");
        }
    }
}

#[test]
fn test_erase_with_panicking_drop_leaves_array_consistent() {
    let mut array: Array<Bomb> = [false, true, false]
        .into_iter()
        .map(|armed| Bomb { armed })
        .collect();

    let result = catch_unwind(AssertUnwindSafe(|| array.erase(1)));

    assert!(result.is_err());
    assert_eq!(array.len(), 2);
    assert!(array.iter().all(|bomb| !bomb.armed));
}

#[test]
fn test_truncate_with_panicking_drop_shrinks_len() {
    let mut array: Array<Bomb> = [false, true, false]
        .into_iter()
        .map(|armed| Bomb { armed })
        .collect();

    let result = catch_unwind(AssertUnwindSafe(|| array.truncate(1)));

    assert!(result.is_err());
    assert_eq!(array.len(), 1);
    assert!(!array[0].armed);
}

// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Element type that records its own lifecycle.
//!
//! Every [`Tracked`] value belongs to a [`Ledger`]. The ledger counts how many
//! values are currently alive, how many clones and drops happened, and can be
//! armed to panic on a specific clone. Tests use it to prove that containers
//! neither leak nor double-drop when an element operation fails halfway.
//!
//! Counters are per-ledger (not global), so tests can run in parallel.
//!
//! # Example
//!
//! ```rust
//! use stowage_test_utils::Ledger;
//!
//! let ledger = Ledger::new();
//! let a = ledger.track(1);
//! let b = a.clone();
//!
//! assert_eq!(ledger.live(), 2);
//! assert_eq!(ledger.clones(), 1);
//!
//! drop(a);
//! drop(b);
//! assert_eq!(ledger.live(), 0);
//! assert_eq!(ledger.drops(), 2);
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Counters {
    live: Cell<usize>,
    clones: Cell<usize>,
    drops: Cell<usize>,
    fail_after_clones: Cell<Option<usize>>,
}

/// Shared lifecycle counters for a family of [`Tracked`] values.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    counters: Rc<Counters>,
}

impl Ledger {
    /// Creates a ledger with all counters at zero and no failure armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new tracked value registered with this ledger.
    pub fn track(&self, value: i32) -> Tracked {
        self.bump_live();

        Tracked {
            value,
            ledger: self.clone(),
        }
    }

    /// Creates one tracked value per item, in order.
    pub fn track_all(&self, values: impl IntoIterator<Item = i32>) -> Vec<Tracked> {
        values.into_iter().map(|value| self.track(value)).collect()
    }

    /// Arms a one-shot failure: after `successful` more clones succeed, the
    /// next clone panics without creating a value.
    ///
    /// `fail_after_clones(0)` makes the very next clone panic.
    pub fn fail_after_clones(&self, successful: usize) {
        self.counters
            .fail_after_clones
            .set(Some(self.counters.clones.get() + successful));
    }

    /// Removes any armed failure.
    pub fn disarm(&self) {
        self.counters.fail_after_clones.set(None);
    }

    /// Number of values currently alive.
    pub fn live(&self) -> usize {
        self.counters.live.get()
    }

    /// Number of successful clones so far.
    pub fn clones(&self) -> usize {
        self.counters.clones.get()
    }

    /// Number of values dropped so far.
    pub fn drops(&self) -> usize {
        self.counters.drops.get()
    }

    fn bump_live(&self) {
        self.counters.live.set(self.counters.live.get() + 1);
    }

    fn check_clone_failure(&self) {
        let clones = self.counters.clones.get();

        if self.counters.fail_after_clones.get() == Some(clones) {
            self.disarm();
            panic!("Tracked: injected clone failure after {clones} clones");
        }
    }
}

/// An `i32` payload whose lifecycle is recorded by a [`Ledger`].
pub struct Tracked {
    value: i32,
    ledger: Ledger,
}

impl Tracked {
    /// Returns the payload.
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Replaces the payload.
    pub fn set_value(&mut self, value: i32) {
        self.value = value;
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        self.ledger.check_clone_failure();

        let counters = &self.ledger.counters;
        counters.clones.set(counters.clones.get() + 1);
        self.ledger.bump_live();

        Self {
            value: self.value,
            ledger: self.ledger.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let counters = &self.ledger.counters;

        assert!(counters.live.get() > 0, "Tracked: double drop detected");

        counters.live.set(counters.live.get() - 1);
        counters.drops.set(counters.drops.get() + 1);
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialEq<i32> for Tracked {
    fn eq(&self, other: &i32) -> bool {
        self.value == *other
    }
}

impl fmt::Debug for Tracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tracked").field(&self.value).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_and_drop_balance() {
        let ledger = Ledger::new();
        let values = ledger.track_all([1, 2, 3]);

        assert_eq!(ledger.live(), 3);
        drop(values);
        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.drops(), 3);
    }

    #[test]
    fn test_fail_after_clones_is_one_shot() {
        let ledger = Ledger::new();
        let value = ledger.track(5);

        ledger.fail_after_clones(1);

        let first = value.clone();
        let second = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| value.clone()));

        assert!(second.is_err());
        assert_eq!(ledger.clones(), 1);
        assert_eq!(ledger.live(), 2);

        // Disarmed after firing.
        let third = value.clone();
        assert_eq!(third, 5);

        drop((first, third, value));
        assert_eq!(ledger.live(), 0);
    }
}

// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use core::mem;
use core::ptr;

/// Tracks a run of values being written into uninitialized slots.
///
/// If dropped before [`InitGuard::finish`] (a constructor panicked), every
/// value written so far is dropped. The slots themselves are not released:
/// that stays with the buffer that owns them.
pub(crate) struct InitGuard<T> {
    start: *mut T,
    initialized: usize,
}

impl<T> InitGuard<T> {
    pub(crate) fn new(start: *mut T) -> Self {
        Self {
            start,
            initialized: 0,
        }
    }

    /// Writes `value` into the next slot of the run.
    ///
    /// # Safety
    ///
    /// Slot `start + initialized` must lie inside the owning allocation and be
    /// uninitialized.
    #[inline]
    pub(crate) unsafe fn write_next(&mut self, value: T) {
        // SAFETY: guaranteed by the caller.
        unsafe { self.start.add(self.initialized).write(value) };
        self.initialized += 1;
    }

    /// Commits the run and returns how many values were written.
    #[inline]
    pub(crate) fn finish(self) -> usize {
        let initialized = self.initialized;
        mem::forget(self);
        initialized
    }
}

impl<T> Drop for InitGuard<T> {
    fn drop(&mut self) {
        // SAFETY: exactly `initialized` slots from `start` hold values written
        // by `write_next` and not yet handed over.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.start,
                self.initialized,
            ))
        };
    }
}

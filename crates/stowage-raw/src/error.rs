// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Error types for stowage-raw.

use alloc::alloc::{Layout, handle_alloc_error};
use thiserror::Error;

/// Errors raised while obtaining raw storage.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum RawBufferError {
    /// The requested number of slots does not fit in a valid `Layout`.
    ///
    /// Raised before the allocator is consulted, when `capacity * size_of::<T>()`
    /// would exceed `isize::MAX` bytes.
    #[error("Capacity overflow: {capacity} slots exceed the addressable size")]
    CapacityOverflow {
        /// Number of slots that was requested.
        capacity: usize,
    },

    /// The global allocator could not satisfy the request.
    #[error("Allocation failed: {size} bytes with alignment {align}")]
    AllocFailed {
        /// Size in bytes of the rejected request.
        size: usize,
        /// Alignment in bytes of the rejected request.
        align: usize,
    },
}

impl RawBufferError {
    /// Builds an `AllocFailed` error describing `layout`.
    pub fn alloc_failed(layout: Layout) -> Self {
        Self::AllocFailed {
            size: layout.size(),
            align: layout.align(),
        }
    }

    /// Diverges the way infallible collection methods do.
    ///
    /// `AllocFailed` is forwarded to [`handle_alloc_error`]; `CapacityOverflow`
    /// panics with the error message.
    #[cold]
    #[inline(never)]
    pub fn handle(self) -> ! {
        match self {
            Self::AllocFailed { size, align } => match Layout::from_size_align(size, align) {
                Ok(layout) => handle_alloc_error(layout),
                Err(_) => panic!("{self}"),
            },
            Self::CapacityOverflow { .. } => panic!("{self}"),
        }
    }
}

// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Growable contiguous array built directly on raw storage.
//!
//! `Array<T>` owns exactly one [`RawBuffer<T>`] and tracks how many of its
//! slots hold live values. Slots `[0, len)` are live, `[len, capacity)` are
//! uninitialized. Storage is never resized in place: when more room is needed
//! a fresh buffer is allocated, values are relocated into it and the buffers
//! are swapped.
//!
//! # Core Guarantees
//!
//! - **Amortized growth**: appending to a full array doubles its capacity
//!   (`0 → 1 → 2 → 4 → ...`).
//! - **Allocation failures leave the array untouched**: no value moves until
//!   the new storage exists. Every allocating method has a `try_` form that
//!   returns the [`RawBufferError`] unchanged.
//! - **Panic safety**: values are built into fresh storage before the old one
//!   is retired (clone, copy-and-swap assignment, growth insertion). A panic
//!   from `Clone`, `Default` or a constructor closure drops whatever was
//!   speculatively built and leaves the array as it was. Reuse-path
//!   `clone_from` only keeps `len` consistent (basic guarantee).
//!
//! # Example
//!
//! ```rust
//! use stowage::Array;
//!
//! let mut array = Array::new();
//! array.push(1);
//! array.push(2);
//! array.push(3);
//!
//! array.insert(1, 9);
//! array.erase(0);
//!
//! assert_eq!(array, [9, 2, 3]);
//! assert_eq!(array.capacity(), 4);
//! ```
//!
//! # Example: Fallible Allocation
//!
//! ```rust
//! use stowage::{Array, RawBufferError};
//!
//! fn example() -> Result<(), RawBufferError> {
//!     let mut array = Array::<u64>::new();
//!     array.try_reserve(16)?;
//!
//!     for i in 0..16 {
//!         array.try_push(i)?;
//!     }
//!
//!     assert_eq!(array.capacity(), 16);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```
//!
//! # Test Utilities
//!
//! Enable the `test_utils` feature to inject allocation failures:
//!
//! ```toml
//! [dev-dependencies]
//! stowage = { version = "*", features = ["test_utils"] }
//! ```
//!
//! Then use [`ArrayBehaviour`] to exercise error paths:
//!
//! ```rust
//! #[cfg(test)]
//! mod tests {
//!     use stowage::{Array, ArrayBehaviour};
//!
//!     #[test]
//!     fn test_handles_allocation_failure() {
//!         let mut array = Array::<u8>::new();
//!         array.change_behaviour(ArrayBehaviour::FailAtAllocation);
//!
//!         assert!(array.try_push(1).is_err());
//!         assert!(array.is_empty());
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

mod array;
mod guard;

#[cfg(test)]
mod tests;

pub use array::Array;
pub use stowage_raw::{RawBuffer, RawBufferError};

#[cfg(any(test, feature = "test_utils"))]
pub use array::ArrayBehaviour;

// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Raw, uninitialized slot storage for typed containers.
//!
//! `RawBuffer<T>` owns a fixed-size region of memory sized for `capacity`
//! values of `T`. It never constructs, reads or drops a `T`: it only
//! allocates, hands out slot addresses and deallocates. Deciding which slots
//! hold live values is the job of the container built on top of it.
//!
//! # Core Guarantees
//!
//! - **No implicit construction**: slots start uninitialized and stay that way
//!   until the owner writes to them.
//! - **No implicit destruction**: dropping a `RawBuffer` releases storage only.
//!   The owner must drop any live values first.
//! - **Exclusive ownership**: `RawBuffer` is move-only. Storage changes hands
//!   through [`RawBuffer::swap`] or [`RawBuffer::take`], both O(1).
//! - **Verbatim failures**: allocator failures surface as [`RawBufferError`]
//!   without being translated or swallowed.
//!
//! # Example
//!
//! ```rust
//! use stowage_raw::{RawBuffer, RawBufferError};
//!
//! fn example() -> Result<(), RawBufferError> {
//!     let buffer = RawBuffer::<u32>::try_with_capacity(4)?;
//!     assert_eq!(buffer.capacity(), 4);
//!
//!     unsafe {
//!         // SAFETY: slot 0 is inside the allocation and not yet initialized.
//!         buffer.address(0).write(7);
//!         assert_eq!(buffer.address(0).read(), 7);
//!     }
//!
//!     // u32 has no drop glue, so releasing the storage leaks nothing.
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

extern crate alloc;

mod error;
mod raw_buffer;

#[cfg(test)]
mod tests;

pub use error::RawBufferError;
pub use raw_buffer::RawBuffer;

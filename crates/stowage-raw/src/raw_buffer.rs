// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use alloc::alloc::{Layout, alloc, dealloc};
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;

use log::{debug, trace};

use crate::error::RawBufferError;

/// Owner of an uninitialized region sized for `capacity` values of `T`.
///
/// The buffer holds no opinion about which slots are live. Every slot in
/// `[0, capacity)` is addressable; none is assumed to hold a value.
///
/// Zero-sized `T` never touches the allocator: the requested capacity is
/// recorded and every slot lives at the same dangling, well-aligned address.
///
/// # Example
///
/// ```rust
/// use stowage_raw::RawBuffer;
///
/// let mut a = RawBuffer::<u64>::with_capacity(8);
/// let mut b = RawBuffer::<u64>::new();
///
/// a.swap(&mut b);
///
/// assert_eq!(a.capacity(), 0);
/// assert_eq!(b.capacity(), 8);
/// ```
pub struct RawBuffer<T> {
    ptr: NonNull<T>,
    capacity: usize,
    _marker: PhantomData<T>,
}

// Safety: RawBuffer is a unique pointer plus a length, like a raw vector.
unsafe impl<T: Send> Send for RawBuffer<T> {}
unsafe impl<T: Sync> Sync for RawBuffer<T> {}

impl<T> RawBuffer<T> {
    /// Creates an empty buffer. Never allocates.
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: 0,
            _marker: PhantomData,
        }
    }

    /// Allocates storage for `capacity` slots.
    ///
    /// `capacity == 0` returns an empty buffer without calling the allocator.
    ///
    /// # Errors
    ///
    /// - [`RawBufferError::CapacityOverflow`] if the byte size cannot be
    ///   described by a `Layout`.
    /// - [`RawBufferError::AllocFailed`] if the global allocator returns null.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, RawBufferError> {
        if capacity == 0 {
            return Ok(Self::new());
        }

        let layout = Self::layout_for(capacity)?;

        if layout.size() == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                capacity,
                _marker: PhantomData,
            });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc(layout) };

        let Some(ptr) = NonNull::new(raw.cast::<T>()) else {
            debug!(
                "allocator refused {} slots ({} bytes, align {})",
                capacity,
                layout.size(),
                layout.align()
            );
            return Err(RawBufferError::alloc_failed(layout));
        };

        trace!("allocated {} slots ({} bytes)", capacity, layout.size());

        Ok(Self {
            ptr,
            capacity,
            _marker: PhantomData,
        })
    }

    /// Allocates storage for `capacity` slots, diverging on failure.
    ///
    /// See [`RawBufferError::handle`] for how failures are reported.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::try_with_capacity(capacity).unwrap_or_else(|err| err.handle())
    }

    /// Returns the layout of a region holding `capacity` values of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RawBufferError::CapacityOverflow`] if the region would exceed
    /// `isize::MAX` bytes.
    pub fn layout_for(capacity: usize) -> Result<Layout, RawBufferError> {
        Layout::array::<T>(capacity).map_err(|_| RawBufferError::CapacityOverflow { capacity })
    }

    /// Returns the number of slots in the buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if the buffer has no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    /// Returns a pointer to slot 0.
    ///
    /// Dangling but well-aligned when the buffer is empty.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Returns a mutable pointer to slot 0.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Returns the address of slot `offset`.
    ///
    /// `offset == capacity()` is allowed and yields the one-past-end address.
    ///
    /// # Safety
    ///
    /// `offset` must not exceed `capacity()`. This is only checked in debug
    /// builds. The returned pointer may be written through only while the
    /// caller has exclusive access to the buffer.
    #[inline]
    pub unsafe fn address(&self, offset: usize) -> *mut T {
        debug_assert!(
            offset <= self.capacity,
            "slot offset (is {offset}) should be <= capacity (is {})",
            self.capacity
        );

        // SAFETY: caller guarantees offset <= capacity, which stays inside the
        // allocation or one past its end.
        unsafe { self.ptr.as_ptr().add(offset) }
    }

    /// Exchanges storage with `other` in O(1).
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(&mut self.ptr, &mut other.ptr);
        mem::swap(&mut self.capacity, &mut other.capacity);
    }

    /// Moves the storage out, leaving `self` empty.
    #[inline]
    pub fn take(&mut self) -> Self {
        mem::replace(self, Self::new())
    }
}

impl<T> Default for RawBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RawBuffer<T> {
    fn drop(&mut self) {
        if self.capacity == 0 || mem::size_of::<T>() == 0 {
            return;
        }

        // The same layout was validated when the region was allocated.
        if let Ok(layout) = Self::layout_for(self.capacity) {
            trace!("releasing {} slots ({} bytes)", self.capacity, layout.size());

            // SAFETY: ptr was returned by `alloc` with exactly this layout.
            unsafe { dealloc(self.ptr.as_ptr().cast::<u8>(), layout) };
        }
    }
}

impl<T> core::fmt::Debug for RawBuffer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawBuffer")
            .field("ptr", &self.ptr)
            .field("capacity", &self.capacity)
            .finish()
    }
}

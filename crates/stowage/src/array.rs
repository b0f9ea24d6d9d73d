// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use core::fmt;
use core::mem;
use core::ops::{Deref, DerefMut};
use core::ptr;
use core::slice;

use log::trace;
use stowage_raw::{RawBuffer, RawBufferError};

use crate::guard::InitGuard;

/// Test behaviour for injecting failures in `Array` operations.
///
/// This is only available with the `test_utils` feature and allows users to
/// test allocation-failure paths deterministically.
///
/// The behaviour is sticky - once set, it remains active until changed.
///
/// # Example
///
/// ```rust
/// // test_utils feature required in dev-dependencies
/// use stowage::{Array, ArrayBehaviour, RawBufferError};
///
/// #[cfg(test)]
/// mod tests {
///     use super::*;
///
///     #[test]
///     fn test_handles_allocation_failure() -> Result<(), RawBufferError> {
///         let mut array = Array::with_len(4);
///
///         // Inject failure
///         array.change_behaviour(ArrayBehaviour::FailAtAllocation);
///
///         // Growth needs new storage, so this fails and changes nothing
///         assert!(array.try_push(1u8).is_err());
///         assert_eq!(array.len(), 4);
///
///         // Reset to normal behaviour
///         array.change_behaviour(ArrayBehaviour::None);
///         array.try_push(1u8)?;
///         Ok(())
///     }
/// }
/// ```
#[cfg(any(test, feature = "test_utils"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayBehaviour {
    /// Normal behaviour - no injected failures.
    #[default]
    None,
    /// Every allocation requested by the array fails with `AllocFailed`.
    FailAtAllocation,
}

/// Contiguous growable array owning one [`RawBuffer`].
///
/// Slots `[0, len)` hold live values, `[len, capacity)` are uninitialized.
/// `len <= capacity` holds after every operation, including ones that unwind.
///
/// Safe indexing, iteration and slice methods come through
/// `Deref<Target = [T]>` and are bounds-checked. The unchecked access path is
/// [`Array::get_unchecked`] / [`Array::get_unchecked_mut`].
///
/// # Example
///
/// ```rust
/// use stowage::Array;
///
/// let mut array = Array::<i32>::with_len(3);
/// array.resize(1);
/// array.resize(4);
///
/// assert_eq!(array, [0, 0, 0, 0]);
/// ```
pub struct Array<T> {
    buffer: RawBuffer<T>,
    len: usize,
    #[cfg(any(test, feature = "test_utils"))]
    behaviour: ArrayBehaviour,
}

impl<T> Array<T> {
    const fn from_parts(buffer: RawBuffer<T>, len: usize) -> Self {
        Self {
            buffer,
            len,
            #[cfg(any(test, feature = "test_utils"))]
            behaviour: ArrayBehaviour::None,
        }
    }

    /// Changes the failure-injection behaviour of this array.
    #[cfg(any(test, feature = "test_utils"))]
    pub fn change_behaviour(&mut self, behaviour: ArrayBehaviour) {
        self.behaviour = behaviour;
    }

    #[cfg(any(test, feature = "test_utils"))]
    fn check_behaviour(&self, capacity: usize) -> Result<(), RawBufferError> {
        match self.behaviour {
            ArrayBehaviour::None => Ok(()),
            ArrayBehaviour::FailAtAllocation => Err(RawBufferError::alloc_failed(
                RawBuffer::<T>::layout_for(capacity)?,
            )),
        }
    }

    #[cfg(not(any(test, feature = "test_utils")))]
    #[inline(always)]
    fn check_behaviour(&self, _capacity: usize) -> Result<(), RawBufferError> {
        Ok(())
    }

    /// Every allocation made on behalf of this array goes through here.
    fn allocate(&self, capacity: usize) -> Result<RawBuffer<T>, RawBufferError> {
        self.check_behaviour(capacity)?;
        RawBuffer::try_with_capacity(capacity)
    }

    fn grown_capacity(&self) -> Result<usize, RawBufferError> {
        match self.capacity() {
            0 => Ok(1),
            capacity => capacity
                .checked_mul(2)
                .ok_or(RawBufferError::CapacityOverflow {
                    capacity: usize::MAX,
                }),
        }
    }

    /// Creates an empty array. Never allocates.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stowage::Array;
    ///
    /// let array: Array<u8> = Array::new();
    /// assert_eq!(array.len(), 0);
    /// assert_eq!(array.capacity(), 0);
    /// ```
    pub const fn new() -> Self {
        Self::from_parts(RawBuffer::new(), 0)
    }

    /// Creates an array of `len` default values with `capacity() == len`.
    ///
    /// # Errors
    ///
    /// Returns the allocation error unchanged; nothing is constructed.
    pub fn try_with_len(len: usize) -> Result<Self, RawBufferError>
    where
        T: Default,
    {
        let mut array = Self::new();
        array.try_resize(len)?;
        Ok(array)
    }

    /// Creates an array of `len` default values with `capacity() == len`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stowage::Array;
    ///
    /// let array = Array::<String>::with_len(2);
    /// assert_eq!(array.len(), 2);
    /// assert_eq!(array.capacity(), 2);
    /// assert!(array.iter().all(String::is_empty));
    /// ```
    pub fn with_len(len: usize) -> Self
    where
        T: Default,
    {
        Self::try_with_len(len).unwrap_or_else(|err| err.handle())
    }

    /// Takes ownership of `source`'s storage in O(1), leaving it empty.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stowage::Array;
    ///
    /// let mut source: Array<u8> = [1, 2, 3].into_iter().collect();
    /// let target = Array::take(&mut source);
    ///
    /// assert_eq!(target, [1, 2, 3]);
    /// assert_eq!(source.len(), 0);
    /// assert_eq!(source.capacity(), 0);
    /// ```
    pub fn take(source: &mut Self) -> Self {
        let len = mem::replace(&mut source.len, 0);
        Self::from_parts(source.buffer.take(), len)
    }

    /// Replaces the contents with `source`'s storage in O(1).
    ///
    /// The previous contents are dropped and `source` is left empty.
    pub fn move_assign(&mut self, source: &mut Self) {
        let mut taken = Self::take(source);
        self.swap(&mut taken);
    }

    /// Returns the number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the array holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of allocated slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Returns the live elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: [0, len) are initialized; the pointer is non-null and aligned
        // even for an empty buffer.
        unsafe { slice::from_raw_parts(self.buffer.as_ptr(), self.len) }
    }

    /// Returns the live elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as in `as_slice`, with exclusive access through `&mut self`.
        unsafe { slice::from_raw_parts_mut(self.buffer.as_mut_ptr(), self.len) }
    }

    /// Returns a reference to the element at `index` without bounds checking.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`. This is only checked in debug builds.
    #[inline]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(
            index < self.len,
            "index (is {index}) should be < len (is {})",
            self.len
        );

        // SAFETY: caller guarantees index < len, so the slot is live.
        unsafe { &*self.buffer.address(index) }
    }

    /// Returns a mutable reference to the element at `index` without bounds
    /// checking.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len()`. This is only checked in debug builds.
    #[inline]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(
            index < self.len,
            "index (is {index}) should be < len (is {})",
            self.len
        );

        // SAFETY: caller guarantees index < len; `&mut self` gives exclusivity.
        unsafe { &mut *self.buffer.address(index) }
    }

    /// Exchanges contents with `other` in O(1).
    pub fn swap(&mut self, other: &mut Self) {
        self.buffer.swap(&mut other.buffer);
        mem::swap(&mut self.len, &mut other.len);
    }

    /// Grows capacity to exactly `new_capacity` if it is currently smaller.
    ///
    /// Elements are relocated bitwise into the new storage, which cannot
    /// fail, and the old storage is released without running any `Drop`.
    ///
    /// # Errors
    ///
    /// Returns the allocation error unchanged; the array is untouched.
    pub fn try_reserve(&mut self, new_capacity: usize) -> Result<(), RawBufferError> {
        if new_capacity <= self.capacity() {
            return Ok(());
        }

        let mut fresh = self.allocate(new_capacity)?;

        trace!(
            "reserving array storage: {} -> {} slots",
            self.capacity(),
            new_capacity
        );

        // SAFETY: both regions hold at least `len` slots and are distinct
        // allocations. The originals are retired by releasing their storage.
        unsafe {
            ptr::copy_nonoverlapping(self.buffer.as_ptr(), fresh.as_mut_ptr(), self.len);
        }
        self.buffer.swap(&mut fresh);

        Ok(())
    }

    /// Grows capacity to exactly `new_capacity` if it is currently smaller.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stowage::Array;
    ///
    /// let mut array: Array<u8> = [1, 2].into_iter().collect();
    /// array.reserve(10);
    ///
    /// assert_eq!(array.capacity(), 10);
    /// assert_eq!(array, [1, 2]);
    /// ```
    pub fn reserve(&mut self, new_capacity: usize) {
        self.try_reserve(new_capacity)
            .unwrap_or_else(|err| err.handle());
    }

    /// Resizes to `new_len`, filling new slots with values from `f`.
    ///
    /// Growing past capacity reserves exactly `new_len` first. If `f` panics,
    /// the values it already produced are dropped and `len` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns the allocation error unchanged; the array is untouched.
    pub fn try_resize_with<F>(&mut self, new_len: usize, mut f: F) -> Result<(), RawBufferError>
    where
        F: FnMut() -> T,
    {
        if new_len <= self.len {
            self.truncate(new_len);
            return Ok(());
        }

        self.try_reserve(new_len)?;

        // SAFETY: after the reserve, [len, new_len) are allocated and
        // uninitialized.
        let mut tail = InitGuard::new(unsafe { self.buffer.address(self.len) });
        for _ in self.len..new_len {
            // SAFETY: the guard never writes past new_len <= capacity.
            unsafe { tail.write_next(f()) };
        }
        tail.finish();

        self.len = new_len;

        Ok(())
    }

    /// Resizes to `new_len`, filling new slots with values from `f`.
    pub fn resize_with<F>(&mut self, new_len: usize, f: F)
    where
        F: FnMut() -> T,
    {
        self.try_resize_with(new_len, f)
            .unwrap_or_else(|err| err.handle());
    }

    /// Resizes to `new_len`, filling new slots with `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns the allocation error unchanged; the array is untouched.
    pub fn try_resize(&mut self, new_len: usize) -> Result<(), RawBufferError>
    where
        T: Default,
    {
        self.try_resize_with(new_len, T::default)
    }

    /// Resizes to `new_len`, filling new slots with `T::default()`.
    pub fn resize(&mut self, new_len: usize)
    where
        T: Default,
    {
        self.try_resize(new_len).unwrap_or_else(|err| err.handle());
    }

    /// Drops the elements in `[new_len, len)`. Capacity is kept.
    ///
    /// Does nothing if `new_len >= len()`.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }

        let excess = self.len - new_len;
        // Shrink first so a panicking `Drop` cannot expose dropped slots.
        self.len = new_len;

        // SAFETY: [new_len, new_len + excess) were live and are now outside
        // the live range.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.buffer.address(new_len),
                excess,
            ));
        }
    }

    /// Drops every element. Capacity is kept.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Builds the value from `f` directly at `pos`, shifting later elements
    /// right, and returns a reference to it.
    ///
    /// - A full array allocates twice its capacity (or one slot when empty),
    ///   builds the value in the new storage, then relocates `[0, pos)` and
    ///   `[pos, len)` around it.
    /// - Otherwise the value is built first, then `[pos, len)` is shifted one
    ///   slot right and the value is written at `pos`.
    ///
    /// If `f` panics, the array is unchanged.
    ///
    /// # Errors
    ///
    /// Returns the allocation error unchanged; `f` is not called and the
    /// array is untouched.
    ///
    /// # Panics
    ///
    /// Panics if `pos > len()`.
    pub fn try_emplace_with<F>(&mut self, pos: usize, f: F) -> Result<&mut T, RawBufferError>
    where
        F: FnOnce() -> T,
    {
        assert!(
            pos <= self.len,
            "insertion position (is {pos}) should be <= len (is {})",
            self.len
        );

        if self.len == self.capacity() {
            self.emplace_grow(pos, f)?;
        } else if pos == self.len {
            let value = f();

            // SAFETY: len < capacity, so slot `len` is allocated and free.
            unsafe { self.buffer.address(pos).write(value) };
        } else {
            let value = f();

            // SAFETY: len < capacity, so [pos, len] fits in the allocation.
            // `ptr::copy` handles the overlap of the one-slot shift.
            unsafe {
                let slot = self.buffer.address(pos);
                ptr::copy(slot, slot.add(1), self.len - pos);
                slot.write(value);
            }
        }

        self.len += 1;

        // SAFETY: pos < len after the insertion.
        Ok(unsafe { &mut *self.buffer.address(pos) })
    }

    #[cold]
    #[inline(never)]
    fn emplace_grow<F>(&mut self, pos: usize, f: F) -> Result<(), RawBufferError>
    where
        F: FnOnce() -> T,
    {
        let new_capacity = self.grown_capacity()?;
        let mut fresh = self.allocate(new_capacity)?;

        trace!(
            "growing array storage: {} -> {} slots",
            self.capacity(),
            new_capacity
        );

        // A panic here drops `fresh`, releasing its storage; self is untouched.
        let value = f();

        // SAFETY: pos <= len < new_capacity. The value goes to its target
        // slot, then the old halves are relocated around it into distinct
        // storage.
        unsafe {
            fresh.address(pos).write(value);

            let src = self.buffer.as_ptr();
            let dst = fresh.as_mut_ptr();
            ptr::copy_nonoverlapping(src, dst, pos);
            ptr::copy_nonoverlapping(src.add(pos), dst.add(pos + 1), self.len - pos);
        }

        // Old slots were relocated, so releasing the old storage drops nothing.
        self.buffer.swap(&mut fresh);

        Ok(())
    }

    /// Builds the value from `f` directly at `pos` and returns a reference to
    /// it. See [`Array::try_emplace_with`].
    pub fn emplace_with<F>(&mut self, pos: usize, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        match self.try_emplace_with(pos, f) {
            Ok(value) => value,
            Err(err) => err.handle(),
        }
    }

    /// Inserts `value` at `pos`, shifting later elements right.
    ///
    /// # Errors
    ///
    /// Returns the allocation error unchanged; `value` is dropped and the
    /// array is untouched.
    ///
    /// # Panics
    ///
    /// Panics if `pos > len()`.
    pub fn try_insert(&mut self, pos: usize, value: T) -> Result<(), RawBufferError> {
        self.try_emplace_with(pos, || value).map(|_| ())
    }

    /// Inserts `value` at `pos`, shifting later elements right.
    ///
    /// # Panics
    ///
    /// Panics if `pos > len()`.
    pub fn insert(&mut self, pos: usize, value: T) {
        self.emplace_with(pos, || value);
    }

    /// Builds the value from `f` at the end and returns a reference to it.
    ///
    /// # Errors
    ///
    /// Returns the allocation error unchanged; the array is untouched.
    pub fn try_emplace_back_with<F>(&mut self, f: F) -> Result<&mut T, RawBufferError>
    where
        F: FnOnce() -> T,
    {
        self.try_emplace_with(self.len, f)
    }

    /// Builds the value from `f` at the end and returns a reference to it.
    pub fn emplace_back_with<F>(&mut self, f: F) -> &mut T
    where
        F: FnOnce() -> T,
    {
        self.emplace_with(self.len, f)
    }

    /// Appends `value`.
    ///
    /// # Errors
    ///
    /// Returns the allocation error unchanged; `value` is dropped and the
    /// array is untouched.
    pub fn try_push(&mut self, value: T) -> Result<(), RawBufferError> {
        self.try_insert(self.len, value)
    }

    /// Appends `value`.
    pub fn push(&mut self, value: T) {
        self.insert(self.len, value);
    }

    /// Removes and returns the element at `pos`, shifting later elements left.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len()`.
    pub fn remove(&mut self, pos: usize) -> T {
        assert!(
            pos < self.len,
            "removal position (is {pos}) should be < len (is {})",
            self.len
        );

        // SAFETY: pos < len, so the slot is live; after reading it out the
        // tail [pos + 1, len) slides down over it.
        unsafe {
            let slot = self.buffer.address(pos);
            let value = slot.read();
            ptr::copy(slot.add(1), slot, self.len - pos - 1);
            self.len -= 1;
            value
        }
    }

    /// Drops the element at `pos`, shifting later elements left.
    ///
    /// The array is consistent again before the element's `Drop` runs.
    ///
    /// # Panics
    ///
    /// Panics if `pos >= len()`.
    pub fn erase(&mut self, pos: usize) {
        drop(self.remove(pos));
    }

    /// Removes and returns the last element, or `None` if empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        self.len -= 1;

        // SAFETY: the slot at the old `len - 1` was live and is now outside
        // the live range.
        Some(unsafe { self.buffer.address(self.len).read() })
    }

    /// Drops the last element. Does nothing on an empty array.
    pub fn pop_back(&mut self) {
        drop(self.pop());
    }

    /// Clones `items` into a fresh array with `capacity() == items.len()`.
    ///
    /// Storage is requested on behalf of `self`. If a clone panics, the
    /// values already built are dropped and the storage released.
    fn try_clone_items(&self, items: &[T]) -> Result<Self, RawBufferError>
    where
        T: Clone,
    {
        let mut buffer = self.allocate(items.len())?;

        let mut built = InitGuard::new(buffer.as_mut_ptr());
        for item in items {
            // SAFETY: at most items.len() == capacity values are written.
            unsafe { built.write_next(item.clone()) };
        }
        let len = built.finish();

        Ok(Self::from_parts(buffer, len))
    }

    /// Deep-copies the array into storage of exactly `len()` slots.
    ///
    /// # Errors
    ///
    /// Returns the allocation error unchanged.
    pub fn try_clone(&self) -> Result<Self, RawBufferError>
    where
        T: Clone,
    {
        self.try_clone_items(self.as_slice())
    }

    /// Replaces the contents with a deep copy of `source`.
    ///
    /// - If `source` does not fit in the current capacity, a full copy is
    ///   built first and swapped in (strong guarantee).
    /// - Otherwise storage is reused: overlapping slots are overwritten with
    ///   `clone_from`, then the excess tail is dropped or the missing tail is
    ///   cloned into free slots. A panic in this path leaves `len` somewhere
    ///   between the old and new length, with every counted slot live.
    ///
    /// # Errors
    ///
    /// Returns the allocation error unchanged; the array is untouched.
    pub fn try_clone_from(&mut self, source: &Self) -> Result<(), RawBufferError>
    where
        T: Clone,
    {
        if source.len > self.capacity() {
            let mut copy = self.try_clone_items(source.as_slice())?;
            self.swap(&mut copy);
            return Ok(());
        }

        let shared = self.len.min(source.len);
        for (dst, src) in self.as_mut_slice()[..shared]
            .iter_mut()
            .zip(&source.as_slice()[..shared])
        {
            dst.clone_from(src);
        }

        if source.len < self.len {
            self.truncate(source.len);
            return Ok(());
        }

        for item in &source.as_slice()[shared..] {
            let value = item.clone();

            // SAFETY: len < source.len <= capacity, so slot `len` is free.
            unsafe { self.buffer.address(self.len).write(value) };
            self.len += 1;
        }

        Ok(())
    }
}

impl<T> Drop for Array<T> {
    fn drop(&mut self) {
        // Live values go first; the buffer field releases raw storage after.
        // SAFETY: [0, len) are live and never touched again.
        unsafe { ptr::drop_in_place(self.as_mut_slice()) };
    }
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Array<T> {
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|err| err.handle())
    }

    fn clone_from(&mut self, source: &Self) {
        self.try_clone_from(source)
            .unwrap_or_else(|err| err.handle());
    }
}

impl<T> Deref for Array<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T> DerefMut for Array<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T> IntoIterator for &'a mut Array<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}

impl<T> Extend<T> for Array<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();

        let needed = self.len.saturating_add(lower);
        if needed > self.capacity() {
            self.reserve(needed.max(self.capacity().saturating_mul(2)));
        }

        for item in iter {
            self.push(item);
        }
    }
}

impl<T> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<T: PartialEq> PartialEq for Array<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for Array<T> {}

impl<T: PartialEq<U>, U> PartialEq<[U]> for Array<T> {
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq<U>, U, const N: usize> PartialEq<[U; N]> for Array<T> {
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("data", &self.as_slice())
            .finish()
    }
}

use core::{
    alloc::Layout,
    marker::PhantomData,
    mem::{self, size_of},
    ptr::{self, NonNull},
};

use crate::{
    alloc::Allocator,
    collections::{ArrayError, ReserveStrategy},
    log::{log_error, log_verbose, log_warning, LOG_CAT},
};

/// Low level utility for allocating, reallocating, and deallocating a buffer of memory through an allocator,
/// without having to worry about all the corner cases involved.
/// In particular:
///
/// - Produces a dangling pointer for zero-sized types and zero-length blocks, and never asks the allocator for those.
/// - Avoids freeing the dangling pointer.
/// - Catches all overflows in capacity computations (promotes them to length errors).
/// - Routes every element construction, destruction and move out through the allocator.
///
/// This type does not in any way inspect the memory it manages. When dropped it *will* free its memory, but it *won't* try to drop its contents.
/// It is up to the user of `RawArray` to handle the actual things *stored* inside of it.
///
/// Unlike std's `RawVec`, zero-sized types still track a numeric capacity, so that the growth policy behaves the same for every element type.
pub(crate) struct RawArray<T, A: Allocator, R: ReserveStrategy> {
    ptr:      NonNull<T>,
    cap:      usize,
    alloc:    A,
    _phantom: PhantomData<(T, fn() -> R)>,
}

unsafe impl<T: Send, A: Allocator + Send, R: ReserveStrategy> Send for RawArray<T, A, R> {}
unsafe impl<T: Sync, A: Allocator + Sync, R: ReserveStrategy> Sync for RawArray<T, A, R> {}

impl<T, A: Allocator, R: ReserveStrategy> RawArray<T, A, R> {
    const IS_ZST: bool = size_of::<T>() == 0;

    /// Create an empty `RawArray` without allocating.
    #[must_use]
    pub(crate) const fn new_in(alloc: A) -> Self {
        Self { ptr: NonNull::dangling(), cap: 0, alloc, _phantom: PhantomData }
    }

    /// Create a `RawArray` with exactly the capacity and alignment requirements for a `[T; capacity]`.
    pub(crate) fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, ArrayError> {
        let mut raw = Self::new_in(alloc);
        raw.ptr = raw.allocate_block(capacity)?;
        raw.cap = capacity;
        Ok(raw)
    }

    /// Get a pointer to the start of the buffer.
    #[inline]
    pub(crate) fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Get the capacity of the buffer.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Replace the allocator.
    ///
    /// The current block must either be unallocated, or the new allocator must be equal to the current one.
    pub(crate) fn set_allocator(&mut self, alloc: A) {
        debug_assert!(self.cap == 0 || Self::IS_ZST || self.alloc.is_equal(&alloc));
        self.alloc = alloc;
    }

    /// Largest capacity this buffer can ever have.
    pub(crate) fn max_size(&self) -> usize {
        // Lengths stay within `isize`, so every position in the array can be expressed as an offset
        let by_bytes = isize::MAX as usize / size_of::<T>().max(1);
        self.alloc.max_size::<T>().min(by_bytes)
    }

    /// Check if `additional` elements do not fit after `len` elements.
    #[inline]
    pub(crate) fn needs_to_grow(&self, len: usize, additional: usize) -> bool {
        additional > self.cap.wrapping_sub(len)
    }

    /// Capacity to grow to, so that `additional` more elements fit after `len` elements.
    pub(crate) fn next_capacity(&self, len: usize, additional: usize) -> Result<usize, ArrayError> {
        let max = self.max_size();
        match R::calculate(len, additional, max) {
            Some(cap) => Ok(cap),
            None => Err(Self::length_error(len.saturating_add(additional), max)),
        }
    }

    /// Build the error for a request of `requested` elements.
    #[cold]
    pub(crate) fn length_error(requested: usize, max: usize) -> ArrayError {
        log_warning!(LOG_CAT, "Requested {requested} elements, but at most {max} fit in a single array");
        ArrayError::Length { requested, max }
    }

    /// Allocate an uninitialized block for `count` elements, which is not owned by this `RawArray`.
    ///
    /// The block must be released with `release_block`, or be passed to `adopt`.
    pub(crate) fn allocate_block(&self, count: usize) -> Result<NonNull<T>, ArrayError> {
        let max = self.max_size();
        if count > max {
            return Err(Self::length_error(count, max));
        }
        if Self::IS_ZST || count == 0 {
            return Ok(NonNull::dangling());
        }

        let layout = Layout::array::<T>(count).map_err(|_| Self::length_error(count, max))?;
        match self.alloc.allocate(layout) {
            Ok(ptr) => Ok(ptr.cast()),
            Err(_) => {
                log_error!(LOG_CAT, Self::allocate_block, "Failed to allocate {} bytes for {count} elements", layout.size());
                Err(ArrayError::Allocation { layout })
            },
        }
    }

    /// Release a block of `count` elements, without touching its contents.
    ///
    /// # Safety
    ///
    /// - `block` must have come from `allocate_block` with the same `count`, on this or an equal allocator.
    pub(crate) unsafe fn release_block(&self, block: NonNull<T>, count: usize) {
        if Self::IS_ZST || count == 0 {
            return;
        }
        let layout = Layout::from_size_align_unchecked(size_of::<T>() * count, mem::align_of::<T>());
        self.alloc.deallocate(block.cast(), layout);
    }

    /// Take ownership of `block`, releasing the current one.
    ///
    /// # Safety
    ///
    /// - `block` must have come from `allocate_block` with a count of `cap`.
    /// - All live elements must have been moved out of the current block.
    pub(crate) unsafe fn adopt(&mut self, block: NonNull<T>, cap: usize) {
        let (old, old_cap) = self.replace_block(block, cap);
        self.release_block(old, old_cap);
    }

    /// Take ownership of `block`, handing back the current block and its capacity.
    ///
    /// # Safety
    ///
    /// - `block` must have come from `allocate_block` with a count of `cap`.
    /// - The returned block must be released by the caller.
    pub(crate) unsafe fn replace_block(&mut self, block: NonNull<T>, cap: usize) -> (NonNull<T>, usize) {
        let old = mem::replace(&mut self.ptr, block);
        let old_cap = mem::replace(&mut self.cap, cap);
        (old, old_cap)
    }

    /// Release the current block and return to an unallocated state.
    ///
    /// # Safety
    ///
    /// - The block may not contain any live elements.
    pub(crate) unsafe fn release(&mut self) {
        self.adopt(NonNull::dangling(), 0);
    }

    /// Exchange blocks with `other`, leaving both allocators in place.
    ///
    /// Only valid when the two allocators are equal.
    pub(crate) fn swap_blocks(&mut self, other: &mut Self) {
        debug_assert!(self.alloc.is_equal(&other.alloc));
        mem::swap(&mut self.ptr, &mut other.ptr);
        mem::swap(&mut self.cap, &mut other.cap);
    }

    /// Move the `len` live elements into a new block of exactly `new_cap` elements.
    ///
    /// On failure the buffer is left untouched.
    pub(crate) fn relocate(&mut self, len: usize, new_cap: usize) -> Result<(), ArrayError> {
        debug_assert!(len <= new_cap);
        let block = self.allocate_block(new_cap)?;
        log_verbose!(LOG_CAT, "Relocating {len} elements from a capacity of {} to {new_cap}", self.cap);
        unsafe {
            ptr::copy_nonoverlapping(self.ptr(), block.as_ptr(), len);
            self.adopt(block, new_cap);
        }
        Ok(())
    }

    /// Make sure `additional` more elements fit after `len` elements, growing with the reserve strategy.
    pub(crate) fn grow_amortized(&mut self, len: usize, additional: usize) -> Result<(), ArrayError> {
        if !self.needs_to_grow(len, additional) {
            return Ok(());
        }
        let new_cap = self.next_capacity(len, additional)?;
        self.relocate(len, new_cap)
    }

    /// Construct `value` in `slot` through the allocator.
    ///
    /// # Safety
    ///
    /// - `slot` must be an uninitialized slot within a block of this buffer's allocator.
    #[inline]
    pub(crate) unsafe fn construct(&self, slot: *mut T, value: T) {
        self.alloc.construct(NonNull::new_unchecked(slot), value)
    }

    /// Move the element in `slot` out through the allocator.
    ///
    /// # Safety
    ///
    /// - `slot` must contain a live element, which is uninitialized afterwards.
    #[inline]
    pub(crate) unsafe fn extract(&self, slot: *mut T) -> T {
        self.alloc.extract(NonNull::new_unchecked(slot))
    }

    /// Move `count` elements from the slots at `from`, owned by `src`, into the uninitialized slots at `to`.
    ///
    /// Each element leaves `src`'s allocator through `extract` and enters this buffer's allocator through `construct`.
    ///
    /// # Safety
    ///
    /// - All `count` slots at `from` must contain live elements, which are uninitialized afterwards.
    /// - All `count` slots at `to` must be uninitialized slots within a block of this buffer's allocator.
    pub(crate) unsafe fn transfer_from(&self, src: &Self, from: *mut T, to: *mut T, count: usize) {
        for i in 0..count {
            self.construct(to.add(i), src.extract(from.add(i)));
        }
    }

    /// Destroy `count` consecutive elements starting at `start` through the allocator.
    ///
    /// If a destructor panics, the remaining elements are leaked.
    ///
    /// # Safety
    ///
    /// - All `count` slots must contain live elements, which are uninitialized afterwards.
    pub(crate) unsafe fn destroy_range(&self, start: *mut T, count: usize) {
        for i in 0..count {
            self.alloc.destroy(NonNull::new_unchecked(start.add(i)));
        }
    }
}

impl<T, A: Allocator, R: ReserveStrategy> Drop for RawArray<T, A, R> {
    fn drop(&mut self) {
        unsafe { self.release_block(self.ptr, self.cap) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alloc::Global, collections::{ExactReserveStrategy, GeometricReserveStrategy}};

    type Raw<T> = RawArray<T, Global, GeometricReserveStrategy>;

    #[test]
    fn empty_does_not_allocate() {
        let raw = Raw::<u32>::new_in(Global);
        assert_eq!(raw.capacity(), 0);
        assert_eq!(raw.ptr(), NonNull::<u32>::dangling().as_ptr());
    }

    #[test]
    fn zero_sized_types_track_capacity() {
        let mut raw = Raw::<()>::try_with_capacity_in(10, Global).unwrap();
        assert_eq!(raw.capacity(), 10);
        raw.grow_amortized(10, 1).unwrap();
        assert_eq!(raw.capacity(), 20);
        assert_eq!(raw.max_size(), isize::MAX as usize);
    }

    #[test]
    fn grow_uses_strategy() {
        let mut raw = Raw::<u64>::new_in(Global);
        raw.grow_amortized(0, 1).unwrap();
        assert_eq!(raw.capacity(), 1);
        raw.grow_amortized(1, 1).unwrap();
        assert_eq!(raw.capacity(), 2);
        raw.grow_amortized(2, 5).unwrap();
        assert_eq!(raw.capacity(), 7);

        let mut exact = RawArray::<u64, Global, ExactReserveStrategy>::new_in(Global);
        exact.grow_amortized(0, 3).unwrap();
        exact.grow_amortized(3, 1).unwrap();
        assert_eq!(exact.capacity(), 4);
    }

    #[test]
    fn relocate_keeps_elements() {
        let mut raw = Raw::<u32>::try_with_capacity_in(2, Global).unwrap();
        unsafe {
            raw.construct(raw.ptr(), 1);
            raw.construct(raw.ptr().add(1), 2);
        }
        raw.relocate(2, 8).unwrap();
        assert_eq!(raw.capacity(), 8);
        unsafe {
            assert_eq!(*raw.ptr(), 1);
            assert_eq!(*raw.ptr().add(1), 2);
        }
    }

    #[test]
    fn oversized_requests_are_length_errors() {
        let raw = Raw::<u64>::new_in(Global);
        let max = raw.max_size();
        assert_eq!(max, isize::MAX as usize / 8);
        assert_eq!(raw.allocate_block(max + 1), Err(ArrayError::Length { requested: max + 1, max }));
        assert_eq!(raw.next_capacity(max, 1), Err(ArrayError::Length { requested: max + 1, max }));
    }
}

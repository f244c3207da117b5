use core::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    mem,
    ops::{self, Bound, Index, IndexMut, RangeBounds},
    ptr::{self, NonNull},
    slice::{self, SliceIndex},
};

use scopeguard::ScopeGuard;

use crate::{
    alloc::{Allocator, Global},
    log::{log_verbose, LOG_CAT},
};

use super::{handle_error, imp::raw_array::RawArray, impl_slice_partial_eq_generic, ArrayError, GeometricReserveStrategy, ReserveStrategy};

use guard::{Fill, StagedValue};

mod compare;
mod cursor;
mod erasure;
mod guard;
mod into_iter;

pub use compare::{equivalent, lexicographic, synth_three_way, LessThan, Ranking, SynthLess, ThreeWay};
pub use cursor::{Cursor, CursorMut, RandomAccess, RandomAccessMut, Reverse};
pub use erasure::{erase, erase_if};
pub use into_iter::IntoIter;

/// A contiguous growable array type, also known as a dynamic array.
///
/// Dynamic arrays have *O*(1) indexing, amortized *O*(1) push (to the end), and *O*(1) pop (from the back).
///
/// Every block of memory is requested from the array's allocator `A`, and every element is constructed and destroyed through it.
/// How much the array grows when it runs out of room is decided by the reserve strategy `R`.
///
/// # Examples
///
/// ```
/// use dynarr_common::{collections::DynArray, dynarray};
///
/// let mut arr = DynArray::new();
/// arr.push_back(1);
/// arr.push_back(2);
///
/// assert_eq!(arr.len(), 2);
/// assert_eq!(arr[0], 1);
///
/// arr[0] = 7;
/// arr.insert(1, 3);
/// assert_eq!(arr, [7, 3, 2]);
///
/// let other = dynarray![7, 3, 2];
/// assert_eq!(arr, other);
/// ```
///
/// # Failure safety
///
/// Operations that construct elements either complete, or leave the array exactly as it was (including its capacity),
/// with the exception of multi-element inserts into the middle of an array that does not need to reallocate,
/// and in-place assignments. When those fail halfway, the array keeps the elements it had, plus the new elements that were already built.
///
/// Failures of the elements themselves (panics from `Clone` or `Default`, or the error of a fallible constructor) are passed through unchanged.
pub struct DynArray<T, A: Allocator = Global, R: ReserveStrategy = GeometricReserveStrategy> {
    buf: RawArray<T, A, R>,
    len: usize,
}

static_assertions::assert_impl_all!(DynArray<u32>: Send, Sync, Clone, Default);
static_assertions::assert_not_impl_any!(DynArray<std::rc::Rc<u32>>: Send, Sync);

impl<T> DynArray<T> {
    /// Constructs a new, empty `DynArray<T>`.
    ///
    /// The dynamic array will not allocate until elements are pushed onto it.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Constructs a new, empty `DynArray<T>` with room for exactly `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if the capacity exceeds [`max_size`](DynArray::max_size), or if the allocation fails.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }

    /// Constructs a `DynArray<T>` holding `count` default values.
    #[must_use]
    pub fn with_len(count: usize) -> Self where
        T: Default
    {
        Self::with_len_in(count, Global)
    }

    /// Constructs a `DynArray<T>` holding `count` clones of `value`.
    #[must_use]
    pub fn from_elem(count: usize, value: &T) -> Self where
        T: Clone
    {
        Self::from_elem_in(count, value, Global)
    }

    /// Constructs a `DynArray<T>` holding clones of the elements in `values`.
    #[must_use]
    pub fn from_slice(values: &[T]) -> Self where
        T: Clone
    {
        Self::from_slice_in(values, Global)
    }
}

impl<T, A: Allocator, R: ReserveStrategy> DynArray<T, A, R> {
    /// Constructs a new, empty `DynArray<T, A, R>` using the given allocator.
    ///
    /// The dynamic array will not allocate until elements are pushed onto it.
    #[inline]
    #[must_use]
    pub const fn new_in(alloc: A) -> Self {
        Self { buf: RawArray::new_in(alloc), len: 0 }
    }

    /// Constructs a new, empty `DynArray<T, A, R>` with room for exactly `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if the capacity exceeds [`max_size`](DynArray::max_size), or if the allocation fails.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self::try_with_capacity_in(capacity, alloc).unwrap_or_else(|err| handle_error(err))
    }

    /// Tries to construct a new, empty `DynArray<T, A, R>` with room for exactly `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the capacity exceeds [`max_size`](DynArray::max_size), or if the allocator reports a failure.
    pub fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, ArrayError> {
        Ok(Self { buf: RawArray::try_with_capacity_in(capacity, alloc)?, len: 0 })
    }

    /// Constructs a `DynArray<T, A, R>` holding `count` default values.
    pub fn with_len_in(count: usize, alloc: A) -> Self where
        T: Default
    {
        Self::try_with_len_in(count, alloc).unwrap_or_else(|err| handle_error(err))
    }

    /// Tries to construct a `DynArray<T, A, R>` holding `count` default values.
    pub fn try_with_len_in(count: usize, alloc: A) -> Result<Self, ArrayError> where
        T: Default
    {
        let mut arr = Self::try_with_capacity_in(count, alloc)?;
        arr.try_resize_with(count, || Ok::<T, ArrayError>(T::default()))?;
        Ok(arr)
    }

    /// Constructs a `DynArray<T, A, R>` holding `count` clones of `value`.
    pub fn from_elem_in(count: usize, value: &T, alloc: A) -> Self where
        T: Clone
    {
        Self::try_from_elem_in(count, value, alloc).unwrap_or_else(|err| handle_error(err))
    }

    /// Tries to construct a `DynArray<T, A, R>` holding `count` clones of `value`.
    pub fn try_from_elem_in(count: usize, value: &T, alloc: A) -> Result<Self, ArrayError> where
        T: Clone
    {
        let mut arr = Self::try_with_capacity_in(count, alloc)?;
        arr.try_insert_n(0, count, value)?;
        Ok(arr)
    }

    /// Constructs a `DynArray<T, A, R>` holding clones of the elements in `values`.
    pub fn from_slice_in(values: &[T], alloc: A) -> Self where
        T: Clone
    {
        Self::try_from_slice_in(values, alloc).unwrap_or_else(|err| handle_error(err))
    }

    /// Tries to construct a `DynArray<T, A, R>` holding clones of the elements in `values`.
    pub fn try_from_slice_in(values: &[T], alloc: A) -> Result<Self, ArrayError> where
        T: Clone
    {
        let mut arr = Self::try_with_capacity_in(values.len(), alloc)?;
        arr.try_insert_slice(0, values)?;
        Ok(arr)
    }

    /// Constructs a `DynArray<T, A, R>` from the elements produced by `iter`.
    ///
    /// The lower bound of the iterator's size hint is reserved up front, any further elements are appended one at a time.
    pub fn from_iter_in<I: IntoIterator<Item = T>>(iter: I, alloc: A) -> Self {
        Self::try_from_iter_in(iter, alloc).unwrap_or_else(|err| handle_error(err))
    }

    /// Tries to construct a `DynArray<T, A, R>` from the elements produced by `iter`.
    pub fn try_from_iter_in<I: IntoIterator<Item = T>>(iter: I, alloc: A) -> Result<Self, ArrayError> {
        let iter = iter.into_iter();
        let mut arr = Self::try_with_capacity_in(iter.size_hint().0, alloc)?;
        for value in iter {
            arr.try_push_back(value)?;
        }
        Ok(arr)
    }

    /// Clone the array into a new one using the given allocator.
    pub fn clone_in(&self, alloc: A) -> Self where
        T: Clone
    {
        self.try_clone_in(alloc).unwrap_or_else(|err| handle_error(err))
    }

    /// Try to clone the array into a new one using the given allocator.
    pub fn try_clone_in(&self, alloc: A) -> Result<Self, ArrayError> where
        T: Clone
    {
        Self::try_from_slice_in(self.as_slice(), alloc)
    }

    /// Take the contents of the array, leaving it empty and without a buffer.
    ///
    /// The returned array owns the original buffer and a clone of the allocator.
    #[must_use]
    pub fn take(&mut self) -> Self {
        let alloc = self.buf.allocator().clone();
        mem::replace(self, Self::new_in(alloc))
    }

    /// Take the contents of `other` into a new array using `alloc`.
    ///
    /// If `alloc` is equal to the allocator of `other`, the buffer is stolen,
    /// otherwise the elements are relocated into a new buffer allocated with `alloc`.
    /// In both cases `other` is left empty and without a buffer.
    pub fn take_in(other: &mut Self, alloc: A) -> Self {
        Self::try_take_in(other, alloc).unwrap_or_else(|err| handle_error(err))
    }

    /// Try to take the contents of `other` into a new array using `alloc`.
    ///
    /// # Errors
    ///
    /// Returns an error if a new buffer is needed and it could not be allocated, in which case `other` is left untouched.
    pub fn try_take_in(other: &mut Self, alloc: A) -> Result<Self, ArrayError> {
        if alloc.is_equal(other.buf.allocator()) {
            let mut taken = other.take();
            taken.buf.set_allocator(alloc);
            return Ok(taken);
        }

        let mut taken = Self::try_with_capacity_in(other.len, alloc)?;
        unsafe {
            let count = mem::replace(&mut other.len, 0);
            taken.buf.transfer_from(&other.buf, other.buf.ptr(), taken.buf.ptr(), count);
            taken.len = count;
            other.buf.release();
        }
        Ok(taken)
    }

    /// Replace the contents of the array with the contents of `other`, leaving `other` empty and without a buffer.
    ///
    /// If the allocator propagates on move-assignment, or both allocators are equal, the buffer of `other` is stolen.
    /// Otherwise the elements of `other` are relocated into the array's own buffer.
    pub fn move_assign(&mut self, other: &mut Self) {
        if let Err(err) = self.try_move_assign(other) {
            handle_error(err)
        }
    }

    /// Try to replace the contents of the array with the contents of `other`.
    ///
    /// # Errors
    ///
    /// Returns an error if the elements need to be relocated, and there is no room for them and a new buffer could not be allocated.
    /// In that case, both arrays are left untouched.
    pub fn try_move_assign(&mut self, other: &mut Self) -> Result<(), ArrayError> {
        let propagate = self.buf.allocator().propagation().on_move_assign;
        if propagate || self.buf.allocator().is_equal(other.buf.allocator()) {
            self.clear();
            unsafe { self.buf.release() };
            if propagate {
                self.buf.set_allocator(other.buf.allocator().clone());
            }
            self.buf.swap_blocks(&mut other.buf);
            self.len = mem::replace(&mut other.len, 0);
            return Ok(());
        }

        let count = other.len;
        if count > self.buf.capacity() {
            let block = self.buf.allocate_block(count)?;
            unsafe {
                other.len = 0;
                self.buf.transfer_from(&other.buf, other.buf.ptr(), block.as_ptr(), count);
                other.buf.release();
                self.replace_contents(block, count, count);
            }
        } else {
            self.clear();
            unsafe {
                other.len = 0;
                self.buf.transfer_from(&other.buf, other.buf.ptr(), self.buf.ptr(), count);
                self.len = count;
                other.buf.release();
            }
        }
        Ok(())
    }

    /// Replace the contents with `count` clones of `value`.
    pub fn assign(&mut self, count: usize, value: &T) where
        T: Clone
    {
        if let Err(err) = self.try_assign(count, value) {
            handle_error(err)
        }
    }

    /// Try to replace the contents with `count` clones of `value`.
    ///
    /// If `count` does not fit in the current capacity, a new buffer of exactly `count` elements is built before the old contents are dropped.
    /// Otherwise the existing elements are overwritten in place using [`Clone::clone_from`].
    pub fn try_assign(&mut self, count: usize, value: &T) -> Result<(), ArrayError> where
        T: Clone
    {
        if count > self.buf.capacity() {
            return self.rebuild_exact(count, (0..count).map(|_| value.clone()));
        }

        let len = self.len;
        for slot in &mut self.as_mut_slice()[..count.min(len)] {
            slot.clone_from(value);
        }
        if count > len {
            self.splice_with::<ArrayError, _>(len, count - len, |fill| {
                while fill.remaining() > 0 {
                    fill.push(value.clone());
                }
                Ok(())
            })?;
        } else {
            self.truncate_to(count);
        }
        Ok(())
    }

    /// Replace the contents with clones of the elements in `values`.
    pub fn assign_slice(&mut self, values: &[T]) where
        T: Clone
    {
        if let Err(err) = self.try_assign_slice(values) {
            handle_error(err)
        }
    }

    /// Try to replace the contents with clones of the elements in `values`.
    pub fn try_assign_slice(&mut self, values: &[T]) -> Result<(), ArrayError> where
        T: Clone
    {
        if values.len() > self.buf.capacity() {
            return self.rebuild_exact(values.len(), values.iter().cloned());
        }

        let len = self.len;
        let (common, rest) = values.split_at(values.len().min(len));
        for (slot, value) in self.as_mut_slice().iter_mut().zip(common) {
            slot.clone_from(value);
        }
        if rest.is_empty() {
            self.truncate_to(values.len());
            Ok(())
        } else {
            self.try_insert_slice(len, rest).map(drop)
        }
    }

    /// Replace the contents with the elements produced by `iter`.
    pub fn assign_iter<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        if let Err(err) = self.try_assign_iter(iter) {
            handle_error(err)
        }
    }

    /// Try to replace the contents with the elements produced by `iter`.
    ///
    /// When the iterator reports an exact length that does not fit, a new buffer of exactly that length is built first.
    /// Otherwise the live elements are overwritten in place, and any remaining elements are appended one at a time.
    pub fn try_assign_iter<I: IntoIterator<Item = T>>(&mut self, iter: I) -> Result<(), ArrayError> {
        let mut iter = iter.into_iter();
        match iter.size_hint() {
            (lower, Some(upper)) if lower == upper && lower > self.buf.capacity() => {
                return self.rebuild_exact(lower, iter);
            },
            _ => (),
        }

        let mut assigned = 0;
        for slot in self.as_mut_slice() {
            match iter.next() {
                Some(value) => *slot = value,
                None => break,
            }
            assigned += 1;
        }
        if assigned < self.len {
            self.truncate_to(assigned);
            return Ok(());
        }
        for value in iter {
            self.try_push_back(value)?;
        }
        Ok(())
    }

    /// Get the allocator used by the array.
    #[inline]
    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    /// Returns the number of elements in the array.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the array contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of elements the array can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Returns the largest number of elements the array can ever hold.
    ///
    /// This is limited both by the allocator and by the largest allocation that fits in `isize::MAX` bytes.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.buf.max_size()
    }

    /// Returns a raw pointer to the array's buffer.
    ///
    /// The pointer is dangling, but well aligned, when the array has no buffer.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.buf.ptr()
    }

    /// Returns an unsafe mutable pointer to the array's buffer.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buf.ptr()
    }

    /// Extracts a slice containing the entire array.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    /// Extracts a mutable slice of the entire array.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), self.len) }
    }

    /// Forces the length of the array to `new_len`.
    ///
    /// # Safety
    ///
    /// - `new_len` must be less than or equal to [`capacity`](DynArray::capacity).
    /// - The elements at `old_len..new_len` must be initialized.
    #[inline]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity());
        self.len = new_len;
    }

    /// Returns a reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::OutOfRange`] if `index` is not smaller than the length.
    pub fn at(&self, index: usize) -> Result<&T, ArrayError> {
        let len = self.len;
        self.as_slice().get(index).ok_or(ArrayError::OutOfRange { index, len })
    }

    /// Returns a mutable reference to the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::OutOfRange`] if `index` is not smaller than the length.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, ArrayError> {
        let len = self.len;
        self.as_mut_slice().get_mut(index).ok_or(ArrayError::OutOfRange { index, len })
    }

    /// Returns a reference to the first element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[inline]
    pub fn front(&self) -> &T {
        &self[0]
    }

    /// Returns a mutable reference to the first element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[inline]
    pub fn front_mut(&mut self) -> &mut T {
        &mut self[0]
    }

    /// Returns a reference to the last element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[inline]
    pub fn back(&self) -> &T {
        let last = self.len.wrapping_sub(1);
        &self[last]
    }

    /// Returns a mutable reference to the last element.
    ///
    /// # Panics
    ///
    /// Panics if the array is empty.
    #[inline]
    pub fn back_mut(&mut self) -> &mut T {
        let last = self.len.wrapping_sub(1);
        &mut self[last]
    }

    /// Cursor at the first element.
    pub fn begin(&self) -> Cursor<'_, T> {
        Cursor::new(self.as_slice(), 0)
    }

    /// Cursor one past the last element.
    pub fn end(&self) -> Cursor<'_, T> {
        Cursor::new(self.as_slice(), self.len)
    }

    /// Reverse cursor at the last element.
    pub fn rbegin(&self) -> Reverse<Cursor<'_, T>> {
        Reverse::new(self.end())
    }

    /// Reverse cursor one before the first element.
    pub fn rend(&self) -> Reverse<Cursor<'_, T>> {
        Reverse::new(self.begin())
    }

    /// Mutable cursor at the first element.
    pub fn begin_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::new(self.as_mut_slice(), 0)
    }

    /// Mutable cursor one past the last element.
    pub fn end_mut(&mut self) -> CursorMut<'_, T> {
        let len = self.len;
        CursorMut::new(self.as_mut_slice(), len)
    }

    /// Mutable reverse cursor at the last element.
    pub fn rbegin_mut(&mut self) -> Reverse<CursorMut<'_, T>> {
        Reverse::new(self.end_mut())
    }

    /// Mutable reverse cursor one before the first element.
    pub fn rend_mut(&mut self) -> Reverse<CursorMut<'_, T>> {
        Reverse::new(self.begin_mut())
    }

    /// Reserve room for exactly `new_cap` elements.
    ///
    /// Does nothing if the capacity is already large enough.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity exceeds [`max_size`](DynArray::max_size), or if the allocation fails.
    pub fn reserve(&mut self, new_cap: usize) {
        if let Err(err) = self.try_reserve(new_cap) {
            handle_error(err)
        }
    }

    /// Try to reserve room for exactly `new_cap` elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the new capacity exceeds [`max_size`](DynArray::max_size), or if the allocator reports a failure.
    /// The array is left untouched in both cases.
    pub fn try_reserve(&mut self, new_cap: usize) -> Result<(), ArrayError> {
        if new_cap <= self.buf.capacity() {
            return Ok(());
        }
        self.buf.relocate(self.len, new_cap)
    }

    /// Shrink the capacity to exactly the length of the array.
    pub fn shrink_to_fit(&mut self) {
        if let Err(err) = self.try_shrink_to_fit() {
            handle_error(err)
        }
    }

    /// Try to shrink the capacity to exactly the length of the array.
    ///
    /// # Errors
    ///
    /// Returns an error if the smaller buffer could not be allocated, in which case the array is left untouched.
    pub fn try_shrink_to_fit(&mut self) -> Result<(), ArrayError> {
        if self.buf.capacity() == self.len {
            return Ok(());
        }
        log_verbose!(LOG_CAT, "Shrinking array from a capacity of {} to {}", self.buf.capacity(), self.len);
        self.buf.relocate(self.len, self.len)
    }

    /// Destroy all elements, keeping the buffer.
    pub fn clear(&mut self) {
        self.truncate_to(0);
    }

    /// Append `value` to the back of the array.
    ///
    /// # Panics
    ///
    /// Panics if the array would exceed [`max_size`](DynArray::max_size), or if a reallocation fails.
    pub fn push_back(&mut self, value: T) {
        if let Err(err) = self.try_push_back(value) {
            handle_error(err)
        }
    }

    /// Try to append `value` to the back of the array.
    ///
    /// # Errors
    ///
    /// Returns an error if the array would exceed [`max_size`](DynArray::max_size), or if a reallocation fails.
    /// The array is left untouched and `value` is dropped.
    pub fn try_push_back(&mut self, value: T) -> Result<(), ArrayError> {
        let len = self.len;
        self.buf.grow_amortized(len, 1)?;
        unsafe { self.buf.construct(self.buf.ptr().add(len), value) };
        self.len = len + 1;
        Ok(())
    }

    /// Construct a new element at the back of the array, returning a reference to it.
    pub fn emplace_back<F: FnOnce() -> T>(&mut self, f: F) -> &mut T {
        match self.try_emplace_back(|| Ok::<T, ArrayError>(f())) {
            Ok(value) => value,
            Err(err) => handle_error(err),
        }
    }

    /// Construct a new element at the back of the array from a fallible constructor.
    ///
    /// If the array needs to grow, the element is constructed in the new buffer before any element is moved.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or a converted [`ArrayError`] if the array could not grow.
    /// The array is left untouched in both cases.
    pub fn try_emplace_back<E, F>(&mut self, f: F) -> Result<&mut T, E> where
        E: From<ArrayError>,
        F: FnOnce() -> Result<T, E>
    {
        let len = self.len;
        self.splice_with::<E, _>(len, 1, |fill| {
            fill.push(f()?);
            Ok(())
        })?;
        Ok(unsafe { &mut *self.buf.ptr().add(len) })
    }

    /// Remove the last element and return it.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::OutOfRange`] if the array is empty.
    pub fn pop_back(&mut self) -> Result<T, ArrayError> {
        if self.len == 0 {
            return Err(ArrayError::OutOfRange { index: 0, len: 0 });
        }
        self.len -= 1;
        Ok(unsafe { self.buf.extract(self.buf.ptr().add(self.len)) })
    }

    /// Insert `value` at `index`, shifting all elements after it to the right.
    ///
    /// Returns the index of the inserted element.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`, or if the array could not grow.
    pub fn insert(&mut self, index: usize, value: T) -> usize {
        self.try_insert(index, value).unwrap_or_else(|err| handle_error(err))
    }

    /// Try to insert `value` at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ArrayError::OutOfRange`] if `index > len`, or an error if the array could not grow.
    /// The array is left untouched in both cases.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<usize, ArrayError> {
        self.check_position(index)?;
        self.splice_with::<ArrayError, _>(index, 1, |fill| {
            fill.push(value);
            Ok(())
        })?;
        Ok(index)
    }

    /// Insert `count` clones of `value` at `index`.
    ///
    /// Returns the index of the first inserted element.
    pub fn insert_n(&mut self, index: usize, count: usize, value: &T) -> usize where
        T: Clone
    {
        self.try_insert_n(index, count, value).unwrap_or_else(|err| handle_error(err))
    }

    /// Try to insert `count` clones of `value` at `index`.
    pub fn try_insert_n(&mut self, index: usize, count: usize, value: &T) -> Result<usize, ArrayError> where
        T: Clone
    {
        self.check_position(index)?;
        self.splice_with::<ArrayError, _>(index, count, |fill| {
            while fill.remaining() > 0 {
                fill.push(value.clone());
            }
            Ok(())
        })?;
        Ok(index)
    }

    /// Insert clones of the elements in `values` at `index`.
    ///
    /// Returns the index of the first inserted element.
    pub fn insert_slice(&mut self, index: usize, values: &[T]) -> usize where
        T: Clone
    {
        self.try_insert_slice(index, values).unwrap_or_else(|err| handle_error(err))
    }

    /// Try to insert clones of the elements in `values` at `index`.
    pub fn try_insert_slice(&mut self, index: usize, values: &[T]) -> Result<usize, ArrayError> where
        T: Clone
    {
        self.try_insert_iter(index, values.iter().cloned())
    }

    /// Insert the elements produced by `iter` at `index`.
    ///
    /// Returns the index of the first inserted element.
    pub fn insert_iter<I>(&mut self, index: usize, iter: I) -> usize where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator
    {
        self.try_insert_iter(index, iter).unwrap_or_else(|err| handle_error(err))
    }

    /// Try to insert the elements produced by `iter` at `index`.
    ///
    /// Room for the reported length of the iterator is made up front.
    /// If the iterator produces fewer elements than it reported, only the produced elements are inserted,
    /// any elements after the reported length are ignored.
    pub fn try_insert_iter<I>(&mut self, index: usize, iter: I) -> Result<usize, ArrayError> where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator
    {
        self.check_position(index)?;
        let mut iter = iter.into_iter();
        let count = iter.len();
        self.splice_with::<ArrayError, _>(index, count, |fill| {
            while fill.remaining() > 0 {
                match iter.next() {
                    Some(value) => fill.push(value),
                    None => break,
                }
            }
            Ok(())
        })?;
        Ok(index)
    }

    /// Insert `count` clones of the element at `src` at `index`.
    ///
    /// Returns the index of the first inserted element.
    pub fn insert_from_within(&mut self, index: usize, src: usize, count: usize) -> usize where
        T: Clone
    {
        self.try_insert_from_within(index, src, count).unwrap_or_else(|err| handle_error(err))
    }

    /// Try to insert `count` clones of the element at `src` at `index`.
    ///
    /// The source element is cloned into a staging slot before any element is shifted,
    /// so every inserted element is a clone of the original value at `src`.
    pub fn try_insert_from_within(&mut self, index: usize, src: usize, count: usize) -> Result<usize, ArrayError> where
        T: Clone
    {
        self.check_position(index)?;
        let value = self.at(src)?;
        if count == 0 {
            return Ok(index);
        }

        let staged = StagedValue::try_new(self.buf.allocator().clone(), || Ok::<T, ArrayError>(value.clone()))?;
        self.splice_with::<ArrayError, _>(index, count, move |fill| {
            while fill.remaining() > 1 {
                fill.push(staged.get().clone());
            }
            fill.push(staged.take());
            Ok(())
        })?;
        Ok(index)
    }

    /// Construct a new element at `index`.
    ///
    /// Returns the index of the new element.
    pub fn emplace<F: FnOnce() -> T>(&mut self, index: usize, f: F) -> usize {
        self.try_emplace(index, || Ok::<T, ArrayError>(f())).unwrap_or_else(|err| handle_error(err))
    }

    /// Construct a new element at `index` from a fallible constructor.
    ///
    /// When elements need to be shifted, the value is constructed in a staging slot first,
    /// so the array is left untouched if `f` fails.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or a converted [`ArrayError`] if `index > len` or the array could not grow.
    pub fn try_emplace<E, F>(&mut self, index: usize, f: F) -> Result<usize, E> where
        E: From<ArrayError>,
        F: FnOnce() -> Result<T, E>
    {
        self.check_position(index)?;
        if index == self.len || self.buf.needs_to_grow(self.len, 1) {
            // Nothing has been moved yet when `f` runs
            self.splice_with::<E, _>(index, 1, |fill| {
                fill.push(f()?);
                Ok(())
            })?;
        } else {
            let staged = StagedValue::try_new(self.buf.allocator().clone(), f)?;
            self.splice_with::<E, _>(index, 1, move |fill| {
                fill.push(staged.take());
                Ok(())
            })?;
        }
        Ok(index)
    }

    /// Remove the element at `index`, shifting all elements after it to the left.
    ///
    /// Returns the index of the element that followed the removed one.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn erase(&mut self, index: usize) -> usize {
        self.try_erase(index).unwrap_or_else(|err| handle_error(err))
    }

    /// Try to remove the element at `index`.
    pub fn try_erase(&mut self, index: usize) -> Result<usize, ArrayError> {
        if index >= self.len {
            return Err(ArrayError::OutOfRange { index, len: self.len });
        }
        self.try_erase_range(index..index + 1)
    }

    /// Remove the elements in `range`, shifting all elements after it to the left.
    ///
    /// Returns the start of the range, which now holds the element that followed the removed ones.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds, or its start lies after its end.
    pub fn erase_range<Rg: RangeBounds<usize>>(&mut self, range: Rg) -> usize {
        self.try_erase_range(range).unwrap_or_else(|err| handle_error(err))
    }

    /// Try to remove the elements in `range`.
    ///
    /// If an element panics while being dropped, the remaining elements in the range are leaked, but the tail is still shifted into place.
    pub fn try_erase_range<Rg: RangeBounds<usize>>(&mut self, range: Rg) -> Result<usize, ArrayError> {
        let len = self.len;
        let first = match range.start_bound() {
            Bound::Included(&first) => first,
            Bound::Excluded(&first) => first.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let last = match range.end_bound() {
            Bound::Included(&last) => last.saturating_add(1),
            Bound::Excluded(&last) => last,
            Bound::Unbounded => len,
        };
        if last > len {
            return Err(ArrayError::OutOfRange { index: last, len });
        }
        if first > last {
            return Err(ArrayError::OutOfRange { index: first, len: last });
        }
        if first == last {
            return Ok(first);
        }

        let base = self.buf.ptr();
        let tail = len - last;
        // Until the tail is shifted back, only the prefix is live
        self.len = first;
        let len_slot = &mut self.len;
        let _shift = scopeguard::guard((), move |_| unsafe {
            ptr::copy(base.add(last), base.add(first), tail);
            *len_slot = first + tail;
        });
        unsafe { self.buf.destroy_range(base.add(first), last - first) };
        Ok(first)
    }

    /// Resize the array to `new_len` elements, appending clones of `value` when growing.
    pub fn resize(&mut self, new_len: usize, value: T) where
        T: Clone
    {
        if let Err(err) = self.try_resize(new_len, value) {
            handle_error(err)
        }
    }

    /// Try to resize the array to `new_len` elements, appending clones of `value` when growing.
    ///
    /// If a clone panics, the array is left with exactly its original elements.
    pub fn try_resize(&mut self, new_len: usize, value: T) -> Result<(), ArrayError> where
        T: Clone
    {
        let len = self.len;
        if new_len <= len {
            self.truncate_to(new_len);
            return Ok(());
        }
        self.splice_with(len, new_len - len, |fill| {
            while fill.remaining() > 1 {
                fill.push(value.clone());
            }
            fill.push(value);
            Ok(())
        }).map(drop)
    }

    /// Resize the array to `new_len` elements, appending default values when growing.
    pub fn resize_default(&mut self, new_len: usize) where
        T: Default
    {
        self.resize_with(new_len, T::default)
    }

    /// Resize the array to `new_len` elements, appending values returned by `f` when growing.
    pub fn resize_with<F: FnMut() -> T>(&mut self, new_len: usize, mut f: F) {
        if let Err(err) = self.try_resize_with(new_len, || Ok::<T, ArrayError>(f())) {
            handle_error(err)
        }
    }

    /// Try to resize the array to `new_len` elements, appending values returned by the fallible constructor `f` when growing.
    ///
    /// # Errors
    ///
    /// Returns the first error of `f`, or a converted [`ArrayError`] if the array could not grow.
    /// The array is left with exactly its original elements in both cases.
    pub fn try_resize_with<E, F>(&mut self, new_len: usize, mut f: F) -> Result<(), E> where
        E: From<ArrayError>,
        F: FnMut() -> Result<T, E>
    {
        let len = self.len;
        if new_len <= len {
            self.truncate_to(new_len);
            return Ok(());
        }
        self.splice_with(len, new_len - len, |fill| {
            while fill.remaining() > 0 {
                fill.push(f()?);
            }
            Ok(())
        }).map(drop)
    }

    /// Swap the contents of two arrays.
    ///
    /// The allocators are swapped along with the buffers when the allocator propagates on swap, or when the two allocators are not equal,
    /// so that every buffer always stays with the allocator it came from.
    pub fn swap(&mut self, other: &mut Self) {
        if self.buf.allocator().propagation().on_swap || !self.buf.allocator().is_equal(other.buf.allocator()) {
            mem::swap(self, other);
        } else {
            self.buf.swap_blocks(&mut other.buf);
            mem::swap(&mut self.len, &mut other.len);
        }
    }

    /// Lexicographically compare the array with `other` using the given ranking.
    pub fn compare_by<K: Ranking<T>>(&self, other: &[T], ranking: K) -> Ordering {
        lexicographic(self.as_slice(), other, &ranking)
    }

    /// Check if the array and `other` have the same length, and every pair of elements ranks as equivalent.
    pub fn equivalent_by<K: Ranking<T>>(&self, other: &[T], ranking: K) -> bool {
        equivalent(self.as_slice(), other, &ranking)
    }

    //--------------------------------------------------------------

    fn check_position(&self, index: usize) -> Result<(), ArrayError> {
        if index > self.len {
            Err(ArrayError::OutOfRange { index, len: self.len })
        } else {
            Ok(())
        }
    }

    fn truncate_to(&mut self, new_len: usize) {
        let len = self.len;
        if new_len >= len {
            return;
        }
        self.len = new_len;
        unsafe { self.buf.destroy_range(self.buf.ptr().add(new_len), len - new_len) };
    }

    /// Switch to `block`, which already holds `len` live elements, destroying the current elements and releasing the current block.
    ///
    /// # Safety
    ///
    /// - `block` must have been allocated with this array's allocator for `cap` elements.
    unsafe fn replace_contents(&mut self, block: NonNull<T>, cap: usize, len: usize) {
        let (old, old_cap) = self.buf.replace_block(block, cap);
        let old_len = mem::replace(&mut self.len, len);
        let buf = &self.buf;
        defer! { buf.release_block(old, old_cap) }
        buf.destroy_range(old.as_ptr(), old_len);
    }

    /// Build a new buffer of exactly `count` elements from `iter`, and only then drop the current contents.
    fn rebuild_exact<I: Iterator<Item = T>>(&mut self, count: usize, iter: I) -> Result<(), ArrayError> {
        let buf = &self.buf;
        let block = scopeguard::guard(buf.allocate_block(count)?, |block| unsafe { buf.release_block(block, count) });
        let mut fill = scopeguard::guard(Fill::new(buf.allocator(), block.as_ptr(), count), |mut fill| unsafe { fill.unwind() });
        for value in iter.take(count) {
            fill.push(value);
        }
        let filled = ScopeGuard::into_inner(fill).filled();
        let block = ScopeGuard::into_inner(block);
        unsafe { self.replace_contents(block, count, filled) };
        Ok(())
    }

    /// Make room for `count` new elements at `index`, and let `fill_fn` construct them.
    ///
    /// Returns the number of elements that were constructed, which can be less than `count` if `fill_fn` stopped early.
    ///
    /// - When the array has to grow, the new elements are built in the new block before any existing element is moved,
    ///   and a failure releases the new block, leaving the array untouched.
    /// - When inserting at the end, a failure destroys the new elements, leaving the array untouched.
    /// - Otherwise the tail is shifted out of the way first, and a failure keeps the new elements that were already built,
    ///   pulling the tail back against them.
    fn splice_with<E, F>(&mut self, index: usize, count: usize, fill_fn: F) -> Result<usize, E> where
        E: From<ArrayError>,
        F: FnOnce(&mut Fill<'_, T, A>) -> Result<(), E>
    {
        debug_assert!(index <= self.len);
        if count == 0 {
            return Ok(0);
        }
        if self.buf.needs_to_grow(self.len, count) {
            self.splice_realloc(index, count, fill_fn)
        } else if index == self.len {
            self.splice_append(count, fill_fn)
        } else {
            self.splice_shift(index, count, fill_fn)
        }
    }

    fn splice_realloc<E, F>(&mut self, index: usize, count: usize, fill_fn: F) -> Result<usize, E> where
        E: From<ArrayError>,
        F: FnOnce(&mut Fill<'_, T, A>) -> Result<(), E>
    {
        let len = self.len;
        let new_cap = self.buf.next_capacity(len, count)?;

        let buf = &self.buf;
        let block = scopeguard::guard(buf.allocate_block(new_cap)?, |block| unsafe { buf.release_block(block, new_cap) });
        let mut fill = scopeguard::guard(Fill::new(buf.allocator(), unsafe { block.as_ptr().add(index) }, count), |mut fill| unsafe { fill.unwind() });
        fill_fn(&mut *fill)?;
        let filled = ScopeGuard::into_inner(fill).filled();
        let block = ScopeGuard::into_inner(block);

        log_verbose!(LOG_CAT, "Growing array from a capacity of {} to {new_cap}", self.buf.capacity());
        unsafe {
            let old = self.buf.ptr();
            ptr::copy_nonoverlapping(old, block.as_ptr(), index);
            ptr::copy_nonoverlapping(old.add(index), block.as_ptr().add(index + filled), len - index);
            self.buf.adopt(block, new_cap);
        }
        self.len = len + filled;
        Ok(filled)
    }

    fn splice_append<E, F>(&mut self, count: usize, fill_fn: F) -> Result<usize, E> where
        F: FnOnce(&mut Fill<'_, T, A>) -> Result<(), E>
    {
        let len = self.len;
        let dst = unsafe { self.buf.ptr().add(len) };
        let mut fill = scopeguard::guard(Fill::new(self.buf.allocator(), dst, count), |mut fill| unsafe { fill.unwind() });
        fill_fn(&mut *fill)?;
        let filled = ScopeGuard::into_inner(fill).filled();
        self.len = len + filled;
        Ok(filled)
    }

    fn splice_shift<E, F>(&mut self, index: usize, count: usize, fill_fn: F) -> Result<usize, E> where
        F: FnOnce(&mut Fill<'_, T, A>) -> Result<(), E>
    {
        let len = self.len;
        let tail = len - index;
        let base = self.buf.ptr();
        unsafe { ptr::copy(base.add(index), base.add(index + count), tail) };
        // Until the gap is closed, only the prefix is live
        self.len = index;

        let len_slot = &mut self.len;
        let mut fill = scopeguard::guard(Fill::new(self.buf.allocator(), unsafe { base.add(index) }, count), move |fill| {
            let filled = fill.filled();
            if filled != count {
                unsafe { ptr::copy(base.add(index + count), base.add(index + filled), tail) };
            }
            *len_slot = index + filled + tail;
        });
        let res = fill_fn(&mut *fill);
        let filled = fill.filled();
        drop(fill);
        res.map(|()| filled)
    }
}

impl<T, A: Allocator, R: ReserveStrategy> ops::Deref for DynArray<T, A, R> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator, R: ReserveStrategy> ops::DerefMut for DynArray<T, A, R> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Clone, A: Allocator, R: ReserveStrategy> Clone for DynArray<T, A, R> {
    fn clone(&self) -> Self {
        self.clone_in(self.buf.allocator().select_on_copy())
    }

    /// Overwrites the contents of `self` with a clone of the contents of `source`.
    ///
    /// When the allocator propagates on copy-assignment, `self` takes over a clone of the allocator of `source`,
    /// releasing its own buffer first if the two allocators are not equal.
    /// The existing elements are reused through [`Clone::clone_from`] when the contents fit in the current buffer.
    fn clone_from(&mut self, source: &Self) {
        if self.buf.allocator().propagation().on_copy_assign {
            if !self.buf.allocator().is_equal(source.buf.allocator()) {
                self.clear();
                unsafe { self.buf.release() };
            }
            self.buf.set_allocator(source.buf.allocator().clone());
        }
        self.assign_slice(source.as_slice());
    }
}

impl<T: Hash, A: Allocator, R: ReserveStrategy> Hash for DynArray<T, A, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Hash::hash(&**self, state)
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator, R: ReserveStrategy> Index<I> for DynArray<T, A, R> {
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        Index::index(&**self, index)
    }
}

impl<T, I: SliceIndex<[T]>, A: Allocator, R: ReserveStrategy> IndexMut<I> for DynArray<T, A, R> {
    fn index_mut(&mut self, index: I) -> &mut Self::Output {
        IndexMut::index_mut(&mut **self, index)
    }
}

/// Collects an iterator into a DynArray, commonly called via [`Iterator::collect()`].
impl<T, A: Allocator + Default, R: ReserveStrategy> FromIterator<T> for DynArray<T, A, R> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iter_in(iter, A::default())
    }
}

impl<T, A: Allocator, R: ReserveStrategy> IntoIterator for DynArray<T, A, R> {
    type Item = T;
    type IntoIter = IntoIter<T, A, R>;

    /// Creates a consuming iterator, that is, one that moves each value out of the array (from start to end).
    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'a, T, A: Allocator, R: ReserveStrategy> IntoIterator for &'a DynArray<T, A, R> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator, R: ReserveStrategy> IntoIterator for &'a mut DynArray<T, A, R> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, A: Allocator, R: ReserveStrategy> Extend<T> for DynArray<T, A, R> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        if let Err(err) = self.buf.grow_amortized(self.len, iter.size_hint().0) {
            handle_error(err)
        }
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<'a, T: Copy + 'a, A: Allocator, R: ReserveStrategy> Extend<&'a T> for DynArray<T, A, R> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied())
    }
}

impl_slice_partial_eq_generic!([A0: Allocator, A1: Allocator, R0: ReserveStrategy, R1: ReserveStrategy] DynArray<T, A0, R0>, DynArray<U, A1, R1>);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] DynArray<T, A, R>, &[U]);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] DynArray<T, A, R>, &mut [U]);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] &[T], DynArray<U, A, R>);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] &mut [T], DynArray<U, A, R>);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] DynArray<T, A, R>, [U]);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy] [T], DynArray<U, A, R>);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy, const N: usize] DynArray<T, A, R>, [U; N]);
impl_slice_partial_eq_generic!([A: Allocator, R: ReserveStrategy, const N: usize] [T; N], DynArray<U, A, R>);

impl<T, A0, A1, R0, R1> PartialOrd<DynArray<T, A1, R1>> for DynArray<T, A0, R0> where
    T: PartialOrd,
    A0: Allocator,
    A1: Allocator,
    R0: ReserveStrategy,
    R1: ReserveStrategy
{
    #[inline]
    fn partial_cmp(&self, other: &DynArray<T, A1, R1>) -> Option<Ordering> {
        compare::partial_lexicographic(self.as_slice(), other.as_slice())
    }
}

impl<T: Eq, A: Allocator, R: ReserveStrategy> Eq for DynArray<T, A, R> {}

impl<T: Ord, A: Allocator, R: ReserveStrategy> Ord for DynArray<T, A, R> {
    fn cmp(&self, other: &Self) -> Ordering {
        lexicographic(self.as_slice(), other.as_slice(), &ThreeWay)
    }
}

impl<T, A: Allocator, R: ReserveStrategy> Drop for DynArray<T, A, R> {
    fn drop(&mut self) {
        self.clear();
        // RawArray handles deallocation
    }
}

impl<T, A: Allocator + Default, R: ReserveStrategy> Default for DynArray<T, A, R> {
    /// Creates an empty `DynArray`.
    ///
    /// The dynamic array will not allocate until elements are pushed onto it.
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: fmt::Debug, A: Allocator, R: ReserveStrategy> fmt::Debug for DynArray<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T, A: Allocator, R: ReserveStrategy> AsRef<[T]> for DynArray<T, A, R> {
    fn as_ref(&self) -> &[T] {
        self
    }
}

impl<T, A: Allocator, R: ReserveStrategy> AsMut<[T]> for DynArray<T, A, R> {
    fn as_mut(&mut self) -> &mut [T] {
        self
    }
}

impl<T: Clone, A: Allocator + Default, R: ReserveStrategy> From<&[T]> for DynArray<T, A, R> {
    /// Allocate a `DynArray<T>` and fill it by cloning `s`'s items.
    fn from(s: &[T]) -> Self {
        Self::from_slice_in(s, A::default())
    }
}

impl<T, A: Allocator + Default, R: ReserveStrategy, const N: usize> From<[T; N]> for DynArray<T, A, R> {
    /// Allocate a `DynArray<T>` and move `arr`'s items into it.
    fn from(arr: [T; N]) -> Self {
        Self::from_iter_in(arr, A::default())
    }
}

/// Creates a [`DynArray`] containing the arguments.
///
/// - `dynarray![]` creates an empty array.
/// - `dynarray![a, b, c]` creates an array containing the given elements.
/// - `dynarray![x; n]` creates an array holding `n` clones of `x`.
#[macro_export]
macro_rules! dynarray {
    () => {
        <$crate::collections::DynArray<_>>::new()
    };
    ($elem:expr; $n:expr) => {
        <$crate::collections::DynArray<_>>::from_elem($n, &$elem)
    };
    ($($x:expr),+ $(,)?) => {
        <$crate::collections::DynArray<_>>::from([$($x),+])
    };
}

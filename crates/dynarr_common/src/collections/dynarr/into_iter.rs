use core::{
    fmt,
    iter::FusedIterator,
    mem::ManuallyDrop,
    ptr, slice,
};

use crate::{
    alloc::Allocator,
    collections::{imp::raw_array::RawArray, ReserveStrategy},
};

use super::DynArray;

/// An iterator that moves out of a dynamic array.
///
/// This `struct` is created by the `into_iter` method on [`DynArray`] (provided by the [`IntoIterator`] trait).
///
/// # Example
///
/// ```
/// use dynarr_common::dynarray;
///
/// let arr = dynarray![0, 1, 2];
/// let iter = arr.into_iter();
/// assert_eq!(iter.as_slice(), &[0, 1, 2]);
/// ```
pub struct IntoIter<T, A: Allocator, R: ReserveStrategy> {
    buf:   RawArray<T, A, R>,
    /// Index of the next element to be yielded from the front
    start: usize,
    /// One past the index of the next element to be yielded from the back
    end:   usize,
}

impl<T, A: Allocator, R: ReserveStrategy> IntoIter<T, A, R> {
    pub(super) fn new(arr: DynArray<T, A, R>) -> Self {
        let arr = ManuallyDrop::new(arr);
        // SAFETY: `arr` is never dropped, so the buffer moves into the iterator exactly once
        let buf = unsafe { ptr::read(&arr.buf) };
        Self { buf, start: 0, end: arr.len }
    }

    /// Returns the remaining items of this iterator as a slice.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynarr_common::dynarray;
    ///
    /// let arr = dynarray!['a', 'b', 'c'];
    /// let mut into_iter = arr.into_iter();
    /// assert_eq!(into_iter.as_slice(), &['a', 'b', 'c']);
    /// let _ = into_iter.next().unwrap();
    /// assert_eq!(into_iter.as_slice(), &['b', 'c']);
    /// ```
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.buf.ptr().add(self.start), self.end - self.start) }
    }

    /// Returns the remaining items of this iterator as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.buf.ptr().add(self.start), self.end - self.start) }
    }

    /// Get the allocator of the buffer that is being iterated over.
    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }
}

impl<T: fmt::Debug, A: Allocator, R: ReserveStrategy> fmt::Debug for IntoIter<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

impl<T, A: Allocator, R: ReserveStrategy> AsRef<[T]> for IntoIter<T, A, R> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator, R: ReserveStrategy> Iterator for IntoIter<T, A, R> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        let idx = self.start;
        self.start += 1;
        Some(unsafe { self.buf.extract(self.buf.ptr().add(idx)) })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end - self.start;
        (len, Some(len))
    }

    #[inline]
    fn count(self) -> usize {
        self.len()
    }
}

impl<T, A: Allocator, R: ReserveStrategy> DoubleEndedIterator for IntoIter<T, A, R> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        self.end -= 1;
        Some(unsafe { self.buf.extract(self.buf.ptr().add(self.end)) })
    }
}

impl<T, A: Allocator, R: ReserveStrategy> ExactSizeIterator for IntoIter<T, A, R> {}

impl<T, A: Allocator, R: ReserveStrategy> FusedIterator for IntoIter<T, A, R> {}

impl<T: Clone, A: Allocator, R: ReserveStrategy> Clone for IntoIter<T, A, R> {
    fn clone(&self) -> Self {
        DynArray::<T, A, R>::from_slice_in(self.as_slice(), self.buf.allocator().select_on_copy()).into_iter()
    }
}

impl<T, A: Allocator, R: ReserveStrategy> Drop for IntoIter<T, A, R> {
    fn drop(&mut self) {
        let remaining = self.end - self.start;
        let start = self.start;
        self.start = self.end;
        // RawArray handles deallocation
        unsafe { self.buf.destroy_range(self.buf.ptr().add(start), remaining) };
    }
}

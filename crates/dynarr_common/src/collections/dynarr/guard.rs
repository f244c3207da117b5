use core::{
    alloc::Layout,
    mem::{size_of, ManuallyDrop},
    ptr::{self, NonNull},
};

use crate::{alloc::Allocator, collections::ArrayError};

/// Writes new elements into consecutive uninitialized slots, counting how many are live.
///
/// A `Fill` never cleans up after itself, the owner decides what happens to the filled slots when the operation is abandoned.
pub(super) struct Fill<'a, T, A: Allocator> {
    alloc:  &'a A,
    dst:    *mut T,
    filled: usize,
    limit:  usize,
}

impl<'a, T, A: Allocator> Fill<'a, T, A> {
    pub(super) fn new(alloc: &'a A, dst: *mut T, limit: usize) -> Self {
        Self { alloc, dst, filled: 0, limit }
    }

    /// Number of elements constructed so far.
    #[inline]
    pub(super) fn filled(&self) -> usize {
        self.filled
    }

    /// Number of slots that are still uninitialized.
    #[inline]
    pub(super) fn remaining(&self) -> usize {
        self.limit - self.filled
    }

    /// Construct `value` in the next slot.
    ///
    /// # Panics
    ///
    /// Panics if all slots are already filled.
    #[inline]
    pub(super) fn push(&mut self, value: T) {
        assert!(self.filled < self.limit, "more elements were produced than were reserved");
        // SAFETY: the slot lies within the reserved range and is still uninitialized
        unsafe { self.alloc.construct(NonNull::new_unchecked(self.dst.add(self.filled)), value) };
        self.filled += 1;
    }

    /// Destroy every element constructed so far.
    ///
    /// # Safety
    ///
    /// - The filled elements may not have been moved out of their slots.
    pub(super) unsafe fn unwind(&mut self) {
        let filled = self.filled;
        self.filled = 0;
        for i in 0..filled {
            self.alloc.destroy(NonNull::new_unchecked(self.dst.add(i)));
        }
    }
}

//--------------------------------------------------------------

/// A single value held in its own one-element block of an allocator.
///
/// The block is raw storage: the value is written and read with plain moves, the allocator only provides the memory.
/// The element's lifecycle through the allocator starts when the array constructs it in its final slot.
///
/// Used to produce a new element *before* any element of the array is moved,
/// so that a failing constructor leaves the array untouched and the value can safely be derived from an element that is about to shift.
pub(super) struct StagedValue<T, A: Allocator> {
    alloc: A,
    slot:  NonNull<T>,
    live:  bool,
}

impl<T, A: Allocator> StagedValue<T, A> {
    /// Allocate the staging block and construct the value produced by `f` in it.
    ///
    /// If `f` fails or panics, the block is released and nothing else happens.
    pub(super) fn try_new<E, F>(alloc: A, f: F) -> Result<Self, E> where
        E: From<ArrayError>,
        F: FnOnce() -> Result<T, E>
    {
        let slot = if size_of::<T>() == 0 {
            NonNull::dangling()
        } else {
            let layout = Layout::new::<T>();
            alloc.allocate(layout).map_err(|_| ArrayError::Allocation { layout })?.cast()
        };

        let mut staged = Self { alloc, slot, live: false };
        let value = f()?;
        // SAFETY: the slot was just allocated for a `T` and is uninitialized
        unsafe { staged.slot.as_ptr().write(value) };
        staged.live = true;
        Ok(staged)
    }

    #[inline]
    pub(super) fn get(&self) -> &T {
        debug_assert!(self.live);
        // SAFETY: the value stays live until it is taken or dropped
        unsafe { self.slot.as_ref() }
    }

    /// Move the value out, releasing the staging block.
    pub(super) fn take(self) -> T {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: the value is live, and `this` is never dropped, so it is read exactly once
        let value = unsafe { this.slot.as_ptr().read() };
        this.live = false;
        unsafe { this.release() };
        // SAFETY: the allocator is not used again
        unsafe { ptr::drop_in_place(&mut this.alloc) };
        value
    }

    unsafe fn release(&self) {
        if size_of::<T>() != 0 {
            self.alloc.deallocate(self.slot.cast(), Layout::new::<T>());
        }
    }
}

impl<T, A: Allocator> Drop for StagedValue<T, A> {
    fn drop(&mut self) {
        unsafe {
            let _release = scopeguard::guard((), |_| self.release());
            if self.live {
                ptr::drop_in_place(self.slot.as_ptr());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Global;

    #[test]
    fn staged_value_is_taken() {
        let staged = StagedValue::try_new(Global, || Ok::<_, ArrayError>(String::from("staged"))).unwrap();
        assert_eq!(staged.get(), "staged");
        assert_eq!(staged.take(), "staged");
    }

    #[test]
    fn staged_value_failure_passes_error_through() {
        #[derive(Debug, PartialEq)]
        enum Error {
            Array(ArrayError),
            Construct,
        }
        impl From<ArrayError> for Error {
            fn from(err: ArrayError) -> Self {
                Error::Array(err)
            }
        }

        let staged = StagedValue::<String, _>::try_new(Global, || Err(Error::Construct));
        assert_eq!(staged.err(), Some(Error::Construct));
    }

    #[test]
    fn fill_counts_constructed() {
        let mut slots = [0u32; 4];
        let mut fill = Fill::new(&Global, slots.as_mut_ptr(), 3);
        fill.push(1);
        fill.push(2);
        assert_eq!(fill.filled(), 2);
        assert_eq!(fill.remaining(), 1);
        assert_eq!(slots[..2], [1, 2]);
    }
}

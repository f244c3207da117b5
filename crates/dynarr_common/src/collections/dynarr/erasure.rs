use core::ptr::{self, NonNull};

use crate::{alloc::Allocator, collections::ReserveStrategy};

use super::DynArray;

/// Remove every element that compares equal to `value`, returning the number of removed elements.
///
/// The relative order of the remaining elements is preserved.
pub fn erase<T, U, A, R>(arr: &mut DynArray<T, A, R>, value: &U) -> usize where
    T: PartialEq<U>,
    U: ?Sized,
    A: Allocator,
    R: ReserveStrategy
{
    erase_if(arr, |elem| elem == value)
}

/// Remove every element for which `pred` returns `true`, returning the number of removed elements.
///
/// The relative order of the remaining elements is preserved, and every element is visited exactly once.
///
/// If `pred` or the destructor of a removed element panics, the elements that were not processed yet are kept,
/// and the array is left in a consistent state.
pub fn erase_if<T, A, R, F>(arr: &mut DynArray<T, A, R>, mut pred: F) -> usize where
    A: Allocator,
    R: ReserveStrategy,
    F: FnMut(&T) -> bool
{
    let original_len = arr.len();
    // Avoid double drop if `pred` panics, the guard restores the length
    unsafe { arr.set_len(0) };

    struct BackshiftOnDrop<'a, T, A: Allocator, R: ReserveStrategy> {
        arr:          &'a mut DynArray<T, A, R>,
        processed:    usize,
        deleted:      usize,
        original_len: usize,
    }

    impl<T, A: Allocator, R: ReserveStrategy> Drop for BackshiftOnDrop<'_, T, A, R> {
        fn drop(&mut self) {
            unsafe {
                if self.deleted > 0 {
                    // Shift the unprocessed tail back over the holes
                    let base = self.arr.as_mut_ptr();
                    ptr::copy(base.add(self.processed), base.add(self.processed - self.deleted), self.original_len - self.processed);
                }
                self.arr.set_len(self.original_len - self.deleted);
            }
        }
    }

    let mut g = BackshiftOnDrop { arr, processed: 0, deleted: 0, original_len };

    while g.processed != original_len {
        let cur = unsafe { g.arr.as_mut_ptr().add(g.processed) };
        if pred(unsafe { &*cur }) {
            // Count the element as gone before destroying it, so a panicking destructor can not cause a double drop
            g.processed += 1;
            g.deleted += 1;
            unsafe { g.arr.buf.allocator().destroy(NonNull::new_unchecked(cur)) };
        } else {
            if g.deleted > 0 {
                unsafe { ptr::copy_nonoverlapping(cur, cur.sub(g.deleted), 1) };
            }
            g.processed += 1;
        }
    }

    let deleted = g.deleted;
    drop(g);
    deleted
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        panic::{catch_unwind, AssertUnwindSafe},
        rc::Rc,
    };

    use super::*;
    use crate::dynarray;

    #[test]
    fn erase_removes_all_matches() {
        let mut arr = dynarray![1, 2, 1, 3, 1];
        assert_eq!(erase(&mut arr, &1), 3);
        assert_eq!(arr, [2, 3]);
        assert_eq!(erase(&mut arr, &7), 0);
        assert_eq!(arr, [2, 3]);
    }

    #[test]
    fn erase_if_keeps_order() {
        let mut arr: DynArray<i32> = (0..10).collect();
        assert_eq!(erase_if(&mut arr, |x| x % 3 == 0), 4);
        assert_eq!(arr, [1, 2, 4, 5, 7, 8]);
    }

    #[test]
    fn erase_if_on_empty() {
        let mut arr = DynArray::<u8>::new();
        assert_eq!(erase_if(&mut arr, |_| true), 0);
        assert!(arr.is_empty());
    }

    #[test]
    fn erase_if_panicking_predicate() {
        let tracker = Rc::new(());
        let mut arr = DynArray::from_elem(6, &tracker);
        let calls = Cell::new(0);

        let res = catch_unwind(AssertUnwindSafe(|| {
            erase_if(&mut arr, |_| {
                calls.set(calls.get() + 1);
                if calls.get() == 4 {
                    panic!("predicate failed");
                }
                calls.get() % 2 == 1
            })
        }));
        assert!(res.is_err());
        // Elements 0 and 2 were erased, the rest is kept
        assert_eq!(arr.len(), 4);
        assert_eq!(Rc::strong_count(&tracker), 5);
    }
}

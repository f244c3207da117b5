use core::{
    alloc::Layout,
    mem::size_of,
    ptr::{self, NonNull},
};

mod global;

pub use global::*;

/// Error returned by an [`Allocator`] that could not satisfy a request.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
#[error("memory allocation failed")]
pub struct AllocError;

/// Whether an allocator travels along with the container's buffer when the container is copied, moved or swapped.
///
/// When a flag is `false`, the destination keeps its own allocator, and elements have to be relocated between buffers if the two allocators are not equal.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Propagation {
    /// Copy-assignment replaces the destination's allocator with the source's.
    pub on_copy_assign: bool,
    /// Move-assignment replaces the destination's allocator with the source's.
    pub on_move_assign: bool,
    /// Swapping two containers also swaps their allocators.
    pub on_swap: bool,
}

impl Propagation {
    /// The allocator never follows the buffer.
    pub const NONE: Propagation = Propagation { on_copy_assign: false, on_move_assign: false, on_swap: false };
    /// The allocator always follows the buffer.
    pub const ALL: Propagation = Propagation { on_copy_assign: true, on_move_assign: true, on_swap: true };
}

/// Allocation capability consumed by the containers in this crate.
///
/// A container owns an allocator value and routes every block request, element construction and element destruction through it.
///
/// # Safety
///
/// - A pointer returned by `allocate` must point to a block that is valid for reads and writes of `layout.size()` bytes, aligned to `layout.align()`,
///   and stay valid until it is passed to `deallocate` on this allocator, or any allocator that is [`equal`](Allocator::is_equal) to it.
/// - `is_equal` must be an equivalence relation, and equal allocators must be able to deallocate each other's blocks.
/// - `construct` must leave `slot` initialized with `value`, and `destroy` must drop the value in `slot` exactly once.
pub unsafe trait Allocator: Clone {
    /// Allocate an uninitialized block of memory fitting `layout`.
    ///
    /// Containers never call this with a zero-sized layout.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Deallocate a block previously returned by [`Allocator::allocate`].
    ///
    /// # Safety
    ///
    /// - `ptr` must have been allocated by this allocator (or one equal to it) with the same `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Construct `value` in the uninitialized `slot`.
    ///
    /// # Safety
    ///
    /// - `slot` must be valid for writes and properly aligned.
    #[inline]
    unsafe fn construct<T>(&self, slot: NonNull<T>, value: T) {
        slot.as_ptr().write(value)
    }

    /// Destroy the value in `slot`, leaving the slot uninitialized.
    ///
    /// # Safety
    ///
    /// - `slot` must contain a live value, which must not be used afterwards.
    #[inline]
    unsafe fn destroy<T>(&self, slot: NonNull<T>) {
        ptr::drop_in_place(slot.as_ptr())
    }

    /// Move the value out of `slot`, leaving the slot uninitialized.
    ///
    /// This ends the value's life inside the container like [`destroy`](Allocator::destroy) does, without dropping it.
    /// Every `construct` is matched by exactly one `destroy` or `extract`.
    ///
    /// # Safety
    ///
    /// - `slot` must contain a live value, which must not be used through `slot` afterwards.
    #[inline]
    unsafe fn extract<T>(&self, slot: NonNull<T>) -> T {
        slot.as_ptr().read()
    }

    /// Largest number of `T`s a single block of this allocator could hold.
    fn max_size<T>(&self) -> usize {
        usize::MAX / size_of::<T>().max(1)
    }

    /// Check if memory allocated by `self` can be deallocated by `other` and vice versa.
    fn is_equal(&self, other: &Self) -> bool;

    /// Propagation behavior of this allocator.
    fn propagation(&self) -> Propagation {
        Propagation::NONE
    }

    /// Allocator to use for a copy of a container using `self`.
    fn select_on_copy(&self) -> Self {
        self.clone()
    }
}

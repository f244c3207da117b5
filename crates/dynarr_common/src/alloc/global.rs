use core::{alloc::Layout, ptr::NonNull};

use super::{AllocError, Allocator};

/// Allocator calling directly to rust's global allocator
///
/// All instances are equal, so containers using it can always steal each other's buffers.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Global;

unsafe impl Allocator for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0, "Containers should never request zero-sized blocks");
        // SAFETY: the layout has a non-zero size
        NonNull::new(unsafe { std::alloc::alloc(layout) }).ok_or(AllocError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout)
    }

    fn is_equal(&self, _other: &Self) -> bool {
        true
    }
}

pub use crate::alloc::{Allocator, Global, Propagation};
pub use crate::collections::{ArrayError, DynArray, RandomAccess, RandomAccessMut};
pub use crate::dynarray;


mod imp;

mod dynarr;

use core::alloc::Layout;

pub use dynarr::*;

//--------------------------------------------------------------

macro_rules! impl_slice_partial_eq_generic {
    ([$($vars:tt)*] $lhs:ty, $rhs:ty $(where $ty:ty: $bound:ident)?) => {
        impl<T, U, $($vars)*> PartialEq<$rhs> for $lhs  where
            T : PartialEq<U>,
            $($ty: $bound)?
        {
            #[inline]
            fn eq(&self, other: &$rhs) -> bool { self[..] == other[..] }
            #[inline]
            #[allow(clippy::partialeq_ne_impl)]
            fn ne(&self, other: &$rhs) -> bool { self[..] != other[..] }
        }
    };
}
use impl_slice_partial_eq_generic;

//--------------------------------------------------------------

/// Errors reported by the containers in this module.
///
/// Failures raised by the elements themselves (a panicking `clone`, or the error of a fallible constructor) are never converted into an `ArrayError`,
/// they reach the caller unchanged.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum ArrayError {
    /// The requested number of elements exceeds what the container can ever hold.
    #[error("length error: requested {requested} elements, but at most {max} are supported")]
    Length { requested: usize, max: usize },
    /// Checked access outside of the live elements.
    #[error("index {index} is out of range for length {len}")]
    OutOfRange { index: usize, len: usize },
    /// The allocator could not provide a block.
    #[error("failed to allocate {} bytes with an alignment of {}", layout.size(), layout.align())]
    Allocation { layout: Layout },
}

/// Central function for turning errors of the non-`try` operations into panics
#[cold]
#[track_caller]
pub(crate) fn handle_error(err: ArrayError) -> ! {
    panic!("{err}")
}

//--------------------------------------------------------------

/// A trait used to define a strategy to reserve additional memory for containers.
pub trait ReserveStrategy {
    /// Calculate the new capacity for a container.
    ///
    /// `len` is the number of live elements, `additional` the minimum number of elements that need to fit on top of them,
    /// and `max_len` the largest capacity the container supports.
    ///
    /// Returns `None` if `len + additional` can not fit within `max_len`.
    /// The returned capacity is never smaller than `len + additional` and never larger than `max_len`.
    fn calculate(len: usize, additional: usize, max_len: usize) -> Option<usize>;
}

/// A reserve strategy that grows to `len + max(len, additional)`, clamped to the maximum length.
///
/// This roughly doubles the capacity on every reallocation, which gives amortized *O*(1) appends,
/// while bulk insertions bigger than the current length get exactly the room they need.
pub struct GeometricReserveStrategy;

impl ReserveStrategy for GeometricReserveStrategy {
    fn calculate(len: usize, additional: usize, max_len: usize) -> Option<usize> {
        if max_len.checked_sub(len)? < additional {
            return None;
        }
        match len.checked_add(len.max(additional)) {
            Some(new_cap) if new_cap <= max_len => Some(new_cap),
            _ => Some(max_len),
        }
    }
}

/// A reserve strategy that only ever grows to the exact required capacity.
///
/// Useful for containers that are filled once and where slack space is wasted memory, appends are *O*(*n*) with this strategy.
pub struct ExactReserveStrategy;

impl ReserveStrategy for ExactReserveStrategy {
    fn calculate(len: usize, additional: usize, max_len: usize) -> Option<usize> {
        len.checked_add(additional).filter(|&cap| cap <= max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometric_growth() {
        assert_eq!(GeometricReserveStrategy::calculate(0, 1, usize::MAX), Some(1));
        assert_eq!(GeometricReserveStrategy::calculate(4, 1, usize::MAX), Some(8));
        assert_eq!(GeometricReserveStrategy::calculate(4, 10, usize::MAX), Some(14));
    }

    #[test]
    fn geometric_growth_clamps_to_max() {
        assert_eq!(GeometricReserveStrategy::calculate(60, 1, 100), Some(100));
        assert_eq!(GeometricReserveStrategy::calculate(usize::MAX / 2 + 1, 1, usize::MAX), Some(usize::MAX));
        assert_eq!(GeometricReserveStrategy::calculate(100, 1, 100), None);
        assert_eq!(GeometricReserveStrategy::calculate(90, 11, 100), None);
    }

    #[test]
    fn exact_growth() {
        assert_eq!(ExactReserveStrategy::calculate(4, 1, 100), Some(5));
        assert_eq!(ExactReserveStrategy::calculate(usize::MAX, 1, usize::MAX), None);
        assert_eq!(ExactReserveStrategy::calculate(90, 11, 100), None);
    }

    #[test]
    fn error_messages() {
        let err = ArrayError::OutOfRange { index: 10, len: 5 };
        assert_eq!(err.to_string(), "index 10 is out of range for length 5");

        let err = ArrayError::Allocation { layout: Layout::new::<u64>() };
        assert_eq!(err.to_string(), "failed to allocate 8 bytes with an alignment of 8");
    }
}

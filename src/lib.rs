//! Growable contiguous arrays with pluggable allocators and growth policies.
//!
//! This crate re-exports the container crate and the logging crate it reports through.
//!
//! ```
//! use dynarr::prelude::*;
//!
//! let mut arr = dynarray![1, 2, 3];
//! arr.insert(1, 10);
//! assert_eq!(arr, [1, 10, 2, 3]);
//! ```

pub use dynarr_common::{alloc, collections, dynarray};
pub use dynarr_logging as logging;

pub mod prelude {
    pub use dynarr_common::prelude::*;
}

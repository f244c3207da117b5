//! Allocator-aware containers.
//!
//! The main type is [`DynArray`](collections::DynArray), a growable contiguous array that routes all of its memory and element lifetimes through a
//! pluggable [`Allocator`](alloc::Allocator), and decides how to grow through a pluggable [`ReserveStrategy`](collections::ReserveStrategy).

#[macro_use]
extern crate scopeguard;

mod log;

pub mod alloc;
pub mod collections;
pub mod prelude;

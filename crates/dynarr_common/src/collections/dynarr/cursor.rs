//! Random-access cursors into the buffer of a [`DynArray`](super::DynArray).
//!
//! A cursor is a position inside an array's buffer that borrows the array, so no cursor can outlive a mutation of the array.
//! Cursors may be moved outside of the live elements, dereferencing them there returns `None`.
//! Comparisons and distances are only meaningful between cursors into the same buffer.

use core::{
    cmp::Ordering,
    fmt,
    ops::{Add, AddAssign, Sub, SubAssign},
    ptr,
};

/// Shared behavior of the random-access cursors.
pub trait RandomAccess {
    type Item;

    /// Position of the cursor, which may lie outside of the live elements.
    fn position(&self) -> isize;

    /// Move the cursor to `position`.
    fn set_position(&mut self, position: isize);

    /// Get the element `offset` steps away from the cursor, or `None` when that is not a live element.
    fn peek(&self, offset: isize) -> Option<&Self::Item>;

    /// Get the element under the cursor.
    #[inline]
    fn current(&self) -> Option<&Self::Item> {
        self.peek(0)
    }

    #[inline]
    fn step_forward(&mut self) {
        self.advance(1)
    }

    #[inline]
    fn step_back(&mut self) {
        self.advance(-1)
    }

    /// Move the cursor `n` steps, backwards when `n` is negative.
    #[inline]
    fn advance(&mut self, n: isize) {
        self.set_position(self.position() + n)
    }

    /// Number of steps needed to get from `self` to `other`.
    #[inline]
    fn distance_to(&self, other: &Self) -> isize where
        Self: Sized
    {
        other.position() - self.position()
    }
}

/// Cursors that give mutable access to the elements.
pub trait RandomAccessMut: RandomAccess {
    /// Get the element `offset` steps away from the cursor mutably, or `None` when that is not a live element.
    fn peek_mut(&mut self, offset: isize) -> Option<&mut Self::Item>;

    /// Get the element under the cursor mutably.
    #[inline]
    fn current_mut(&mut self) -> Option<&mut Self::Item> {
        self.peek_mut(0)
    }
}

fn slot(pos: isize, offset: isize, len: usize) -> Option<usize> {
    let idx = usize::try_from(pos.checked_add(offset)?).ok()?;
    (idx < len).then_some(idx)
}

fn boundary_index(pos: isize, len: usize) -> Option<usize> {
    usize::try_from(pos).ok().filter(|&idx| idx <= len)
}

//--------------------------------------------------------------

/// Read-only cursor into an array.
pub struct Cursor<'a, T> {
    slice: &'a [T],
    pos:   isize,
}

impl<'a, T> Cursor<'a, T> {
    pub(super) fn new(slice: &'a [T], index: usize) -> Self {
        debug_assert!(index <= slice.len());
        // Array lengths never exceed `isize::MAX`, zero-sized elements included
        Self { slice, pos: index as isize }
    }

    /// Index of the cursor, when it lies within `begin..=end`.
    ///
    /// Indices are how positions are carried across a mutation of the array.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        boundary_index(self.pos, self.slice.len())
    }

    /// Get the element under the cursor.
    #[inline]
    pub fn get(&self) -> Option<&'a T> {
        self.peek(0)
    }

    /// Get the element `offset` steps away from the cursor.
    #[inline]
    pub fn peek(&self, offset: isize) -> Option<&'a T> {
        slot(self.pos, offset, self.slice.len()).map(|idx| &self.slice[idx])
    }

    fn same_buffer(&self, other: &Self) -> bool {
        ptr::eq(self.slice, other.slice)
    }
}

impl<T> Clone for Cursor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Cursor<'_, T> {}

impl<T> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor").field("pos", &self.pos).field("len", &self.slice.len()).finish()
    }
}

impl<T> RandomAccess for Cursor<'_, T> {
    type Item = T;

    #[inline]
    fn position(&self) -> isize {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, position: isize) {
        self.pos = position;
    }

    #[inline]
    fn peek(&self, offset: isize) -> Option<&T> {
        Cursor::peek(self, offset)
    }
}

impl<T> PartialEq for Cursor<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_buffer(other) && self.pos == other.pos
    }
}

impl<T> PartialOrd for Cursor<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.same_buffer(other).then(|| self.pos.cmp(&other.pos))
    }
}

impl<T> Add<isize> for Cursor<'_, T> {
    type Output = Self;

    fn add(mut self, rhs: isize) -> Self {
        self.advance(rhs);
        self
    }
}

impl<T> Sub<isize> for Cursor<'_, T> {
    type Output = Self;

    fn sub(mut self, rhs: isize) -> Self {
        self.advance(-rhs);
        self
    }
}

impl<T> AddAssign<isize> for Cursor<'_, T> {
    fn add_assign(&mut self, rhs: isize) {
        self.advance(rhs)
    }
}

impl<T> SubAssign<isize> for Cursor<'_, T> {
    fn sub_assign(&mut self, rhs: isize) {
        self.advance(-rhs)
    }
}

/// Distance between two cursors into the same buffer.
impl<'a, T> Sub for Cursor<'a, T> {
    type Output = isize;

    fn sub(self, rhs: Self) -> isize {
        debug_assert!(self.same_buffer(&rhs), "cursors into different buffers can not be subtracted");
        self.pos - rhs.pos
    }
}

impl<'a, T> From<CursorMut<'a, T>> for Cursor<'a, T> {
    fn from(cursor: CursorMut<'a, T>) -> Self {
        let CursorMut { slice, pos } = cursor;
        Cursor { slice, pos }
    }
}

//--------------------------------------------------------------

/// Cursor into an array that allows the elements to be modified.
///
/// Only a single `CursorMut` into an array can exist at a time, it can be turned into a read-only [`Cursor`], but not the other way around.
pub struct CursorMut<'a, T> {
    slice: &'a mut [T],
    pos:   isize,
}

impl<'a, T> CursorMut<'a, T> {
    pub(super) fn new(slice: &'a mut [T], index: usize) -> Self {
        debug_assert!(index <= slice.len());
        // Array lengths never exceed `isize::MAX`, zero-sized elements included
        Self { slice, pos: index as isize }
    }

    /// Index of the cursor, when it lies within `begin..=end`.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        boundary_index(self.pos, self.slice.len())
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.peek(0)
    }

    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.peek_mut(0)
    }

    #[inline]
    pub fn peek(&self, offset: isize) -> Option<&T> {
        slot(self.pos, offset, self.slice.len()).map(|idx| &self.slice[idx])
    }

    #[inline]
    pub fn peek_mut(&mut self, offset: isize) -> Option<&mut T> {
        slot(self.pos, offset, self.slice.len()).map(|idx| &mut self.slice[idx])
    }

    /// Turn the cursor into a mutable reference to the element under it, for the whole borrow of the array.
    pub fn into_mut(self) -> Option<&'a mut T> {
        let idx = slot(self.pos, 0, self.slice.len())?;
        Some(&mut self.slice[idx])
    }

    /// Borrow the cursor as a read-only cursor at the same position.
    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor { slice: &*self.slice, pos: self.pos }
    }
}

impl<T> fmt::Debug for CursorMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorMut").field("pos", &self.pos).field("len", &self.slice.len()).finish()
    }
}

impl<T> RandomAccess for CursorMut<'_, T> {
    type Item = T;

    #[inline]
    fn position(&self) -> isize {
        self.pos
    }

    #[inline]
    fn set_position(&mut self, position: isize) {
        self.pos = position;
    }

    #[inline]
    fn peek(&self, offset: isize) -> Option<&T> {
        CursorMut::peek(self, offset)
    }
}

impl<T> RandomAccessMut for CursorMut<'_, T> {
    #[inline]
    fn peek_mut(&mut self, offset: isize) -> Option<&mut T> {
        CursorMut::peek_mut(self, offset)
    }
}

impl<T> AddAssign<isize> for CursorMut<'_, T> {
    fn add_assign(&mut self, rhs: isize) {
        self.advance(rhs)
    }
}

impl<T> SubAssign<isize> for CursorMut<'_, T> {
    fn sub_assign(&mut self, rhs: isize) {
        self.advance(-rhs)
    }
}

//--------------------------------------------------------------

/// Adapter walking a cursor from the back of the array to the front.
///
/// A reverse cursor refers to the element right before its base cursor, so a reverse cursor over `end` refers to the last element.
#[derive(Clone, Copy, Debug)]
pub struct Reverse<C> {
    base: C,
}

impl<C: RandomAccess> Reverse<C> {
    pub fn new(base: C) -> Self {
        Self { base }
    }

    /// The underlying cursor, one position after the element this cursor refers to.
    pub fn base(&self) -> &C {
        &self.base
    }

    pub fn into_base(self) -> C {
        self.base
    }
}

impl<C: RandomAccess> RandomAccess for Reverse<C> {
    type Item = C::Item;

    #[inline]
    fn position(&self) -> isize {
        -self.base.position()
    }

    #[inline]
    fn set_position(&mut self, position: isize) {
        self.base.set_position(-position)
    }

    #[inline]
    fn peek(&self, offset: isize) -> Option<&C::Item> {
        self.base.peek(-1 - offset)
    }
}

impl<C: RandomAccessMut> RandomAccessMut for Reverse<C> {
    #[inline]
    fn peek_mut(&mut self, offset: isize) -> Option<&mut C::Item> {
        self.base.peek_mut(-1 - offset)
    }
}

impl<C: PartialEq> PartialEq for Reverse<C> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}

impl<C: PartialOrd> PartialOrd for Reverse<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        other.base.partial_cmp(&self.base)
    }
}

impl<C: RandomAccess> Add<isize> for Reverse<C> {
    type Output = Self;

    fn add(mut self, rhs: isize) -> Self {
        self.advance(rhs);
        self
    }
}

impl<C: RandomAccess> Sub<isize> for Reverse<C> {
    type Output = Self;

    fn sub(mut self, rhs: isize) -> Self {
        self.advance(-rhs);
        self
    }
}

impl<C: RandomAccess> AddAssign<isize> for Reverse<C> {
    fn add_assign(&mut self, rhs: isize) {
        self.advance(rhs)
    }
}

impl<C: RandomAccess> SubAssign<isize> for Reverse<C> {
    fn sub_assign(&mut self, rhs: isize) {
        self.advance(-rhs)
    }
}

impl<'a, T> From<Reverse<CursorMut<'a, T>>> for Reverse<Cursor<'a, T>> {
    fn from(cursor: Reverse<CursorMut<'a, T>>) -> Self {
        Reverse::new(cursor.into_base().into())
    }
}

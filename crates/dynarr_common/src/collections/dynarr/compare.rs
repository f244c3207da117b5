//! Ranking strategies used to order and compare arrays element by element.

use core::cmp::Ordering;

/// A strategy ranking two elements against each other.
pub trait Ranking<T: ?Sized> {
    fn rank(&self, lhs: &T, rhs: &T) -> Ordering;
}

/// Ranks elements using their total order.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreeWay;

impl<T: Ord + ?Sized> Ranking<T> for ThreeWay {
    #[inline]
    fn rank(&self, lhs: &T, rhs: &T) -> Ordering {
        lhs.cmp(rhs)
    }
}

/// Ranks elements with a weak order built from `<` alone.
///
/// Two elements neither of which is less than the other rank as equivalent, even if they are not equal.
#[derive(Clone, Copy, Debug, Default)]
pub struct LessThan;

impl<T: PartialOrd + ?Sized> Ranking<T> for LessThan {
    #[inline]
    fn rank(&self, lhs: &T, rhs: &T) -> Ordering {
        synth_three_way(lhs, rhs, |a, b| a < b)
    }
}

/// Ranks elements with a weak order built from a strict less-than predicate.
///
/// ```
/// use core::cmp::Ordering;
/// use dynarr_common::{collections::SynthLess, dynarray};
///
/// let lhs = dynarray!["b", "a"];
/// let rhs = dynarray!["B", "c"];
/// let by_len = SynthLess(|a: &&str, b: &&str| a.len() < b.len());
/// assert_eq!(lhs.compare_by(&rhs, by_len), Ordering::Equal);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct SynthLess<F>(pub F);

impl<T: ?Sized, F: Fn(&T, &T) -> bool> Ranking<T> for SynthLess<F> {
    #[inline]
    fn rank(&self, lhs: &T, rhs: &T) -> Ordering {
        synth_three_way(lhs, rhs, &self.0)
    }
}

/// Build a three-way result out of a strict less-than predicate.
pub fn synth_three_way<T: ?Sized, F: Fn(&T, &T) -> bool>(lhs: &T, rhs: &T, less: F) -> Ordering {
    if less(lhs, rhs) {
        Ordering::Less
    } else if less(rhs, lhs) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Lexicographically compare two slices using `ranking`.
///
/// The first pair of elements that does not rank as equivalent decides the result, if there is none, the shorter slice orders first.
pub fn lexicographic<T, K: Ranking<T> + ?Sized>(lhs: &[T], rhs: &[T], ranking: &K) -> Ordering {
    for (a, b) in lhs.iter().zip(rhs) {
        match ranking.rank(a, b) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    lhs.len().cmp(&rhs.len())
}

/// Check if two slices have the same length, and each pair of elements ranks as equivalent under `ranking`.
pub fn equivalent<T, K: Ranking<T> + ?Sized>(lhs: &[T], rhs: &[T], ranking: &K) -> bool {
    lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(a, b)| ranking.rank(a, b) == Ordering::Equal)
}

/// Lexicographic comparison for partially ordered elements, unordered as soon as a deciding pair is unordered.
pub(super) fn partial_lexicographic<T: PartialOrd>(lhs: &[T], rhs: &[T]) -> Option<Ordering> {
    for (a, b) in lhs.iter().zip(rhs) {
        match a.partial_cmp(b) {
            Some(Ordering::Equal) => continue,
            ord => return ord,
        }
    }
    Some(lhs.len().cmp(&rhs.len()))
}

//! Evaluation backends for persistent sequences.
//!
//! A backend is the storage and evaluation strategy underlying one
//! collection value. Four strategies share the [`Backend`] contract and are
//! observably interchangeable; they differ in when work happens and what is
//! retained:
//!
//! - [`Eager`]: a fully realized in-memory buffer. Every derived operation
//!   runs immediately.
//! - [`Lazy`]: a factory re-invoked on every full traversal. Nothing is
//!   retained between traversals.
//! - [`Buffered`]: a one-shot source behind a [`BufferingCursor`]. Each
//!   source element is produced at most once and replayed from the cache.
//! - [`Snap`]: a decorator that queues transformations over another backend
//!   and collapses to an [`Eager`] value on first real use.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::backend::{Backend, Buffered, Eager, Lazy, Snap};
//!
//! fn pipeline<B: Backend<i32>>(backend: &B) -> Vec<i32> {
//!     backend
//!         .map(|value| value * 2)
//!         .filter(|value| *value > 2)
//!         .to_vec()
//!         .unwrap()
//! }
//!
//! let eager = Eager::from(vec![1, 2, 3]);
//! let lazy = Lazy::new(|| vec![1, 2, 3]);
//! let buffered = Buffered::from_source(vec![1, 2, 3]);
//! let snap = Snap::wrap(lazy.clone());
//!
//! assert_eq!(pipeline(&eager), vec![4, 6]);
//! assert_eq!(pipeline(&lazy), vec![4, 6]);
//! assert_eq!(pipeline(&buffered), vec![4, 6]);
//! assert_eq!(pipeline(&snap), vec![4, 6]);
//! ```

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::rc::Rc;

use crate::error::{CollectionError, Result};
use crate::validate::Validator;

mod buffered;
mod cursor;
mod eager;
mod lazy;
mod snap;
mod traversal;

pub use buffered::Buffered;
pub use cursor::{BufferingCursor, CursorReader};
pub use eager::{Eager, EagerIntoIterator};
pub use lazy::Lazy;
pub use snap::Snap;
pub use traversal::{ReleaseGuard, Traversal};

// =============================================================================
// Hasher Selection
// =============================================================================

/// Hasher used by `distinct` and `group_by`.
///
/// `fxhash` selects `rustc_hash::FxBuildHasher`, `ahash` selects
/// `ahash::RandomState`; otherwise the standard `RandomState` is used.
#[cfg(feature = "fxhash")]
pub(crate) type ElementHasher = rustc_hash::FxBuildHasher;

#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
pub(crate) type ElementHasher = ahash::RandomState;

#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
pub(crate) type ElementHasher = std::collections::hash_map::RandomState;

pub(crate) type ElementMap<K, V> = HashMap<K, V, ElementHasher>;

pub(crate) type ElementSet<K> = HashSet<K, ElementHasher>;

// =============================================================================
// Element
// =============================================================================

/// Values that can live inside a backend.
///
/// Lazy backends store closures and replay cached elements, so elements must
/// be cloneable and own their data.
pub trait Element: Clone + 'static {}

impl<T: Clone + 'static> Element for T {}

// =============================================================================
// Backend
// =============================================================================

/// The shared contract of every evaluation strategy.
///
/// Derived operations (`map`, `filter`, `slice`, ...) never mutate the
/// receiver; they return a new backend of the same family. Whether any work
/// happens at that point depends on the strategy: [`Eager`] computes
/// immediately, the others postpone all element-level work until a
/// materializing operation (`size`, `get`, `to_vec`, `reduce`, iteration,
/// ...) pulls elements.
///
/// Materializing operations return [`Result`] because a failure raised while
/// building a lazy chain surfaces only when the failing element is pulled.
pub trait Backend<T: Element>: Clone + Sized + 'static {
    /// The same strategy holding elements of another type.
    type Rebind<U: Element>: Backend<U>;

    /// An empty backend of this family.
    fn empty() -> Self;

    /// Starts one pull-driven pass over the elements.
    fn iterate(&self) -> Traversal<T>;

    /// Realizes every element into an [`Eager`] backend.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised while pulling elements.
    fn memoize(&self) -> Result<Eager<T>>;

    /// Applies `function` to every element.
    fn map<U, F>(&self, function: F) -> Self::Rebind<U>
    where
        U: Element,
        F: Fn(T) -> U + 'static;

    /// Applies a fallible `function` to every element.
    ///
    /// # Errors
    ///
    /// [`Eager`] applies `function` immediately and returns its first
    /// failure. The lazy strategies return `Ok` and raise the failure when
    /// the failing element is pulled.
    fn try_map<U, F>(&self, function: F) -> Result<Self::Rebind<U>>
    where
        U: Element,
        F: Fn(T) -> Result<U> + 'static;

    /// Keeps the elements for which `predicate` holds.
    #[must_use]
    fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + 'static;

    /// Runs `inspection` on every element, failing on the first rejected
    /// element.
    ///
    /// # Errors
    ///
    /// Like [`Backend::try_map`]: immediate on [`Eager`], deferred to the
    /// pull of the rejected element on the lazy strategies.
    fn check<F>(&self, inspection: F) -> Result<Self>
    where
        F: Fn(&T) -> Result<()> + 'static;

    /// Concatenates `other` after `self`.
    #[must_use]
    fn append(&self, other: &Self) -> Self;

    /// Elements in `[start, end)`, clamped to the sequence bounds.
    #[must_use]
    fn slice(&self, start: usize, end: usize) -> Self;

    /// Stable sort by `comparator`.
    #[must_use]
    fn sort_by<C>(&self, comparator: C) -> Self
    where
        C: Fn(&T, &T) -> Ordering + 'static;

    /// Elements in reverse order.
    #[must_use]
    fn reverse(&self) -> Self;

    /// Drops repeated elements, keeping first occurrences in order.
    #[must_use]
    fn distinct(&self) -> Self
    where
        T: Eq + Hash;

    /// Groups elements by `key`, in order of each key's first occurrence.
    ///
    /// # Errors
    ///
    /// Grouping needs at least one element. [`Eager`] fails immediately with
    /// [`CollectionError::EmptyStructure`]; the lazy strategies return `Ok`
    /// and raise the failure when the grouping is driven to completion.
    fn group_by<K, F>(&self, key: F) -> Result<Self::Rebind<(K, Eager<T>)>>
    where
        K: Element + Eq + Hash,
        F: Fn(&T) -> K + 'static;

    // =========================================================================
    // Provided Operations
    // =========================================================================

    /// Number of elements.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised while pulling elements.
    fn size(&self) -> Result<usize> {
        self.iterate()
            .try_fold(0_usize, |count, item| item.map(|_| count + 1))
    }

    /// The element at `index`.
    ///
    /// Pulls at most `index + 1` elements.
    ///
    /// # Errors
    ///
    /// [`CollectionError::IndexOutOfRange`] when `index` is not below the
    /// size, or the first failure raised while pulling.
    fn get(&self, index: usize) -> Result<T> {
        let mut seen = 0;
        for item in self.iterate() {
            let value = item?;
            if seen == index {
                return Ok(value);
            }
            seen += 1;
        }
        Err(CollectionError::IndexOutOfRange { index, size: seen })
    }

    /// An empty backend of this family.
    #[must_use]
    fn clear(&self) -> Self {
        Self::empty()
    }

    /// Sorts by the natural order of the elements.
    #[must_use]
    fn sort(&self) -> Self
    where
        T: Ord,
    {
        self.sort_by(T::cmp)
    }

    /// Splits into the elements matching `predicate` and the rest.
    fn partition<P>(&self, predicate: P) -> (Self, Self)
    where
        P: Fn(&T) -> bool + 'static,
    {
        let predicate = Rc::new(predicate);
        let rejecting = Rc::clone(&predicate);
        (
            self.filter(move |value| predicate(value)),
            self.filter(move |value| !rejecting(value)),
        )
    }

    /// Left fold starting from `initial`.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised while pulling elements.
    fn reduce<A, F>(&self, initial: A, mut function: F) -> Result<A>
    where
        F: FnMut(A, T) -> A,
    {
        self.iterate()
            .try_fold(initial, |accumulator, item| {
                item.map(|value| function(accumulator, value))
            })
    }

    /// Left fold seeded with the first element.
    ///
    /// # Errors
    ///
    /// [`CollectionError::EmptyStructure`] on an empty sequence.
    fn reduce1<F>(&self, mut function: F) -> Result<T>
    where
        F: FnMut(T, T) -> T,
    {
        let mut traversal = self.iterate();
        let first = traversal
            .next()
            .ok_or(CollectionError::empty("reduce1"))??;
        traversal.try_fold(first, |accumulator, item| {
            item.map(|value| function(accumulator, value))
        })
    }

    /// Collects every element into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised while pulling elements.
    fn to_vec(&self) -> Result<Vec<T>> {
        self.iterate().collect_values()
    }

    /// Returns `true` if there are no elements. Pulls at most one element.
    ///
    /// # Errors
    ///
    /// Returns a failure raised while pulling the first element.
    fn is_empty(&self) -> Result<bool> {
        self.iterate().next().transpose().map(|first| first.is_none())
    }

    /// The first element, if any. Pulls at most one element.
    ///
    /// # Errors
    ///
    /// Returns a failure raised while pulling the first element.
    fn first(&self) -> Result<Option<T>> {
        self.iterate().next().transpose()
    }

    /// Returns `true` if some element equals `needle`.
    ///
    /// Stops pulling at the first match; the traversal's release guard fires
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised before a match.
    fn contains(&self, needle: &T) -> Result<bool>
    where
        T: PartialEq,
    {
        self.find(|value| value == needle).map(|found| found.is_some())
    }

    /// The first element matching `predicate`.
    ///
    /// Stops pulling at the first match; the traversal's release guard fires
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised before a match.
    fn find<P>(&self, predicate: P) -> Result<Option<T>>
    where
        P: Fn(&T) -> bool,
    {
        let mut traversal = self.iterate();
        while let Some(item) = traversal.next() {
            let value = item?;
            if predicate(&value) {
                traversal.release();
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// The index of the first element equal to `needle`.
    ///
    /// # Errors
    ///
    /// [`CollectionError::ElementNotFound`] carrying the `Debug` rendering of
    /// `needle` when it is absent.
    fn position_of(&self, needle: &T) -> Result<usize>
    where
        T: PartialEq + std::fmt::Debug,
    {
        let mut traversal = self.iterate();
        let mut index = 0;
        while let Some(item) = traversal.next() {
            if item? == *needle {
                traversal.release();
                return Ok(index);
            }
            index += 1;
        }
        Err(CollectionError::not_found(needle))
    }

    /// Element-wise equality, in order.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised while pulling either side.
    fn equals(&self, other: &Self) -> Result<bool>
    where
        T: PartialEq,
    {
        let mut left = self.iterate();
        let mut right = other.iterate();
        loop {
            match (left.next().transpose()?, right.next().transpose()?) {
                (None, None) => return Ok(true),
                (Some(left_value), Some(right_value)) if left_value == right_value => {}
                _ => return Ok(false),
            }
        }
    }

    /// Runs `validator` on every element.
    ///
    /// # Errors
    ///
    /// A rejection surfaces as [`CollectionError::TypeMismatch`], with the
    /// same timing as [`Backend::check`].
    fn validated<V>(&self, validator: V, position: impl Into<String>) -> Result<Self>
    where
        V: Validator<T> + 'static,
    {
        let position = position.into();
        self.check(move |value| {
            validator
                .validate(value, &position)
                .map_err(CollectionError::from)
        })
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Clamps `[start, end)` to `[0, length]`.
pub(crate) fn clamp_range(start: usize, end: usize, length: usize) -> (usize, usize) {
    let start = start.min(length);
    let end = end.clamp(start, length);
    (start, end)
}

/// A per-traversal predicate that admits each element once.
pub(crate) fn first_occurrence<T>() -> impl FnMut(&T) -> bool
where
    T: Element + Eq + Hash,
{
    let mut seen: ElementSet<T> = ElementSet::default();
    move |value| seen.insert(value.clone())
}

// =============================================================================
// Thread Safety
// =============================================================================

// Backends share state through `Rc` and `RefCell`; they are single-threaded.
static_assertions::assert_not_impl_any!(Eager<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(Lazy<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(Buffered<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(Snap<i32>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 3, 5, (0, 3))]
    #[case(2, 10, 5, (2, 5))]
    #[case(7, 9, 5, (5, 5))]
    #[case(4, 1, 5, (4, 4))]
    fn test_clamp_range(
        #[case] start: usize,
        #[case] end: usize,
        #[case] length: usize,
        #[case] expected: (usize, usize),
    ) {
        assert_eq!(clamp_range(start, end, length), expected);
    }

    #[rstest]
    fn test_first_occurrence_admits_once() {
        let mut admit = first_occurrence::<i32>();
        assert!(admit(&1));
        assert!(admit(&2));
        assert!(!admit(&1));
    }
}

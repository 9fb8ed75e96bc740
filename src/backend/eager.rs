//! Fully realized in-memory backend.
//!
//! [`Eager`] is the terminal representation every other backend collapses
//! to. It holds its elements in a shared `Rc<[T]>` buffer, so clones are
//! cheap and derived operations allocate only the result buffer.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::backend::{Backend, Eager};
//!
//! let eager: Eager<i32> = (1..=5).collect();
//! let evens = eager.filter(|value| value % 2 == 0);
//!
//! assert_eq!(evens.as_slice(), &[2, 4]);
//! assert_eq!(eager.len(), 5); // Original unchanged
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::rc::Rc;

use super::{Backend, Element, ElementMap, Traversal, clamp_range, first_occurrence};
use crate::error::{CollectionError, Result};

// =============================================================================
// Eager Definition
// =============================================================================

/// A finite, ordered, fully realized sequence.
///
/// # Time Complexity
///
/// | Operation        | Complexity |
/// |------------------|------------|
/// | `len`            | O(1)       |
/// | `get`            | O(1)       |
/// | `clone`          | O(1)       |
/// | derived ops      | O(N)       |
/// | `sort_by`        | O(N log N) |
pub struct Eager<T> {
    elements: Rc<[T]>,
}

impl<T> Eager<T> {
    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the buffer holds no elements.
    ///
    /// Unlike [`Backend::is_empty`], this cannot fail.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Borrows the element at `index`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lazuli::backend::Eager;
    ///
    /// let eager = Eager::from(vec!["a", "b"]);
    /// assert_eq!(eager.get_ref(1), Some(&"b"));
    /// assert_eq!(eager.get_ref(2), None);
    /// ```
    #[inline]
    pub fn get_ref(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    /// Borrows the elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    /// Iterates over borrowed elements.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    /// Returns `true` if both values share the same buffer.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.elements, &other.elements)
    }
}

impl<T: Clone> Eager<T> {
    /// A one-element sequence.
    pub fn singleton(element: T) -> Self {
        Self::from(vec![element])
    }

    /// Copies the elements into a new vector.
    pub fn to_owned_vec(&self) -> Vec<T> {
        self.elements.to_vec()
    }

    fn retain_where<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        self.elements
            .iter()
            .filter(|value| predicate(value))
            .cloned()
            .collect()
    }
}

// =============================================================================
// Backend Implementation
// =============================================================================

impl<T: Element> Backend<T> for Eager<T> {
    type Rebind<U: Element> = Eager<U>;

    fn empty() -> Self {
        Self::default()
    }

    fn iterate(&self) -> Traversal<T> {
        Traversal::from_values(self.clone())
    }

    fn memoize(&self) -> Result<Self> {
        Ok(self.clone())
    }

    fn size(&self) -> Result<usize> {
        Ok(self.len())
    }

    fn get(&self, index: usize) -> Result<T> {
        self.get_ref(index)
            .cloned()
            .ok_or(CollectionError::IndexOutOfRange {
                index,
                size: self.len(),
            })
    }

    fn map<U, F>(&self, function: F) -> Eager<U>
    where
        U: Element,
        F: Fn(T) -> U + 'static,
    {
        self.elements.iter().cloned().map(function).collect()
    }

    fn try_map<U, F>(&self, function: F) -> Result<Eager<U>>
    where
        U: Element,
        F: Fn(T) -> Result<U> + 'static,
    {
        self.elements.iter().cloned().map(function).collect()
    }

    fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + 'static,
    {
        self.retain_where(predicate)
    }

    fn check<F>(&self, inspection: F) -> Result<Self>
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        for value in self.elements.iter() {
            inspection(value)?;
        }
        Ok(self.clone())
    }

    fn append(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        self.elements
            .iter()
            .chain(other.elements.iter())
            .cloned()
            .collect()
    }

    fn slice(&self, start: usize, end: usize) -> Self {
        let (start, end) = clamp_range(start, end, self.len());
        Self::from(&self.elements[start..end])
    }

    fn sort_by<C>(&self, comparator: C) -> Self
    where
        C: Fn(&T, &T) -> Ordering + 'static,
    {
        let mut elements = self.to_owned_vec();
        elements.sort_by(comparator);
        Self::from(elements)
    }

    fn reverse(&self) -> Self {
        self.elements.iter().rev().cloned().collect()
    }

    fn distinct(&self) -> Self
    where
        T: Eq + Hash,
    {
        self.retain_where(first_occurrence())
    }

    fn group_by<K, F>(&self, key: F) -> Result<Eager<(K, Self)>>
    where
        K: Element + Eq + Hash,
        F: Fn(&T) -> K + 'static,
    {
        if self.is_empty() {
            return Err(CollectionError::empty("group_by"));
        }
        let mut positions: ElementMap<K, usize> = ElementMap::default();
        let mut groups: Vec<(K, Vec<T>)> = Vec::new();
        for value in self.elements.iter() {
            let group_key = key(value);
            match positions.get(&group_key) {
                Some(&position) => groups[position].1.push(value.clone()),
                None => {
                    positions.insert(group_key.clone(), groups.len());
                    groups.push((group_key, vec![value.clone()]));
                }
            }
        }
        Ok(groups
            .into_iter()
            .map(|(group_key, members)| (group_key, Self::from(members)))
            .collect())
    }

    fn equals(&self, other: &Self) -> Result<bool>
    where
        T: PartialEq,
    {
        Ok(self == other)
    }
}

// =============================================================================
// Iterators
// =============================================================================

/// An owning iterator over an [`Eager`] value.
///
/// Elements are cloned out of the shared buffer.
pub struct EagerIntoIterator<T> {
    elements: Rc<[T]>,
    front: usize,
    back: usize,
}

impl<T: Clone> Iterator for EagerIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.front >= self.back {
            return None;
        }
        let value = self.elements[self.front].clone();
        self.front += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T: Clone> DoubleEndedIterator for EagerIntoIterator<T> {
    fn next_back(&mut self) -> Option<T> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.elements[self.back].clone())
    }
}

impl<T: Clone> ExactSizeIterator for EagerIntoIterator<T> {}

impl<T: Clone> std::iter::FusedIterator for EagerIntoIterator<T> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Clone for Eager<T> {
    fn clone(&self) -> Self {
        Self {
            elements: Rc::clone(&self.elements),
        }
    }
}

impl<T> Default for Eager<T> {
    fn default() -> Self {
        Self {
            elements: Rc::from(Vec::new()),
        }
    }
}

impl<T> From<Vec<T>> for Eager<T> {
    fn from(elements: Vec<T>) -> Self {
        Self {
            elements: Rc::from(elements),
        }
    }
}

impl<T: Clone> From<&[T]> for Eager<T> {
    fn from(elements: &[T]) -> Self {
        Self {
            elements: Rc::from(elements),
        }
    }
}

impl<T> FromIterator<T> for Eager<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iterator: I) -> Self {
        Self {
            elements: iterator.into_iter().collect(),
        }
    }
}

impl<T: Clone> IntoIterator for Eager<T> {
    type Item = T;
    type IntoIter = EagerIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        let back = self.elements.len();
        EagerIntoIterator {
            elements: self.elements,
            front: 0,
            back,
        }
    }
}

impl<'a, T> IntoIterator for &'a Eager<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for Eager<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.elements[..] == other.elements[..]
    }
}

impl<T: Eq> Eq for Eager<T> {}

impl<T: Hash> Hash for Eager<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.elements.len().hash(state);
        for element in self.elements.iter() {
            element.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Eager<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.elements.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for Eager<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        for (index, element) in self.elements.iter().enumerate() {
            if index > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

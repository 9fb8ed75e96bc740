//! Single-pass-buffered backend.
//!
//! [`Buffered`] puts a one-shot source behind a [`BufferingCursor`]. Every
//! backend derived from it reads through the same cursor, so each element of
//! the source is produced at most once no matter how many derived backends
//! read it or how often they are traversed.
//!
//! Derived operations that only need a prefix or a filtered stream (`map`,
//! `filter`, `slice`, `distinct`, `append`, ...) get a new cursor whose
//! source reads the parent cursor element by element. Operations that need
//! the whole sequence (`sort_by`, `reverse`, `group_by`) get a new one-shot
//! source that drains the parent cursor on its first pull.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::backend::{Backend, Buffered};
//!
//! let buffered = Buffered::from_source(vec!['a', 'b', 'c']);
//! let upper = buffered.map(|letter| letter.to_ascii_uppercase());
//! let all = buffered.filter(|_| true);
//!
//! assert_eq!(upper.get(0), Ok('A'));
//! assert_eq!(all.get(0), Ok('a'));
//! assert_eq!(buffered.cursor().high_water_mark(), 1);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use super::{
    Backend, BufferingCursor, CursorReader, Eager, Element, Traversal, clamp_range,
    first_occurrence,
};
use crate::error::{CollectionError, Result};

/// A one-shot source replayed from a shared cache.
pub struct Buffered<T> {
    cursor: Rc<BufferingCursor<T>>,
}

impl<T: Element> Buffered<T> {
    /// Buffers an infallible one-shot source.
    ///
    /// The source is not pulled until a materializing operation runs.
    pub fn from_source<I>(source: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Self::from_cursor(Rc::new(BufferingCursor::from_values(source)))
    }

    /// Buffers a fallible one-shot source.
    ///
    /// A failure is raised to every reader that reaches it.
    pub fn from_fallible_source<I>(source: I) -> Self
    where
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
    {
        Self::from_cursor(Rc::new(BufferingCursor::new(source)))
    }

    /// Wraps an existing cursor.
    pub const fn from_cursor(cursor: Rc<BufferingCursor<T>>) -> Self {
        Self { cursor }
    }

    /// The cursor this backend reads through.
    #[inline]
    pub const fn cursor(&self) -> &Rc<BufferingCursor<T>> {
        &self.cursor
    }

    fn reader(&self) -> CursorReader<T> {
        self.cursor.reader()
    }

    /// A new backend whose one-shot source streams the parent through
    /// `step`. Building the stream does not pull.
    fn derive<U, S>(&self, step: S) -> Buffered<U>
    where
        U: Element,
        S: FnOnce(Traversal<T>) -> Traversal<U>,
    {
        Buffered::from_fallible_source(step(Traversal::new(self.reader())))
    }

    /// A new backend whose one-shot source drains the parent on its first
    /// pull and transforms the whole buffer.
    fn derive_whole<U, W>(&self, whole: W) -> Buffered<U>
    where
        U: Element,
        W: FnOnce(Eager<T>) -> Result<Eager<U>> + 'static,
    {
        let cursor = Rc::clone(&self.cursor);
        Buffered::from_fallible_source(Traversal::suspended(move || {
            Traversal::from_realized(cursor.snapshot().map(Eager::from).and_then(whole))
        }))
    }
}

impl<T: Element> Backend<T> for Buffered<T> {
    type Rebind<U: Element> = Buffered<U>;

    fn empty() -> Self {
        Self::from_source(std::iter::empty())
    }

    fn iterate(&self) -> Traversal<T> {
        Traversal::new(self.reader())
    }

    fn memoize(&self) -> Result<Eager<T>> {
        self.cursor.snapshot().map(Eager::from)
    }

    fn size(&self) -> Result<usize> {
        self.cursor.drain()
    }

    fn get(&self, index: usize) -> Result<T> {
        self.cursor
            .pull(index)?
            .ok_or_else(|| CollectionError::IndexOutOfRange {
                index,
                size: self.cursor.high_water_mark(),
            })
    }

    fn map<U, F>(&self, function: F) -> Buffered<U>
    where
        U: Element,
        F: Fn(T) -> U + 'static,
    {
        self.derive(|traversal| traversal.map_values(function))
    }

    fn try_map<U, F>(&self, function: F) -> Result<Buffered<U>>
    where
        U: Element,
        F: Fn(T) -> Result<U> + 'static,
    {
        Ok(self.derive(|traversal| traversal.try_map_values(function)))
    }

    fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + 'static,
    {
        self.derive(|traversal| traversal.filter_values(predicate))
    }

    fn check<F>(&self, inspection: F) -> Result<Self>
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        Ok(self.derive(|traversal| {
            traversal.try_map_values(move |value| inspection(&value).map(|()| value))
        }))
    }

    fn append(&self, other: &Self) -> Self {
        let other = other.reader();
        self.derive(|traversal| Traversal::new(traversal.chain(other)))
    }

    fn slice(&self, start: usize, end: usize) -> Self {
        let (start, end) = clamp_range(start, end, usize::MAX);
        self.derive(|traversal| Traversal::new(traversal.skip(start).take(end - start)))
    }

    fn sort_by<C>(&self, comparator: C) -> Self
    where
        C: Fn(&T, &T) -> Ordering + 'static,
    {
        self.derive_whole(move |eager| Ok(eager.sort_by(comparator)))
    }

    fn reverse(&self) -> Self {
        self.derive_whole(|eager| Ok(eager.reverse()))
    }

    fn distinct(&self) -> Self
    where
        T: Eq + Hash,
    {
        let mut admit = first_occurrence();
        self.derive(|traversal| {
            Traversal::new(traversal.filter(move |item| item.as_ref().map_or(true, &mut admit)))
        })
    }

    fn group_by<K, F>(&self, key: F) -> Result<Buffered<(K, Eager<T>)>>
    where
        K: Element + Eq + Hash,
        F: Fn(&T) -> K + 'static,
    {
        Ok(self.derive_whole(move |eager| eager.group_by(key)))
    }
}

impl<T> Clone for Buffered<T> {
    fn clone(&self) -> Self {
        Self {
            cursor: Rc::clone(&self.cursor),
        }
    }
}

impl<T> fmt::Debug for Buffered<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Buffered")
            .field("cursor", &self.cursor)
            .finish()
    }
}

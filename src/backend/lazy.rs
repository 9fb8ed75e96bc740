//! Regenerating backend.
//!
//! [`Lazy`] holds a zero-argument factory that produces a fresh traversal
//! each time it is invoked. Derived operations never call the factory: they
//! wrap it in a new factory that threads elements through the requested
//! transformation one at a time.
//!
//! Every materializing call (`size`, `get`, `to_vec`, `equals`, ...) invokes
//! the composed factory once and drains it. Traversing the same value twice
//! therefore reruns the whole chain twice; in exchange nothing materialized
//! is retained between calls. Use [`Buffered`](super::Buffered) or
//! [`Snap`](super::Snap) when replaying from a cache is preferable.
//!
//! # Chain depth
//!
//! Each derived operation nests one adapter around the previous factory,
//! and building, pulling and dropping a chain all recurse through that
//! nesting. Chains of a few thousand operations are fine; chains of around a
//! hundred thousand exhaust a default thread stack. For very long chains,
//! [`memoize`](Backend::memoize) part-way or build on
//! [`Snap`](super::Snap), whose type-preserving steps do not nest.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::backend::{Backend, Lazy};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let traversals = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&traversals);
//! let lazy = Lazy::new(move || {
//!     counter.set(counter.get() + 1);
//!     vec![1, 2, 3]
//! });
//!
//! let derived = lazy.map(|value| value * 2).filter(|value| *value > 2);
//! assert_eq!(traversals.get(), 0);
//!
//! assert_eq!(derived.to_vec(), Ok(vec![4, 6]));
//! assert_eq!(traversals.get(), 1);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use super::{Backend, Eager, Element, Traversal, clamp_range, first_occurrence};
use crate::error::Result;
use crate::trace::trace_event;

type Factory<T> = Rc<dyn Fn() -> Traversal<T>>;

/// A sequence recomputed from its factory on every traversal.
pub struct Lazy<T> {
    factory: Factory<T>,
}

impl<T: Element> Lazy<T> {
    /// Creates a lazy sequence from a factory of fresh iterables.
    ///
    /// The factory is not called until a materializing operation runs.
    pub fn new<F, I>(factory: F) -> Self
    where
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Self::from_traversals(move || Traversal::from_values(factory()))
    }

    /// Creates a lazy sequence whose factory registers a cleanup action.
    ///
    /// `cleanup` runs exactly once per traversal, after the traversal ends
    /// for any reason: drained, stopped early by `contains`/`find`/`get`,
    /// failed, or dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lazuli::backend::{Backend, Lazy};
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    ///
    /// let closed = Rc::new(Cell::new(0));
    /// let counter = Rc::clone(&closed);
    /// let lazy = Lazy::with_cleanup(
    ///     || 1..=1_000,
    ///     move || counter.set(counter.get() + 1),
    /// );
    ///
    /// assert_eq!(lazy.contains(&3), Ok(true));
    /// assert_eq!(closed.get(), 1);
    /// ```
    pub fn with_cleanup<F, I, C>(factory: F, cleanup: C) -> Self
    where
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
        C: Fn() + 'static,
    {
        let cleanup = Rc::new(cleanup);
        Self::from_traversals(move || {
            let cleanup = Rc::clone(&cleanup);
            Traversal::from_values(factory()).with_release(move || cleanup())
        })
    }

    /// Creates a lazy sequence from a factory of fallible traversals.
    pub fn from_traversals<F>(factory: F) -> Self
    where
        F: Fn() -> Traversal<T> + 'static,
    {
        Self {
            factory: Rc::new(factory),
        }
    }

    /// A new lazy sequence whose traversals pass through `step`.
    fn derive<U, S>(&self, step: S) -> Lazy<U>
    where
        U: Element,
        S: Fn(Traversal<T>) -> Traversal<U> + 'static,
    {
        let factory = Rc::clone(&self.factory);
        Lazy::from_traversals(move || step(factory()))
    }

    /// A new lazy sequence that realizes each traversal and transforms the
    /// whole buffer. Used by operations that need every element at once.
    fn derive_whole<U, W>(&self, whole: W) -> Lazy<U>
    where
        U: Element,
        W: Fn(Eager<T>) -> Result<Eager<U>> + 'static,
    {
        let whole = Rc::new(whole);
        self.derive(move |traversal| {
            let whole = Rc::clone(&whole);
            Traversal::suspended(move || {
                Traversal::from_realized(traversal.collect_values().map(Eager::from).and_then(
                    |eager| whole(eager),
                ))
            })
        })
    }
}

impl<T: Element> Backend<T> for Lazy<T> {
    type Rebind<U: Element> = Lazy<U>;

    fn empty() -> Self {
        Self::from_traversals(Traversal::empty)
    }

    fn iterate(&self) -> Traversal<T> {
        trace_event!("lazy factory invoked");
        (self.factory)()
    }

    fn memoize(&self) -> Result<Eager<T>> {
        self.to_vec().map(Eager::from)
    }

    fn map<U, F>(&self, function: F) -> Lazy<U>
    where
        U: Element,
        F: Fn(T) -> U + 'static,
    {
        let function = Rc::new(function);
        self.derive(move |traversal| {
            let function = Rc::clone(&function);
            traversal.map_values(move |value| function(value))
        })
    }

    fn try_map<U, F>(&self, function: F) -> Result<Lazy<U>>
    where
        U: Element,
        F: Fn(T) -> Result<U> + 'static,
    {
        let function = Rc::new(function);
        Ok(self.derive(move |traversal| {
            let function = Rc::clone(&function);
            traversal.try_map_values(move |value| function(value))
        }))
    }

    fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + 'static,
    {
        let predicate = Rc::new(predicate);
        self.derive(move |traversal| {
            let predicate = Rc::clone(&predicate);
            traversal.filter_values(move |value| predicate(value))
        })
    }

    fn check<F>(&self, inspection: F) -> Result<Self>
    where
        F: Fn(&T) -> Result<()> + 'static,
    {
        let inspection = Rc::new(inspection);
        Ok(self.derive(move |traversal| {
            let inspection = Rc::clone(&inspection);
            traversal.try_map_values(move |value| inspection(&value).map(|()| value))
        }))
    }

    fn append(&self, other: &Self) -> Self {
        let other = Rc::clone(&other.factory);
        self.derive(move |traversal| {
            let other = Rc::clone(&other);
            Traversal::new(traversal.chain(Traversal::suspended(move || other())))
        })
    }

    fn slice(&self, start: usize, end: usize) -> Self {
        let (start, end) = clamp_range(start, end, usize::MAX);
        self.derive(move |traversal| Traversal::new(traversal.skip(start).take(end - start)))
    }

    fn sort_by<C>(&self, comparator: C) -> Self
    where
        C: Fn(&T, &T) -> Ordering + 'static,
    {
        let comparator = Rc::new(comparator);
        self.derive_whole(move |eager| {
            let comparator = Rc::clone(&comparator);
            Ok(eager.sort_by(move |left, right| comparator(left, right)))
        })
    }

    fn reverse(&self) -> Self {
        self.derive_whole(|eager| Ok(eager.reverse()))
    }

    fn distinct(&self) -> Self
    where
        T: Eq + Hash,
    {
        self.derive(|traversal| {
            let mut admit = first_occurrence();
            Traversal::new(traversal.filter(move |item| item.as_ref().map_or(true, &mut admit)))
        })
    }

    fn group_by<K, F>(&self, key: F) -> Result<Lazy<(K, Eager<T>)>>
    where
        K: Element + Eq + Hash,
        F: Fn(&T) -> K + 'static,
    {
        let key = Rc::new(key);
        Ok(self.derive_whole(move |eager| {
            let key = Rc::clone(&key);
            eager.group_by(move |value| key(value))
        }))
    }
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Rc::clone(&self.factory),
        }
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Lazy").field(&"<factory>").finish()
    }
}

//! Pull-driven traversal of a backend.
//!
//! A [`Traversal`] is one pass over a backend's elements. It is an ordinary
//! [`Iterator`] whose items are `Result<T>`, so a failure raised by a
//! transformation surfaces exactly where the failing element is pulled.
//!
//! A traversal may own a [`ReleaseGuard`]: a cleanup action that fires
//! exactly once, when the traversal is dropped or released explicitly. The
//! regenerating backend uses it so that a factory can free whatever it
//! acquired even when a consumer stops reading early.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::backend::Traversal;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let released = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&released);
//! let mut traversal = Traversal::from_values(vec![1, 2, 3])
//!     .with_release(move || counter.set(counter.get() + 1));
//!
//! assert_eq!(traversal.next(), Some(Ok(1)));
//! drop(traversal);
//! assert_eq!(released.get(), 1);
//! ```

use std::fmt;

use super::{Eager, Element};
use crate::error::Result;
use crate::trace::trace_event;

/// Boxed pull iterator used inside every lazy backend.
pub(crate) type Pull<T> = Box<dyn Iterator<Item = Result<T>>>;

// =============================================================================
// ReleaseGuard
// =============================================================================

/// A cleanup action that runs at most once.
///
/// The action fires on the first call to [`ReleaseGuard::release`] or when
/// the guard is dropped, whichever comes first.
pub struct ReleaseGuard {
    action: Option<Box<dyn FnOnce()>>,
}

impl ReleaseGuard {
    /// Creates a guard around `action`.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// Runs the action now if it has not run yet.
    pub fn release(&mut self) {
        if let Some(action) = self.action.take() {
            trace_event!("release guard fired");
            action();
        }
    }

    /// Returns `true` once the action has run.
    #[inline]
    pub const fn is_released(&self) -> bool {
        self.action.is_none()
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ReleaseGuard {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReleaseGuard")
            .field("released", &self.is_released())
            .finish()
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// One pull-driven pass over a sequence.
///
/// Items are `Result<T>`; a traversal stops after yielding its first error.
pub struct Traversal<T> {
    inner: Pull<T>,
    guard: Option<ReleaseGuard>,
    failed: bool,
}

impl<T: 'static> Traversal<T> {
    /// Wraps a fallible iterator.
    pub fn new<I>(iterator: I) -> Self
    where
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
    {
        Self {
            inner: Box::new(iterator.into_iter()),
            guard: None,
            failed: false,
        }
    }

    /// Wraps an infallible iterator.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Self::new(values.into_iter().map(Ok))
    }

    /// A traversal that yields nothing.
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// A traversal that yields a single failure.
    pub fn failure(error: crate::error::CollectionError) -> Self {
        Self::new(std::iter::once(Err(error)))
    }

    /// A traversal whose iterator is built on the first pull.
    ///
    /// Whole-sequence operations (sorting, reversing, grouping) use this to
    /// postpone draining their input until someone actually reads.
    pub fn suspended<F, I>(build: F) -> Self
    where
        F: FnOnce() -> I + 'static,
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
    {
        let mut build = Some(build);
        let mut started: Option<I::IntoIter> = None;
        Self::new(std::iter::from_fn(move || {
            if started.is_none() {
                let build = build.take()?;
                started = Some(build().into_iter());
            }
            started.as_mut().and_then(Iterator::next)
        }))
    }

    /// Attaches a cleanup action that fires once when this traversal ends.
    #[must_use]
    pub fn with_release<F>(mut self, action: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        self.guard = Some(ReleaseGuard::new(action));
        self
    }

    /// Fires the attached cleanup action now, if any.
    pub fn release(&mut self) {
        if let Some(guard) = self.guard.as_mut() {
            guard.release();
        }
    }

    /// Threads every element through `function`.
    pub(crate) fn map_values<U, F>(self, function: F) -> Traversal<U>
    where
        U: 'static,
        F: Fn(T) -> U + 'static,
    {
        Traversal::new(self.map(move |item| item.map(&function)))
    }

    /// Threads every element through a fallible `function`.
    pub(crate) fn try_map_values<U, F>(self, function: F) -> Traversal<U>
    where
        U: 'static,
        F: Fn(T) -> Result<U> + 'static,
    {
        Traversal::new(self.map(move |item| item.and_then(&function)))
    }

    /// Keeps elements matching `predicate`; failures always pass through.
    pub(crate) fn filter_values<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + 'static,
    {
        Self::new(self.filter(move |item| item.as_ref().map_or(true, &predicate)))
    }

    /// Drains the traversal into a vector, stopping at the first failure.
    pub fn collect_values(self) -> Result<Vec<T>> {
        self.collect()
    }
}

impl<T: Element> Traversal<T> {
    /// Replays a realized sequence, or yields its failure.
    pub(crate) fn from_realized(realized: Result<Eager<T>>) -> Self {
        match realized {
            Ok(eager) => Self::from_values(eager),
            Err(error) => Self::failure(error),
        }
    }
}

impl<T> Iterator for Traversal<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.inner.next()?;
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            self.inner.size_hint()
        }
    }
}

impl<T> fmt::Debug for Traversal<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Traversal")
            .field("guard", &self.guard)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

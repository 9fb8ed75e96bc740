//! A caching cursor over a one-shot source.
//!
//! [`BufferingCursor`] turns a source that can be consumed only once into a
//! sequence that any number of independent readers can replay. Elements are
//! pulled on demand, never ahead of the furthest request, and each element
//! is pulled from the source exactly once.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::backend::BufferingCursor;
//!
//! let cursor = BufferingCursor::from_values(vec!['a', 'b', 'c']);
//! assert_eq!(cursor.high_water_mark(), 0);
//!
//! assert_eq!(cursor.advance_to(1), Ok(true));
//! assert_eq!(cursor.read(0), Ok('a'));
//! assert_eq!(cursor.high_water_mark(), 1);
//!
//! // A second read of the same index does not touch the source.
//! assert_eq!(cursor.read(0), Ok('a'));
//! assert_eq!(cursor.high_water_mark(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::traversal::Pull;
use crate::error::{CollectionError, Result};
use crate::trace::trace_event;

// =============================================================================
// Cursor State
// =============================================================================

/// Where the underlying source stands.
enum SourceState<T> {
    /// The source may still yield elements.
    Open(Pull<T>),
    /// The source ended normally.
    Exhausted,
    /// The source raised a failure; it is replayed to every reader.
    Failed(CollectionError),
}

struct CursorState<T> {
    source: SourceState<T>,
    cache: Vec<T>,
}

// =============================================================================
// BufferingCursor
// =============================================================================

/// A one-shot source plus an append-only cache of pulled elements.
///
/// # Invariants
///
/// - `cache[i]` never changes once written.
/// - The source is advanced by exactly one step to produce
///   `cache[high_water_mark]`.
/// - Only one advance runs at a time. A re-entrant advance (a source that
///   reads its own cursor) fails with [`CollectionError::CursorBusy`].
///
/// The cursor is single-threaded and is never reset.
pub struct BufferingCursor<T> {
    state: RefCell<CursorState<T>>,
}

impl<T: 'static> BufferingCursor<T> {
    /// Wraps a fallible one-shot source.
    pub fn new<I>(source: I) -> Self
    where
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
    {
        Self::from_pull(Box::new(source.into_iter()))
    }

    /// Wraps an infallible one-shot source.
    pub fn from_values<I>(source: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Self::new(source.into_iter().map(Ok))
    }

    pub(crate) fn from_pull(source: Pull<T>) -> Self {
        Self {
            state: RefCell::new(CursorState {
                source: SourceState::Open(source),
                cache: Vec::new(),
            }),
        }
    }
}

impl<T: Clone> BufferingCursor<T> {
    /// Pulls from the source until the cache holds at least `target`
    /// elements or the source ends.
    ///
    /// Returns whether `target` was reached. Never pulls an element that is
    /// already cached.
    ///
    /// # Errors
    ///
    /// - The failure the source raised, if it raised one before `target`.
    /// - [`CollectionError::CursorBusy`] when called while another advance
    ///   on this cursor is still running.
    pub fn advance_to(&self, target: usize) -> Result<bool> {
        let mut state = self
            .state
            .try_borrow_mut()
            .map_err(|_| CollectionError::CursorBusy)?;
        while state.cache.len() < target {
            let pulled = match &mut state.source {
                SourceState::Open(source) => source.next(),
                SourceState::Exhausted => return Ok(false),
                SourceState::Failed(error) => return Err(error.clone()),
            };
            match pulled {
                Some(Ok(value)) => {
                    trace_event!(index = state.cache.len(), "cursor pulled element");
                    state.cache.push(value);
                }
                Some(Err(error)) => {
                    trace_event!(index = state.cache.len(), "cursor source failed");
                    state.source = SourceState::Failed(error.clone());
                    return Err(error);
                }
                None => {
                    trace_event!(size = state.cache.len(), "cursor source exhausted");
                    state.source = SourceState::Exhausted;
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Returns the cached element at `index`.
    ///
    /// Does not pull; call [`advance_to`](Self::advance_to)`(index + 1)`
    /// first.
    ///
    /// # Errors
    ///
    /// [`CollectionError::NoSuchElement`] when `index` is not cached, and
    /// [`CollectionError::CursorBusy`] during an advance.
    pub fn read(&self, index: usize) -> Result<T> {
        let state = self
            .state
            .try_borrow()
            .map_err(|_| CollectionError::CursorBusy)?;
        state
            .cache
            .get(index)
            .cloned()
            .ok_or(CollectionError::NoSuchElement { index })
    }

    /// Advances to `index + 1` and reads `index`.
    ///
    /// Returns `Ok(None)` when the source ends before `index`. No source can
    /// hold `usize::MAX + 1` elements, so `usize::MAX` drains it and reports
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// As [`advance_to`](Self::advance_to).
    pub fn pull(&self, index: usize) -> Result<Option<T>> {
        let Some(needed) = index.checked_add(1) else {
            self.drain()?;
            return Ok(None);
        };
        if self.advance_to(needed)? {
            self.read(index).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Pulls the source to the end and returns the number of elements.
    ///
    /// # Errors
    ///
    /// As [`advance_to`](Self::advance_to).
    pub fn drain(&self) -> Result<usize> {
        self.advance_to(usize::MAX)?;
        Ok(self.high_water_mark())
    }

    /// Copies the cache after draining the source.
    ///
    /// # Errors
    ///
    /// As [`advance_to`](Self::advance_to).
    pub fn snapshot(&self) -> Result<Vec<T>> {
        self.drain()?;
        let state = self
            .state
            .try_borrow()
            .map_err(|_| CollectionError::CursorBusy)?;
        Ok(state.cache.clone())
    }
}

impl<T> BufferingCursor<T> {
    /// Number of elements pulled from the source so far.
    ///
    /// Returns `0` while an advance is in progress on the same cursor.
    pub fn high_water_mark(&self) -> usize {
        self.state
            .try_borrow()
            .map_or(0, |state| state.cache.len())
    }

    /// Returns `true` once the source has ended, normally or by failure.
    pub fn is_exhausted(&self) -> bool {
        self.state
            .try_borrow()
            .is_ok_and(|state| !matches!(state.source, SourceState::Open(_)))
    }

    /// An independent reader starting at index 0.
    pub fn reader(self: &Rc<Self>) -> CursorReader<T> {
        CursorReader {
            cursor: Rc::clone(self),
            position: 0,
            finished: false,
        }
    }
}

impl<T> fmt::Debug for BufferingCursor<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("BufferingCursor")
            .field("high_water_mark", &self.high_water_mark())
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

// =============================================================================
// CursorReader
// =============================================================================

/// An independent read position over a shared [`BufferingCursor`].
///
/// Readers share the cache; advancing one reader past the high-water mark
/// pulls from the source, and every other reader then replays the cached
/// element.
pub struct CursorReader<T> {
    cursor: Rc<BufferingCursor<T>>,
    position: usize,
    finished: bool,
}

impl<T> CursorReader<T> {
    /// The index the next call to `next` will read.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }
}

impl<T: Clone> Iterator for CursorReader<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.cursor.pull(self.position) {
            Ok(Some(value)) => {
                self.position += 1;
                Some(Ok(value))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

impl<T: Clone> std::iter::FusedIterator for CursorReader<T> {}

impl<T> fmt::Debug for CursorReader<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CursorReader")
            .field("position", &self.position)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;

    fn counting_cursor(values: Vec<i32>) -> (Rc<BufferingCursor<i32>>, Rc<Cell<usize>>) {
        let pulls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&pulls);
        let cursor = BufferingCursor::from_values(values.into_iter().inspect(move |_| {
            counter.set(counter.get() + 1);
        }));
        (Rc::new(cursor), pulls)
    }

    #[rstest]
    fn test_advance_never_pulls_ahead() {
        let (cursor, pulls) = counting_cursor(vec![1, 2, 3, 4]);
        assert_eq!(cursor.advance_to(2), Ok(true));
        assert_eq!(pulls.get(), 2);
        assert_eq!(cursor.advance_to(1), Ok(true));
        assert_eq!(pulls.get(), 2);
    }

    #[rstest]
    fn test_pull_at_max_index_drains() {
        let (cursor, pulls) = counting_cursor(vec![1, 2, 3]);
        assert_eq!(cursor.pull(usize::MAX), Ok(None));
        assert_eq!(pulls.get(), 3);
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.pull(2), Ok(Some(3)));
    }

    #[rstest]
    fn test_advance_reports_exhaustion() {
        let (cursor, _) = counting_cursor(vec![1, 2]);
        assert_eq!(cursor.advance_to(5), Ok(false));
        assert_eq!(cursor.high_water_mark(), 2);
        assert!(cursor.is_exhausted());
    }

    #[rstest]
    fn test_read_past_high_water_mark() {
        let (cursor, _) = counting_cursor(vec![1]);
        assert_eq!(
            cursor.read(0),
            Err(CollectionError::NoSuchElement { index: 0 })
        );
    }

    #[rstest]
    fn test_readers_share_cache() {
        let (cursor, pulls) = counting_cursor(vec![10, 20, 30]);
        let first: Vec<i32> = cursor.reader().map(Result::unwrap).collect();
        let second: Vec<i32> = cursor.reader().map(Result::unwrap).collect();
        assert_eq!(first, vec![10, 20, 30]);
        assert_eq!(second, first);
        assert_eq!(pulls.get(), 3);
    }

    #[rstest]
    fn test_failure_is_replayed() {
        let cursor = Rc::new(BufferingCursor::new(vec![
            Ok(1),
            Err(CollectionError::empty("source")),
        ]));
        let first: Vec<_> = cursor.reader().collect();
        let second: Vec<_> = cursor.reader().collect();
        assert_eq!(first, vec![Ok(1), Err(CollectionError::empty("source"))]);
        assert_eq!(second, first);
        assert!(cursor.is_exhausted());
    }
}

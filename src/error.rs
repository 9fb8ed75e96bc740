//! Error types for backends and deferred values.
//!
//! Every failure the substrate can raise is a [`CollectionError`]. Failures
//! are local and synchronous: nothing is retried. On the lazy backends
//! (`Lazy`, `Buffered`, `Snap`) a failure surfaces at the point the
//! triggering element is pulled, which may be later in program order than
//! the call that built the chain.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::backend::{Backend, Eager};
//! use lazuli::error::CollectionError;
//!
//! let eager: Eager<i32> = Eager::from(vec![1, 2, 3]);
//! assert_eq!(
//!     eager.get(5),
//!     Err(CollectionError::IndexOutOfRange { index: 5, size: 3 })
//! );
//! ```

use thiserror::Error;

/// A mismatch between the shape a validator expected and the shape it saw.
///
/// Raised by external [`Validator`](crate::validate::Validator)
/// implementations and carried unchanged through derived operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("type mismatch at {position}: expected {expected}, found {actual}")]
pub struct TypeMismatch {
    /// Identifier of the slot that was validated (`element`, `key`, ...).
    pub position: String,
    /// Rendering of the expected shape.
    pub expected: String,
    /// Rendering of the shape actually found.
    pub actual: String,
}

impl TypeMismatch {
    /// Creates a new mismatch description.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lazuli::error::TypeMismatch;
    ///
    /// let mismatch = TypeMismatch::new("element", "even number", "3");
    /// assert_eq!(
    ///     mismatch.to_string(),
    ///     "type mismatch at element: expected even number, found 3"
    /// );
    /// ```
    pub fn new(
        position: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            position: position.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Represents every failure raised by the backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// An index outside `[0, size)` was requested.
    ///
    /// For backends whose size is only discovered by draining, `size` is the
    /// number of elements seen before the source ended.
    #[error("index {index} is out of range for a sequence of size {size}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The size of the sequence.
        size: usize,
    },

    /// A requested value is absent.
    #[error("element not found: {rendering}")]
    ElementNotFound {
        /// Canonical text rendering of the missing value.
        rendering: String,
    },

    /// An operation that needs at least one element ran on an empty source.
    #[error("{operation} requires at least one element")]
    EmptyStructure {
        /// Name of the operation that failed.
        operation: &'static str,
    },

    /// An external validator rejected an element.
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatch),

    /// A buffering cursor was read past the point its source was exhausted.
    #[error("no element at index {index}: the source is exhausted")]
    NoSuchElement {
        /// The index that was read.
        index: usize,
    },

    /// A buffering cursor was advanced while another advance was in progress.
    #[error("the buffering cursor is already being advanced")]
    CursorBusy,

    /// A backend was asked for its elements while it was still producing
    /// them, or after a panic interrupted its materialization.
    #[error("the backend is already being materialized")]
    MaterializationInProgress,
}

impl CollectionError {
    /// Builds an [`CollectionError::ElementNotFound`] from the `Debug`
    /// rendering of `value`.
    pub fn not_found<T: std::fmt::Debug + ?Sized>(value: &T) -> Self {
        Self::ElementNotFound {
            rendering: format!("{value:?}"),
        }
    }

    /// Builds an [`CollectionError::EmptyStructure`] for `operation`.
    #[inline]
    pub const fn empty(operation: &'static str) -> Self {
        Self::EmptyStructure { operation }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, CollectionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_index_out_of_range_display() {
        let error = CollectionError::IndexOutOfRange { index: 4, size: 2 };
        assert_eq!(
            error.to_string(),
            "index 4 is out of range for a sequence of size 2"
        );
    }

    #[rstest]
    fn test_not_found_uses_debug_rendering() {
        let error = CollectionError::not_found("missing");
        assert_eq!(
            error,
            CollectionError::ElementNotFound {
                rendering: "\"missing\"".to_string()
            }
        );
    }

    #[rstest]
    fn test_empty_structure_display() {
        assert_eq!(
            CollectionError::empty("group_by").to_string(),
            "group_by requires at least one element"
        );
    }

    #[rstest]
    fn test_type_mismatch_is_transparent() {
        let mismatch = TypeMismatch::new("key", "string", "integer");
        let error = CollectionError::from(mismatch.clone());
        assert_eq!(error.to_string(), mismatch.to_string());
    }

    #[rstest]
    fn test_cursor_busy_has_no_source() {
        use std::error::Error;

        let error = CollectionError::CursorBusy;
        assert!(error.source().is_none());
    }
}

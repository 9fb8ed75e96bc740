//! Two-branch values.
//!
//! [`Either`] is one of the outcome shapes a
//! [`Deferred`](crate::deferred::Deferred) node can produce. It is
//! right-biased: `Right` carries the value that transformations act on and
//! `Left` carries the alternative that is passed through untouched.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::control::Either;
//!
//! let parsed: Either<String, i32> = "42"
//!     .parse::<i32>()
//!     .map_err(|error| error.to_string())
//!     .into();
//!
//! let label = parsed
//!     .map_right(|value| value + 1)
//!     .fold(|error| format!("bad input: {error}"), |value| format!("got {value}"));
//! assert_eq!(label, "got 43");
//! ```

use std::fmt;

/// A value that is either a `Left(L)` or a `Right(R)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Either<L, R> {
    /// The alternative branch.
    Left(L),
    /// The value branch.
    Right(R),
}

impl<L, R> Either<L, R> {
    // =========================================================================
    // Inspection
    // =========================================================================

    /// Returns `true` for `Left`.
    #[inline]
    pub const fn is_left(&self) -> bool {
        matches!(self, Self::Left(_))
    }

    /// Returns `true` for `Right`.
    #[inline]
    pub const fn is_right(&self) -> bool {
        matches!(self, Self::Right(_))
    }

    /// The left value, if any.
    #[inline]
    pub fn left(self) -> Option<L> {
        match self {
            Self::Left(left) => Some(left),
            Self::Right(_) => None,
        }
    }

    /// The right value, if any.
    #[inline]
    pub fn right(self) -> Option<R> {
        match self {
            Self::Left(_) => None,
            Self::Right(right) => Some(right),
        }
    }

    /// Borrows both branches.
    #[inline]
    pub const fn as_ref(&self) -> Either<&L, &R> {
        match self {
            Self::Left(left) => Either::Left(left),
            Self::Right(right) => Either::Right(right),
        }
    }

    // =========================================================================
    // Transformation
    // =========================================================================

    /// Transforms the left value.
    pub fn map_left<M, F>(self, function: F) -> Either<M, R>
    where
        F: FnOnce(L) -> M,
    {
        match self {
            Self::Left(left) => Either::Left(function(left)),
            Self::Right(right) => Either::Right(right),
        }
    }

    /// Transforms the right value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lazuli::control::Either;
    ///
    /// let value: Either<&str, i32> = Either::Right(4);
    /// assert_eq!(value.map_right(|number| number * 2), Either::Right(8));
    ///
    /// let missing: Either<&str, i32> = Either::Left("none");
    /// assert_eq!(missing.map_right(|number| number * 2), Either::Left("none"));
    /// ```
    pub fn map_right<S, F>(self, function: F) -> Either<L, S>
    where
        F: FnOnce(R) -> S,
    {
        match self {
            Self::Left(left) => Either::Left(left),
            Self::Right(right) => Either::Right(function(right)),
        }
    }

    /// Chains a computation on the right value.
    pub fn flat_map<S, F>(self, function: F) -> Either<L, S>
    where
        F: FnOnce(R) -> Either<L, S>,
    {
        match self {
            Self::Left(left) => Either::Left(left),
            Self::Right(right) => function(right),
        }
    }

    /// Collapses both branches into one value.
    pub fn fold<T, FL, FR>(self, on_left: FL, on_right: FR) -> T
    where
        FL: FnOnce(L) -> T,
        FR: FnOnce(R) -> T,
    {
        match self {
            Self::Left(left) => on_left(left),
            Self::Right(right) => on_right(right),
        }
    }

    /// Exchanges the branches.
    #[must_use]
    pub fn swap(self) -> Either<R, L> {
        match self {
            Self::Left(left) => Either::Right(left),
            Self::Right(right) => Either::Left(right),
        }
    }

    /// The right value, or `default` for `Left`.
    pub fn right_or(self, default: R) -> R {
        self.right().unwrap_or(default)
    }

    /// Converts into a `Result`, treating `Left` as the error.
    ///
    /// # Errors
    ///
    /// Returns `Err(left)` for `Left`.
    pub fn into_result(self) -> Result<R, L> {
        match self {
            Self::Left(left) => Err(left),
            Self::Right(right) => Ok(right),
        }
    }
}

impl<L, R> From<Result<R, L>> for Either<L, R> {
    fn from(result: Result<R, L>) -> Self {
        match result {
            Ok(right) => Self::Right(right),
            Err(left) => Self::Left(left),
        }
    }
}

impl<L: fmt::Debug, R: fmt::Debug> fmt::Debug for Either<L, R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left(left) => formatter.debug_tuple("Left").field(left).finish(),
            Self::Right(right) => formatter.debug_tuple("Right").field(right).finish(),
        }
    }
}

impl<L: fmt::Display, R: fmt::Display> fmt::Display for Either<L, R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left(left) => write!(formatter, "Left({left})"),
            Self::Right(right) => write!(formatter, "Right({right})"),
        }
    }
}

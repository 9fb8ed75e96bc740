//! The shapes a deferred computation can produce.

use crate::control::Either;

/// A value that is either a success carrying `Value` or a failure carrying
/// `Failure`.
///
/// Implemented for [`Option`] (failure is `()`), [`Result`] and
/// [`Either`] (failure is `Left`). [`Deferred`](super::Deferred) is generic
/// over this trait, so one node type serves all three shapes.
///
/// # Laws
///
/// - `Self::success(v).into_branches() == Ok(v)`
/// - `Self::failure(e).into_branches() == Err(e)`
/// - `outcome.is_success() == outcome.into_branches().is_ok()`
pub trait Outcome: Clone + 'static {
    /// The success payload.
    type Value: Clone + 'static;

    /// The failure payload.
    type Failure: Clone + 'static;

    /// The same shape with a different success payload.
    type Rebind<U: Clone + 'static>: Outcome<Value = U, Failure = Self::Failure>;

    /// Builds a success.
    fn success(value: Self::Value) -> Self;

    /// Builds a failure.
    fn failure(failure: Self::Failure) -> Self;

    /// Splits into the two branches.
    ///
    /// # Errors
    ///
    /// Returns `Err` with the failure payload for a failure.
    fn into_branches(self) -> Result<Self::Value, Self::Failure>;

    /// Returns `true` for a success.
    fn is_success(&self) -> bool;

    /// Transforms the success payload; failures pass through.
    fn map_value<U, F>(self, function: F) -> Self::Rebind<U>
    where
        U: Clone + 'static,
        F: FnOnce(Self::Value) -> U,
    {
        match self.into_branches() {
            Ok(value) => <Self::Rebind<U> as Outcome>::success(function(value)),
            Err(failure) => <Self::Rebind<U> as Outcome>::failure(failure),
        }
    }

    /// Chains a computation on the success payload; failures pass through.
    fn bind_value<U, F>(self, function: F) -> Self::Rebind<U>
    where
        U: Clone + 'static,
        F: FnOnce(Self::Value) -> Self::Rebind<U>,
    {
        match self.into_branches() {
            Ok(value) => function(value),
            Err(failure) => <Self::Rebind<U> as Outcome>::failure(failure),
        }
    }

    /// Collapses both branches into one value.
    fn fold_branches<T, FF, FS>(self, on_failure: FF, on_success: FS) -> T
    where
        FF: FnOnce(Self::Failure) -> T,
        FS: FnOnce(Self::Value) -> T,
    {
        match self.into_branches() {
            Ok(value) => on_success(value),
            Err(failure) => on_failure(failure),
        }
    }
}

impl<T: Clone + 'static> Outcome for Option<T> {
    type Value = T;
    type Failure = ();
    type Rebind<U: Clone + 'static> = Option<U>;

    #[inline]
    fn success(value: T) -> Self {
        Some(value)
    }

    #[inline]
    fn failure((): ()) -> Self {
        None
    }

    #[inline]
    fn into_branches(self) -> Result<T, ()> {
        self.ok_or(())
    }

    #[inline]
    fn is_success(&self) -> bool {
        self.is_some()
    }
}

impl<T, E> Outcome for Result<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    type Value = T;
    type Failure = E;
    type Rebind<U: Clone + 'static> = Result<U, E>;

    #[inline]
    fn success(value: T) -> Self {
        Ok(value)
    }

    #[inline]
    fn failure(failure: E) -> Self {
        Err(failure)
    }

    #[inline]
    fn into_branches(self) -> Self {
        self
    }

    #[inline]
    fn is_success(&self) -> bool {
        self.is_ok()
    }
}

impl<L, R> Outcome for Either<L, R>
where
    L: Clone + 'static,
    R: Clone + 'static,
{
    type Value = R;
    type Failure = L;
    type Rebind<U: Clone + 'static> = Either<L, U>;

    #[inline]
    fn success(value: R) -> Self {
        Self::Right(value)
    }

    #[inline]
    fn failure(failure: L) -> Self {
        Self::Left(failure)
    }

    #[inline]
    fn into_branches(self) -> Result<R, L> {
        self.into_result()
    }

    #[inline]
    fn is_success(&self) -> bool {
        self.is_right()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(2), Some(4))]
    #[case(None, None)]
    fn test_option_map_value(#[case] outcome: Option<i32>, #[case] expected: Option<i32>) {
        assert_eq!(outcome.map_value(|value| value * 2), expected);
    }

    #[rstest]
    fn test_result_bind_value_short_circuits() {
        let failed: Result<i32, String> = Err("boom".to_string());
        assert_eq!(
            failed.bind_value(|value| Ok::<i32, String>(value + 1)),
            Err("boom".to_string())
        );
    }

    #[rstest]
    fn test_either_branches() {
        let left: Either<&str, i32> = Outcome::failure("left");
        let right: Either<&str, i32> = Outcome::success(1);
        assert!(!left.is_success());
        assert!(right.is_success());
        assert_eq!(left.into_branches(), Err("left"));
        assert_eq!(right.fold_branches(|_| 0, |value| value + 10), 11);
    }
}

//! Element validation hook.
//!
//! Backends never inspect element types at run time on their own. Callers
//! that need a shape check plug a [`Validator`] in through
//! [`Backend::validated`](crate::backend::Backend::validated); rejections
//! surface as [`CollectionError::TypeMismatch`](crate::error::CollectionError::TypeMismatch)
//! with the same timing as any other per-element failure.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::backend::{Backend, Lazy};
//! use lazuli::error::{CollectionError, TypeMismatch};
//!
//! let lazy = Lazy::new(|| vec![2, 4, 5]);
//! let even = lazy
//!     .validated(
//!         |value: &i32, position: &str| {
//!             if value % 2 == 0 {
//!                 Ok(())
//!             } else {
//!                 Err(TypeMismatch::new(position, "even number", value.to_string()))
//!             }
//!         },
//!         "element",
//!     )
//!     .unwrap();
//!
//! assert_eq!(even.get(1), Ok(4));
//! assert_eq!(
//!     even.to_vec(),
//!     Err(CollectionError::TypeMismatch(TypeMismatch::new(
//!         "element",
//!         "even number",
//!         "5"
//!     )))
//! );
//! ```

use crate::error::TypeMismatch;

/// Checks that a value has the shape a slot expects.
///
/// `position` names the slot being checked (`"element"`, `"key"`, ...) and
/// is carried into the [`TypeMismatch`] on rejection.
pub trait Validator<T> {
    /// Accepts or rejects `value`.
    ///
    /// # Errors
    ///
    /// Returns a [`TypeMismatch`] describing the rejected value.
    fn validate(&self, value: &T, position: &str) -> Result<(), TypeMismatch>;
}

impl<T, F> Validator<T> for F
where
    F: Fn(&T, &str) -> Result<(), TypeMismatch>,
{
    fn validate(&self, value: &T, position: &str) -> Result<(), TypeMismatch> {
        self(value, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct NonEmpty;

    impl Validator<String> for NonEmpty {
        fn validate(&self, value: &String, position: &str) -> Result<(), TypeMismatch> {
            if value.is_empty() {
                Err(TypeMismatch::new(position, "non-empty string", "\"\""))
            } else {
                Ok(())
            }
        }
    }

    #[rstest]
    #[case("text", true)]
    #[case("", false)]
    fn test_struct_validator(#[case] value: &str, #[case] accepted: bool) {
        assert_eq!(NonEmpty.validate(&value.to_string(), "key").is_ok(), accepted);
    }

    #[rstest]
    fn test_closure_validator_carries_position() {
        let positive = |value: &i32, position: &str| {
            if *value > 0 {
                Ok(())
            } else {
                Err(TypeMismatch::new(position, "positive", value.to_string()))
            }
        };
        assert_eq!(
            positive.validate(&-1, "value"),
            Err(TypeMismatch::new("value", "positive", "-1"))
        );
    }
}

#![cfg(feature = "deferred")]
//! Property-based tests for Deferred laws.
//!
//! This module verifies that Deferred nodes satisfy:
//!
//! - **Idempotence**: forcing returns the same outcome every time
//! - **Functor Laws**: identity and composition
//! - **Monad Laws**: left identity, right identity, associativity
//! - **Fallback transparency**: dropping intermediates never changes results

use lazuli::control::Either;
use lazuli::deferred::Deferred;
use proptest::prelude::*;

fn outcome_strategy() -> impl Strategy<Value = Option<i32>> {
    prop::option::of(-1000..1000_i32)
}

// =============================================================================
// Idempotence
// =============================================================================

proptest! {
    /// Forcing repeatedly returns the same outcome
    #[test]
    fn prop_deferred_idempotence(outcome in outcome_strategy()) {
        let deferred = Deferred::new(move || outcome);
        prop_assert_eq!(deferred.unwrap(), outcome);
        prop_assert_eq!(deferred.unwrap(), outcome);
    }
}

// =============================================================================
// Functor Laws
// =============================================================================

proptest! {
    /// Identity: map(id) == id
    #[test]
    fn prop_deferred_functor_identity(outcome in outcome_strategy()) {
        let deferred = Deferred::new(move || outcome);
        prop_assert_eq!(deferred.map(|value| value).unwrap(), deferred.unwrap());
    }
}

proptest! {
    /// Composition: map(f).map(g) == map(g . f)
    #[test]
    fn prop_deferred_functor_composition(value in -1000..1000_i32) {
        let deferred: Deferred<Either<String, i32>> = Deferred::new(move || Either::Right(value));
        let function = |value: i32| value + 7;
        let other = |value: i32| value * 3;

        let chained = deferred.map(function).map(other);
        let composed = deferred.map(move |value| other(function(value)));
        prop_assert_eq!(chained.unwrap(), composed.unwrap());
    }
}

// =============================================================================
// Monad Laws
// =============================================================================

fn halve(value: i32) -> Deferred<Result<i32, String>> {
    Deferred::new(move || {
        if value % 2 == 0 {
            Ok(value / 2)
        } else {
            Err(format!("{value} is odd"))
        }
    })
}

fn decrement(value: i32) -> Deferred<Result<i32, String>> {
    Deferred::new(move || Ok(value - 1))
}

proptest! {
    /// Left identity: ready(a).flat_map(f) == f(a)
    #[test]
    fn prop_deferred_left_identity(value in -1000..1000_i32) {
        let left = Deferred::<Result<i32, String>>::ready(Ok(value)).flat_map(halve);
        prop_assert_eq!(left.unwrap(), halve(value).unwrap());
    }
}

proptest! {
    /// Right identity: m.flat_map(ready) == m
    #[test]
    fn prop_deferred_right_identity(value in -1000..1000_i32) {
        let deferred = halve(value);
        let right = deferred.flat_map(|inner| Deferred::ready(Ok(inner)));
        prop_assert_eq!(right.unwrap(), deferred.unwrap());
    }
}

proptest! {
    /// Associativity: m.flat_map(f).flat_map(g) == m.flat_map(|x| f(x).flat_map(g))
    #[test]
    fn prop_deferred_associativity(value in -1000..1000_i32) {
        let deferred: Deferred<Result<i32, String>> = Deferred::new(move || Ok(value));
        let left = deferred.flat_map(halve).flat_map(decrement);
        let right = deferred.flat_map(|inner| halve(inner).flat_map(decrement));
        prop_assert_eq!(left.unwrap(), right.unwrap());
    }
}

// =============================================================================
// Fallback Transparency
// =============================================================================

proptest! {
    /// Dropping every intermediate node leaves the result unchanged
    #[test]
    fn prop_deferred_fallback_transparency(value in -1000..1000_i32, steps in 1..20_usize) {
        let root: Deferred<Option<i32>> = Deferred::new(move || Some(value));
        let mut kept = Vec::new();
        let mut current = root.clone();
        for _ in 0..steps {
            current = current.map(|inner| inner.wrapping_add(1));
            kept.push(current.clone());
        }
        let with_intermediates = current.unwrap();
        prop_assert!(kept.iter().all(Deferred::is_forced));

        let mut dropping = root.map(|inner| inner.wrapping_add(1));
        for _ in 1..steps {
            dropping = dropping.map(|inner| inner.wrapping_add(1));
        }
        drop(root);
        prop_assert_eq!(dropping.unwrap(), with_intermediates);
    }
}

#![cfg(feature = "backend")]
//! Property-based tests for backend equivalence.
//!
//! For the same source and the same chain of operations, every backend
//! must produce the same sequence:
//!
//! - **Chain equivalence**: `Eager`, `Lazy`, `Buffered` and `Snap` agree
//!   with a plain `Vec` model
//! - **Replay**: materializing twice yields the same result
//! - **Group equivalence**: `group_by` agrees across backends
//! - **Index equivalence**: `get` agrees for every index

use lazuli::backend::{Backend, Buffered, Eager, Lazy, Snap};
use proptest::prelude::*;
use std::collections::HashSet;

// =============================================================================
// Operation Model
// =============================================================================

#[derive(Debug, Clone)]
enum Operation {
    Add(i32),
    KeepMultiplesOf(i32),
    Slice(usize, usize),
    Sort,
    SortDescending,
    Reverse,
    Distinct,
    AppendSelf,
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (-5..5_i32).prop_map(Operation::Add),
        (1..4_i32).prop_map(Operation::KeepMultiplesOf),
        (0..12_usize, 0..12_usize).prop_map(|(start, end)| Operation::Slice(start, end)),
        Just(Operation::Sort),
        Just(Operation::SortDescending),
        Just(Operation::Reverse),
        Just(Operation::Distinct),
        Just(Operation::AppendSelf),
    ]
}

fn apply_model(values: Vec<i32>, operations: &[Operation]) -> Vec<i32> {
    operations
        .iter()
        .fold(values, |current, operation| match operation {
            Operation::Add(amount) => current.into_iter().map(|value| value + amount).collect(),
            Operation::KeepMultiplesOf(divisor) => current
                .into_iter()
                .filter(|value| value % divisor == 0)
                .collect(),
            Operation::Slice(start, end) => {
                let start = (*start).min(current.len());
                let end = (*end).clamp(start, current.len());
                current[start..end].to_vec()
            }
            Operation::Sort => {
                let mut sorted = current;
                sorted.sort();
                sorted
            }
            Operation::SortDescending => {
                let mut sorted = current;
                sorted.sort_by(|left, right| right.cmp(left));
                sorted
            }
            Operation::Reverse => current.into_iter().rev().collect(),
            Operation::Distinct => {
                let mut seen = HashSet::new();
                current.into_iter().filter(|value| seen.insert(*value)).collect()
            }
            Operation::AppendSelf => {
                let mut doubled = current.clone();
                doubled.extend(current);
                doubled
            }
        })
}

fn apply_backend<B>(backend: B, operations: &[Operation]) -> B
where
    B: Backend<i32, Rebind<i32> = B>,
{
    operations
        .iter()
        .fold(backend, |current, operation| match *operation {
            Operation::Add(amount) => current.map(move |value| value + amount),
            Operation::KeepMultiplesOf(divisor) => current.filter(move |value| value % divisor == 0),
            Operation::Slice(start, end) => current.slice(start, end),
            Operation::Sort => current.sort(),
            Operation::SortDescending => current.sort_by(|left, right| right.cmp(left)),
            Operation::Reverse => current.reverse(),
            Operation::Distinct => current.distinct(),
            Operation::AppendSelf => current.append(&current),
        })
}

fn source_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-20..20_i32, 0..12)
}

fn chain_strategy() -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(operation_strategy(), 0..6)
}

// =============================================================================
// Chain Equivalence
// =============================================================================

proptest! {
    /// Every backend agrees with the `Vec` model
    #[test]
    fn prop_backends_agree_with_model(values in source_strategy(), operations in chain_strategy()) {
        let expected = apply_model(values.clone(), &operations);
        let source = values.clone();

        let eager = apply_backend(Eager::from(values.clone()), &operations);
        let lazy = apply_backend(Lazy::new(move || source.clone()), &operations);
        let buffered = apply_backend(Buffered::from_source(values.clone()), &operations);
        let snap = apply_backend(Snap::wrap(Eager::from(values)), &operations);

        prop_assert_eq!(eager.to_vec(), Ok(expected.clone()));
        prop_assert_eq!(lazy.to_vec(), Ok(expected.clone()));
        prop_assert_eq!(buffered.to_vec(), Ok(expected.clone()));
        prop_assert_eq!(snap.to_vec(), Ok(expected));
    }
}

proptest! {
    /// Materializing twice yields the same sequence
    #[test]
    fn prop_replay_is_stable(values in source_strategy(), operations in chain_strategy()) {
        let source = values.clone();
        let lazy = apply_backend(Lazy::new(move || source.clone()), &operations);
        let buffered = apply_backend(Buffered::from_source(values.clone()), &operations);
        let snap = apply_backend(Snap::wrap(Buffered::from_source(values)), &operations);

        prop_assert_eq!(lazy.to_vec(), lazy.to_vec());
        prop_assert_eq!(buffered.to_vec(), buffered.to_vec());
        prop_assert_eq!(snap.to_vec(), snap.to_vec());
    }
}

// =============================================================================
// Group Equivalence
// =============================================================================

fn render_groups<B>(backend: &B) -> Option<Vec<(i32, Vec<i32>)>>
where
    B: Backend<i32>,
{
    let grouped = backend.group_by(|value| value.rem_euclid(3)).ok()?;
    let groups = grouped.to_vec().ok()?;
    Some(
        groups
            .into_iter()
            .map(|(key, members)| (key, members.to_owned_vec()))
            .collect(),
    )
}

proptest! {
    /// `group_by` agrees across backends, including the empty case
    #[test]
    fn prop_group_by_agrees(values in source_strategy()) {
        let source = values.clone();
        let eager = render_groups(&Eager::from(values.clone()));

        prop_assert_eq!(render_groups(&Lazy::new(move || source.clone())), eager.clone());
        prop_assert_eq!(render_groups(&Buffered::from_source(values.clone())), eager.clone());
        prop_assert_eq!(render_groups(&Snap::wrap(Eager::from(values.clone()))), eager.clone());
        prop_assert_eq!(eager.is_none(), values.is_empty());
    }
}

// =============================================================================
// Index Equivalence
// =============================================================================

proptest! {
    /// `get` agrees with the model for every index, in and out of range
    #[test]
    fn prop_get_agrees(values in source_strategy(), index in 0..16_usize) {
        let source = values.clone();
        let expected = Eager::from(values.clone()).get(index);

        prop_assert_eq!(Lazy::new(move || source.clone()).get(index), expected.clone());
        prop_assert_eq!(Buffered::from_source(values.clone()).get(index), expected.clone());
        prop_assert_eq!(Snap::wrap(Eager::from(values)).get(index), expected);
    }
}

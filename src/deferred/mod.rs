//! Deferred monadic values.
//!
//! A [`Deferred`] wraps a computation that has not run yet and will yield
//! an [`Outcome`]: an [`Option`], a [`Result`] or an
//! [`Either`](crate::control::Either). Composition (`map`, `flat_map`,
//! `recover`, ...) builds new nodes without running anything. The first
//! terminal call (`unwrap`, `fold`) runs the computation and memoizes the
//! outcome in the node; it never runs again for that node.
//!
//! # Examples
//!
//! ```rust
//! use lazuli::deferred::Deferred;
//!
//! let lookup: Deferred<Option<u32>> = Deferred::new(|| Some(21));
//! let answer = lookup.map(|value| value * 2).otherwise(&Deferred::ready(Some(0)));
//!
//! assert!(!answer.is_forced());
//! assert_eq!(answer.fold(|()| 0, |value| value), 42);
//! assert!(answer.is_forced());
//! ```

mod node;
mod outcome;

pub use node::Deferred;
pub use outcome::Outcome;

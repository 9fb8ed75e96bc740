//! # lazuli
//!
//! Lazy evaluation and memoization substrate for persistent collections.
//!
//! ## Overview
//!
//! Collections built on this crate pick one of four interchangeable
//! evaluation strategies and one deferred-monad node type:
//!
//! - **Eager**: a realized, shared, immutable buffer
//! - **Lazy**: a factory re-run on every traversal, nothing retained
//! - **Buffered**: a one-shot source pulled at most once, replayed from a cache
//! - **Snap**: a transformation queue that collapses to an eager value on first use
//! - **Deferred**: an at-most-once computation yielding an `Option`, `Result`
//!   or `Either`, composed through weak links
//!
//! All strategies implement [`Backend`](backend::Backend) and produce the same
//! sequences for the same source and chain of operations.
//!
//! ## Feature Flags
//!
//! - `backend`: the four backends and the buffering cursor
//! - `control`: the `Either` type
//! - `deferred`: deferred monadic nodes (enables `control`)
//! - `tracing`: trace-level events at materialization points
//! - `fxhash` / `ahash`: hasher used by `distinct` and `group_by`
//! - `full`: everything except the alternative hashers
//!
//! ## Example
//!
//! ```rust
//! use lazuli::prelude::*;
//!
//! let lazy = Lazy::new(|| 1..=6);
//! let snap = Snap::wrap(lazy).filter(|value| value % 2 == 0).reverse();
//! assert_eq!(snap.to_vec(), Ok(vec![6, 4, 2]));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use lazuli::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{CollectionError, TypeMismatch};
    pub use crate::validate::Validator;

    #[cfg(feature = "backend")]
    pub use crate::backend::*;

    #[cfg(feature = "control")]
    pub use crate::control::*;

    #[cfg(feature = "deferred")]
    pub use crate::deferred::*;
}

mod trace;

pub mod error;

pub mod validate;

#[cfg(feature = "backend")]
pub mod backend;

#[cfg(feature = "control")]
pub mod control;

#[cfg(feature = "deferred")]
pub mod deferred;

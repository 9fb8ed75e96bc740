//! Control structures.
//!
//! - [`Either`]: a right-biased two-branch value, one of the outcome shapes
//!   a deferred node can produce.

mod either;

pub use either::Either;

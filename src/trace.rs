//! Structured logging shim.
//!
//! With the `tracing` feature enabled, [`trace_event!`] forwards to
//! `tracing::trace!` under the `lazuli` target. Without it the macro expands
//! to nothing and the arguments are never evaluated.

/// Emits a trace-level event at a materialization point.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($($argument:tt)*) => {
        ::tracing::trace!(target: "lazuli", $($argument)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($($argument:tt)*) => {};
}

pub(crate) use trace_event;

//! Tracer interface and event types.
//!
//! A tracer observes a process from the outside: the runtime emits a
//! [`TraceEvent::Call`] when it enters a callback and a
//! [`TraceEvent::CallResult`] when the callback returns. Payloads and
//! results are carried pre-rendered (their `Debug` form) so events are
//! self-contained and serializable.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::Serialize;

// Layer 3: Internal module imports
// (none)

/// A traced observation of one process.
#[derive(Debug, Clone, Serialize)]
pub enum TraceEvent {
    /// Emitted before a callback runs.
    Call {
        /// String form of the process, e.g. `<0.1.2>`.
        pid: String,
        /// When the callback was entered.
        time: DateTime<Utc>,
        /// Which callback, e.g. `"HandleCall"`.
        tag: &'static str,
        /// Debug rendering of the argument.
        arg: String,
    },

    /// Emitted after a callback returns.
    CallResult {
        /// String form of the process.
        pid: String,
        /// When the callback returned.
        time: DateTime<Utc>,
        /// Which callback.
        tag: &'static str,
        /// Debug rendering of the argument.
        arg: String,
        /// Debug rendering of the result.
        result: String,
        /// How long the callback ran.
        duration: Duration,
    },
}

/// Receiver of [`TraceEvent`]s.
///
/// Implemented automatically for closures, so ad-hoc tracers need no
/// wrapper type:
///
/// ```rust
/// use proclet_rt::tracer::{Tracer, TraceEvent};
///
/// let tracer = |event: &TraceEvent| {
///     let _ = event; // collect, print, forward...
/// };
/// fn assert_tracer(_: &impl Tracer) {}
/// assert_tracer(&tracer);
/// ```
pub trait Tracer: Send + Sync {
    /// Handle one event. Called on the traced process's task; keep it
    /// cheap.
    fn event(&self, event: &TraceEvent);
}

impl<F> Tracer for F
where
    F: Fn(&TraceEvent) + Send + Sync,
{
    fn event(&self, event: &TraceEvent) {
        self(event)
    }
}

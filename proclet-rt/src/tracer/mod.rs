//! Callback tracing.
//!
//! - [`Tracer`] - the observer interface, implemented by any closure
//! - [`TraceEvent`] - entry/exit events with timestamps and durations
//! - [`ConsoleTracer`] - human-readable lines on stdout
//! - [`ChainTracer`] - fan-out to several tracers
//!
//! Attach a tracer per process with
//! [`SpawnOpts::with_tracer`](crate::SpawnOpts::with_tracer).

pub mod chain;
pub mod console;
pub mod traits;

pub use chain::ChainTracer;
pub use console::ConsoleTracer;
pub use traits::{TraceEvent, Tracer};

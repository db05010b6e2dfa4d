//! Fan-out tracer.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::traits::{TraceEvent, Tracer};

/// Forwards every event to a list of tracers, in order.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use proclet_rt::tracer::{ChainTracer, ConsoleTracer, TraceEvent};
///
/// let chain = ChainTracer::new()
///     .with(Arc::new(ConsoleTracer::new()))
///     .with(Arc::new(|_event: &TraceEvent| { /* metrics */ }));
/// assert_eq!(chain.len(), 2);
/// ```
#[derive(Default, Clone)]
pub struct ChainTracer {
    tracers: Vec<Arc<dyn Tracer>>,
}

impl ChainTracer {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tracer to the chain.
    #[must_use]
    pub fn with(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracers.push(tracer);
        self
    }

    /// Number of chained tracers.
    pub fn len(&self) -> usize {
        self.tracers.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.tracers.is_empty()
    }
}

impl Tracer for ChainTracer {
    fn event(&self, event: &TraceEvent) {
        for tracer in &self.tracers {
            tracer.event(event);
        }
    }
}

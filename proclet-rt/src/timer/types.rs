//! Timer table keys and entries.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use tokio::time::Instant;

// Layer 3: Internal module imports
use crate::message::term::CloneTerm;
use crate::process::Pid;
use crate::util::Ref;

/// Ordering key of the timer table: fire time first, reference as the
/// tie-break, so simultaneous timers dispatch in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct TimerKey {
    pub(crate) when: Instant,
    pub(crate) reference: Ref,
}

/// A scheduled delivery.
#[derive(Debug)]
pub(crate) struct TimerEntry {
    pub(crate) target: Pid,
    pub(crate) msg: Box<dyn CloneTerm>,
    /// `Some` for repeating timers.
    pub(crate) interval: Option<Duration>,
}

/// Reverse index so `cancel(Ref)` finds the table key.
#[derive(Debug, Clone)]
pub(crate) struct TimerIndex {
    pub(crate) key: TimerKey,
    pub(crate) target: Pid,
}

/// Request payloads understood by the timer server.
#[derive(Debug)]
pub(crate) struct SendAfterReq {
    pub(crate) delay: Duration,
    pub(crate) target: Pid,
    pub(crate) msg: Box<dyn CloneTerm>,
}

#[derive(Debug)]
pub(crate) struct SendIntervalReq {
    pub(crate) every: Duration,
    pub(crate) target: Pid,
    pub(crate) msg: Box<dyn CloneTerm>,
}

#[derive(Debug)]
pub(crate) struct CancelReq {
    pub(crate) reference: Ref,
}

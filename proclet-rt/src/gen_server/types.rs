//! Tagged callback results.
//!
//! Every generic-server callback returns a value from a closed set; the
//! loop's dispatch over these sums is total, so there is no "bad reply"
//! failure mode. A zero duration in any `*Timeout` variant leaves the
//! inactivity timer disarmed.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::error::{ExitReason, RtError};
use crate::message::{Term, TermBox};

/// Outcome of [`GenServer::init`](super::GenServer::init).
#[derive(Debug)]
pub enum InitResult {
    /// Initialization succeeded; enter the idle loop.
    Ok,

    /// Succeeded, and arm the inactivity timer.
    Timeout(Duration),

    /// Fail the start handshake and terminate with the reason.
    Stop(ExitReason),
}

/// Outcome of [`GenServer::handle_call`](super::GenServer::handle_call).
#[derive(Debug)]
pub enum CallResult {
    /// Send the value to the caller and keep looping.
    Reply(TermBox),

    /// Reply, and arm the inactivity timer.
    ReplyTimeout(TermBox, Duration),

    /// Leave the caller waiting; the callback took the
    /// [`ReplyTo`](crate::message::ReplyTo) and will answer later.
    NoReply,

    /// As [`NoReply`](CallResult::NoReply), with the inactivity timer armed.
    NoReplyTimeout(Duration),

    /// Reply, then terminate with the reason.
    Stop(ExitReason, TermBox),

    /// Send the error to the caller and terminate with its text.
    Failure(RtError),
}

impl CallResult {
    /// `Reply` with an unboxed value.
    pub fn reply<T: Term>(value: T) -> Self {
        Self::Reply(Box::new(value))
    }

    /// `ReplyTimeout` with an unboxed value.
    pub fn reply_timeout<T: Term>(value: T, timeout: Duration) -> Self {
        Self::ReplyTimeout(Box::new(value), timeout)
    }

    /// `Stop` with an unboxed reply value.
    pub fn stop<T: Term>(reason: ExitReason, value: T) -> Self {
        Self::Stop(reason, Box::new(value))
    }
}

/// Outcome of [`handle_cast`](super::GenServer::handle_cast) and
/// [`handle_info`](super::GenServer::handle_info).
#[derive(Debug)]
pub enum CastResult {
    /// Keep looping.
    NoReply,

    /// Keep looping with the inactivity timer armed.
    NoReplyTimeout(Duration),

    /// Terminate with the reason.
    Stop(ExitReason),

    /// Terminate with the error's text.
    Failure(RtError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_result_constructors() {
        match CallResult::reply(5u8) {
            CallResult::Reply(v) => assert_eq!(v.downcast_ref::<u8>(), Some(&5)),
            other => unreachable!("{other:?}"),
        }

        match CallResult::reply_timeout("x", Duration::from_millis(5)) {
            CallResult::ReplyTimeout(_, d) => assert_eq!(d, Duration::from_millis(5)),
            other => unreachable!("{other:?}"),
        }

        match CallResult::stop(ExitReason::Normal, 1u8) {
            CallResult::Stop(reason, _) => assert_eq!(reason, ExitReason::Normal),
            other => unreachable!("{other:?}"),
        }
    }
}

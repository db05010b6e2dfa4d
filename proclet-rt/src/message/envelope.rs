//! Mailbox envelopes for the user and system planes.
//!
//! The user channel carries [`UsrMsg`]: casts, synchronous calls with their
//! reply channel, and [`Info`] notifications (trapped exits, monitor-downs,
//! inactivity timeouts, `send_info` payloads). The system channel carries
//! [`SysMsg`], a closed set of link/exit/control messages handled by the
//! process driver before any user message.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use tokio::sync::oneshot;

// Layer 3: Internal module imports
use super::term::{Term, TermBox};
use crate::error::{ExitReason, RtError};
use crate::process::Pid;
use crate::util::Ref;

/// Reply side of a synchronous call.
pub(crate) type ReplySender = oneshot::Sender<Result<TermBox, RtError>>;

/// Messages on the user channel.
#[derive(Debug)]
pub enum UsrMsg {
    /// Asynchronous message, dispatched to `handle_cast`.
    Cast(TermBox),

    /// Synchronous request with its reply channel, dispatched to
    /// `handle_call`.
    Call {
        /// Request payload.
        req: TermBox,
        /// One-shot reply channel back to the caller.
        reply: ReplyTo,
    },

    /// Notification, dispatched to `handle_info`.
    Info(Info),
}

/// Messages on the system channel.
///
/// System messages are consumed by the process driver, never by user
/// callbacks; they implement the link/exit protocol and the synchronous
/// control requests.
#[derive(Debug)]
pub enum SysMsg {
    /// Mirror a link initiated by `from`.
    Link(Pid),

    /// Drop the link previously initiated by `from`.
    Unlink(Pid),

    /// Exit signal.
    Exit(ExitMsg),

    /// Snapshot the link set.
    GetLinks(oneshot::Sender<Vec<Pid>>),

    /// Terminate with the given reason. The requester observes completion
    /// through the exit signal, not through a reply.
    Stop(ExitReason),
}

/// An exit signal travelling between processes.
#[derive(Debug, Clone)]
pub struct ExitMsg {
    /// The signalling process; `None` when a process signals itself.
    pub from: Option<Pid>,
    /// Why the sender exited (or wants the receiver to).
    pub reason: ExitReason,
    /// True when the signal came from link teardown, in which case a
    /// receiver that never linked the sender drops it.
    pub link: bool,
}

/// Notifications delivered to `handle_info`.
#[derive(Debug)]
pub enum Info {
    /// The inactivity timer fired.
    Timeout,

    /// A trapped exit, redirected to the user channel.
    Exit {
        /// The signalling process; `None` for self-signals.
        from: Option<Pid>,
        /// The exit reason.
        reason: ExitReason,
    },

    /// A monitored process died.
    MonitorDown(MonitorDown),

    /// Arbitrary payload delivered through [`Pid::send_info`].
    Message(TermBox),
}

/// Death notification for one monitor reference.
#[derive(Debug, Clone)]
pub struct MonitorDown {
    /// The reference returned when the monitor was established.
    pub reference: Ref,
    /// The process that died.
    pub from: Pid,
    /// Its exit reason.
    pub reason: ExitReason,
}

/// The reply channel of a synchronous call.
///
/// Held by the generic-server loop while `handle_call` runs; the callback
/// may [`take`](ReplyTo::take) it to defer the reply past the callback's
/// return (the `NoReply` pattern). The underlying channel is one-shot, so a
/// reply is delivered at most once no matter which side sends it.
pub struct ReplyTo {
    tx: Option<ReplySender>,
}

impl ReplyTo {
    pub(crate) fn new(tx: ReplySender) -> Self {
        Self { tx: Some(tx) }
    }

    /// Reply with a value. Returns false if the reply was already sent,
    /// taken, or the caller stopped waiting.
    pub fn reply<T: Term>(&mut self, value: T) -> bool {
        self.reply_term(Box::new(value))
    }

    /// Reply with an already-boxed value.
    pub fn reply_term(&mut self, value: TermBox) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(Ok(value)).is_ok(),
            None => false,
        }
    }

    /// Reply with an error; the caller's `call` returns `Err`.
    pub fn reply_err(&mut self, err: RtError) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(Err(err)).is_ok(),
            None => false,
        }
    }

    /// Move the reply slot out, leaving this one spent.
    ///
    /// Use this inside `handle_call` together with `CallResult::NoReply` to
    /// answer the caller later, from another callback.
    pub fn take(&mut self) -> ReplyTo {
        ReplyTo { tx: self.tx.take() }
    }

    /// Whether a reply can still be sent through this slot.
    pub fn is_pending(&self) -> bool {
        self.tx.is_some()
    }
}

impl fmt::Debug for ReplyTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyTo")
            .field("pending", &self.is_pending())
            .finish()
    }
}

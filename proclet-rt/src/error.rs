//! Runtime error taxonomy and process exit reasons.
//!
//! Two closely related sum types live here:
//!
//! - [`RtError`] - the error kinds returned by messaging and registry
//!   operations (`no_proc`, `chan_full`, `already_registered`, ...)
//! - [`ExitReason`] - the reason a process terminated, including the
//!   reserved reasons that control exit propagation (`normal`, `kill`,
//!   `killed`)

// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Errors returned by messaging, spawning, and registry operations.
///
/// Each variant carries a stable textual tag (its `Display` form) matching
/// the exit-reason vocabulary, and has a dedicated predicate so callers can
/// branch on the kind without pattern matching.
///
/// # Example
/// ```rust
/// use proclet_rt::RtError;
///
/// let err = RtError::NoProc;
/// assert!(err.is_no_proc());
/// assert_eq!(err.to_string(), "no_proc");
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RtError {
    /// Target process is gone.
    #[error("no_proc")]
    NoProc,

    /// Process handle is absent (a weak handle whose records were dropped).
    #[error("nil_pid")]
    NilPid,

    /// Mailbox is at capacity; the non-blocking send was rejected.
    #[error("chan_full")]
    ChannelFull,

    /// Name collision in the registrar.
    #[error("already_registered")]
    AlreadyReg,

    /// Name lookup or removal missed.
    #[error("not_reg")]
    NotReg,

    /// A name argument was empty.
    #[error("name_empty")]
    NameEmpty,

    /// A prefix argument was empty.
    #[error("prefix_empty")]
    PrefixEmpty,

    /// An argument failed validation.
    #[error("badarg: {0}")]
    BadArg(&'static str),

    /// An error value propagated out of a callee's callback.
    ///
    /// The payload is the callee's exit reason text, e.g. the message of a
    /// recovered panic inside `handle_call`.
    #[error("{0}")]
    Callback(String),
}

impl RtError {
    /// The target process has exited.
    pub fn is_no_proc(&self) -> bool {
        matches!(self, Self::NoProc)
    }

    /// The handle was absent.
    pub fn is_nil_pid(&self) -> bool {
        matches!(self, Self::NilPid)
    }

    /// The mailbox was full.
    pub fn is_channel_full(&self) -> bool {
        matches!(self, Self::ChannelFull)
    }

    /// The name was already registered.
    pub fn is_already_reg(&self) -> bool {
        matches!(self, Self::AlreadyReg)
    }

    /// The name was not registered.
    pub fn is_not_reg(&self) -> bool {
        matches!(self, Self::NotReg)
    }

    /// The name argument was empty.
    pub fn is_name_empty(&self) -> bool {
        matches!(self, Self::NameEmpty)
    }

    /// The prefix argument was empty.
    pub fn is_prefix_empty(&self) -> bool {
        matches!(self, Self::PrefixEmpty)
    }

    /// The error is a callee failure whose reason text is `normal`.
    pub fn is_normal_exit(&self) -> bool {
        matches!(self, Self::Callback(reason) if reason == ExitReason::NORMAL)
    }
}

/// Why a process terminated.
///
/// The reserved reasons drive the exit-propagation rules: a `Normal` exit
/// from another process is ignored unless the receiver traps exits, `Kill`
/// terminates the receiver unconditionally and propagates onward as
/// `Killed`, and every other reason terminates non-trapping receivers as-is.
///
/// # Example
/// ```rust
/// use proclet_rt::ExitReason;
///
/// assert_eq!(ExitReason::Normal.to_string(), "normal");
/// assert_eq!(ExitReason::from("disk gone").to_string(), "disk gone");
/// assert_eq!(ExitReason::Kill.propagates_as().to_string(), "killed");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Clean termination.
    Normal,

    /// Unconditional termination request; never observed as a final reason.
    Kill,

    /// Final reason of a process taken down by `Kill`.
    Killed,

    /// The peer was already gone (failed link establishment).
    NoProc,

    /// Any other reason, including recovered panic messages.
    Other(String),
}

impl ExitReason {
    pub(crate) const NORMAL: &'static str = "normal";
    const KILL: &'static str = "kill";
    const KILLED: &'static str = "killed";
    const NO_PROC: &'static str = "no_proc";

    /// True for the `Normal` reason.
    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }

    /// True for the `Kill` reason.
    pub fn is_kill(&self) -> bool {
        matches!(self, Self::Kill)
    }

    /// The reason a receiver terminates with when this reason reaches it.
    ///
    /// `Kill` becomes `Killed`; everything else propagates unchanged.
    pub fn propagates_as(&self) -> ExitReason {
        match self {
            Self::Kill => Self::Killed,
            other => other.clone(),
        }
    }
}

impl Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str(Self::NORMAL),
            Self::Kill => f.write_str(Self::KILL),
            Self::Killed => f.write_str(Self::KILLED),
            Self::NoProc => f.write_str(Self::NO_PROC),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

impl From<&str> for ExitReason {
    fn from(reason: &str) -> Self {
        match reason {
            Self::NORMAL => Self::Normal,
            Self::KILL => Self::Kill,
            Self::KILLED => Self::Killed,
            Self::NO_PROC => Self::NoProc,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for ExitReason {
    fn from(reason: String) -> Self {
        ExitReason::from(reason.as_str())
    }
}

impl From<ExitReason> for RtError {
    fn from(reason: ExitReason) -> Self {
        match reason {
            ExitReason::NoProc => RtError::NoProc,
            other => RtError::Callback(other.to_string()),
        }
    }
}

//! Message payloads and mailbox envelopes.
//!
//! - [`Term`] / [`TermBox`] - runtime-typed payloads with safe downcasting
//! - [`UsrMsg`] / [`SysMsg`] - user- and system-channel envelopes
//! - [`Info`] / [`MonitorDown`] - notifications delivered to `handle_info`
//! - [`ReplyTo`] - the at-most-once reply channel of a synchronous call

pub mod envelope;
pub mod term;

pub use envelope::{ExitMsg, Info, MonitorDown, ReplyTo, SysMsg, UsrMsg};
pub use term::{CloneTerm, Term, TermBox};

//! Timers.
//!
//! - [`TimerServer`] - the environment's timer process: one-shot and
//!   interval deliveries from one ordered table, uniform `cancel(Ref)`
//! - [`Timer`] - lightweight stand-alone one-shot timers on
//!   [`Pid`](crate::process::Pid)

pub mod oneshot;
pub mod server;
mod types;

pub use oneshot::Timer;
pub use server::TimerServer;

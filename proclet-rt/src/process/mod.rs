//! Processes: handles, messaging, links, monitors, and the driver.
//!
//! - [`Pid`] / [`WeakPid`] - process handles and identity
//! - [`ProcessContext`] - per-process link/monitor state and trap-exit
//! - [`Driver`] / [`Received`] - the loop host for raw processes
//! - [`SpawnOpts`] - spawn-time configuration

pub mod context;
pub mod driver;
pub mod messaging;
pub mod opts;
pub mod pid;

pub use context::ProcessContext;
pub use driver::{Driver, ProcResult, Received};
pub use opts::{SpawnOpts, DEFAULT_SYS_CHAN_SIZE, DEFAULT_USR_CHAN_SIZE};
pub use pid::{MonitorDownHook, Pid, WeakPid};

//! Environments: pid allocation, spawning, and the name registry.
//!
//! - [`Env`] - the environment handle (spawn, whereis, make_ref)
//! - registration methods on [`Pid`](crate::process::Pid)
//!   (`register`, `register_prefix`, ...)
//!
//! Every environment eagerly starts one registrar process (pid 0) that
//! monitors registered processes and purges their names when they die.

pub mod actor;
pub mod environment;
pub mod registry;

pub use environment::Env;
